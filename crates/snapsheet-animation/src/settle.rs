//! Settle animation driver.
//!
//! Drives a spring simulation toward a snap target using the runtime's frame
//! callback system.

use snapsheet_core::{FrameCallbackRegistration, FrameClock, RuntimeHandle};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::spring::{SpringSimulation, SpringSpec};

/// Position and velocity captured when a running settle is interrupted, so the
/// successor animation (or a new drag) resumes from the in-flight value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettleInterrupt {
    pub position: f32,
    pub velocity: f32,
}

/// State for an active settle animation.
struct SettleAnimationState {
    simulation: SpringSimulation,
    /// Frame time of the previous step; `None` until the first frame arrives.
    last_frame_time_nanos: Cell<Option<u64>>,
    /// Current frame callback registration (kept alive to continue animation).
    registration: Option<FrameCallbackRegistration>,
    /// Whether the animation is still active.
    is_running: Cell<bool>,
}

/// Schedules the next settle frame. Called recursively to drive the animation
/// forward; `on_frame`/`on_end` run AFTER the state borrow is released because
/// they re-enter the controller, which may cancel or restart this animation.
fn schedule_next_frame<F, G>(
    state: Rc<RefCell<Option<SettleAnimationState>>>,
    frame_clock: FrameClock,
    on_frame: F,
    on_end: G,
) where
    F: Fn(f32) + 'static,
    G: FnOnce(f32) + 'static,
{
    let state_for_closure = state.clone();
    let frame_clock_for_closure = frame_clock.clone();
    let on_end = RefCell::new(Some(on_end));

    let registration = frame_clock.with_frame_nanos(move |frame_time_nanos| {
        let step = {
            let mut state_guard = state_for_closure.borrow_mut();
            let Some(anim_state) = state_guard.as_mut() else {
                return;
            };

            if !anim_state.is_running.get() {
                return;
            }

            let last = anim_state
                .last_frame_time_nanos
                .replace(Some(frame_time_nanos));
            let dt_seconds = match last {
                Some(last) => frame_time_nanos.saturating_sub(last) as f32 / 1_000_000_000.0,
                None => 0.0,
            };

            if dt_seconds <= 0.0 {
                None
            } else {
                let still_moving = anim_state.simulation.advance(dt_seconds);
                if !still_moving {
                    anim_state.simulation.finish();
                    anim_state.is_running.set(false);
                }
                Some((anim_state.simulation.position(), still_moving))
            }
        };

        match step {
            None => {
                // First frame only seeds the timestamp.
                if let Some(on_end_fn) = on_end.borrow_mut().take() {
                    schedule_next_frame(
                        state_for_closure.clone(),
                        frame_clock_for_closure.clone(),
                        on_frame,
                        on_end_fn,
                    );
                }
            }
            Some((position, true)) => {
                on_frame(position);
                if let Some(on_end_fn) = on_end.borrow_mut().take() {
                    schedule_next_frame(
                        state_for_closure.clone(),
                        frame_clock_for_closure.clone(),
                        on_frame,
                        on_end_fn,
                    );
                }
            }
            Some((position, false)) => {
                on_frame(position);
                if let Some(end_fn) = on_end.borrow_mut().take() {
                    end_fn(position);
                }
            }
        }
    });

    // Store the registration to keep the callback alive
    if let Some(anim_state) = state.borrow_mut().as_mut() {
        anim_state.registration = Some(registration);
    }
}

/// Drives a spring settle toward a target height.
///
/// Each frame it advances the simulation and reports the new absolute position
/// via `on_frame`; on rest it snaps exactly onto the target and invokes
/// `on_end` once. Cancelled or interrupted settles never invoke `on_end`.
pub struct SettleAnimation {
    state: Rc<RefCell<Option<SettleAnimationState>>>,
    frame_clock: FrameClock,
}

impl SettleAnimation {
    pub fn new(runtime: RuntimeHandle) -> Self {
        Self {
            state: Rc::new(RefCell::new(None)),
            frame_clock: runtime.frame_clock(),
        }
    }

    /// Starts a settle from `position` toward `target`, seeding the spring
    /// with `velocity` (units/sec) so motion stays continuous across the
    /// gesture-to-settle handoff.
    ///
    /// When the spring is already at rest on the target, `on_frame` and
    /// `on_end` fire immediately and no frames are scheduled.
    pub fn start<F, G>(
        &self,
        position: f32,
        velocity: f32,
        target: f32,
        spec: SpringSpec,
        on_frame: F,
        on_end: G,
    ) where
        F: Fn(f32) + 'static,
        G: FnOnce(f32) + 'static,
    {
        // Cancel any existing animation
        self.cancel();

        let simulation = SpringSimulation::new(spec, position, velocity, target);
        if simulation.is_at_rest() {
            on_frame(target);
            on_end(target);
            return;
        }

        let anim_state = SettleAnimationState {
            simulation,
            last_frame_time_nanos: Cell::new(None),
            registration: None,
            is_running: Cell::new(true),
        };

        *self.state.borrow_mut() = Some(anim_state);

        // Start frame loop
        schedule_next_frame(self.state.clone(), self.frame_clock.clone(), on_frame, on_end);
    }

    /// Redirects a running settle toward a new target, keeping the in-flight
    /// position, velocity, spec, and callbacks. Returns `false` when no settle
    /// is running.
    pub fn retarget(&self, target: f32) -> bool {
        let mut state_guard = self.state.borrow_mut();
        match state_guard.as_mut() {
            Some(anim_state) if anim_state.is_running.get() => {
                anim_state.simulation.set_target(target);
                true
            }
            _ => false,
        }
    }

    /// Stops a running settle and returns its in-flight position and velocity
    /// for the successor to resume from.
    pub fn interrupt(&self) -> Option<SettleInterrupt> {
        self.state.borrow_mut().take().and_then(|state| {
            if !state.is_running.get() {
                return None;
            }
            state.is_running.set(false);
            drop(state.registration);
            Some(SettleInterrupt {
                position: state.simulation.position(),
                velocity: state.simulation.velocity(),
            })
        })
    }

    pub fn cancel(&self) {
        if let Some(state) = self.state.borrow_mut().take() {
            // Mark as not running to prevent callback from doing anything
            state.is_running.set(false);
            // Registration is dropped, cancelling the callback
            drop(state.registration);
        }
    }

    /// Returns true if a settle animation is currently running.
    pub fn is_running(&self) -> bool {
        self.state
            .borrow()
            .as_ref()
            .is_some_and(|s| s.is_running.get())
    }

    /// Target of the running settle, if any.
    pub fn target(&self) -> Option<f32> {
        self.state
            .borrow()
            .as_ref()
            .filter(|s| s.is_running.get())
            .map(|s| s.simulation.target())
    }
}

impl Clone for SettleAnimation {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            frame_clock: self.frame_clock.clone(),
        }
    }
}
