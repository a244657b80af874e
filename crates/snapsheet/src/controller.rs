//! Sheet controller: the drag / snap / settle state machine.
//!
//! One controller owns one sheet's height cell and is its only writer. The
//! gesture path and the settle driver both funnel through `write_height`,
//! which keeps the height inside the active mode's extent and recomputes
//! progress tracks in the same call. Application-facing notifications go
//! through the runtime's effect queue instead of firing inside the frame
//! path.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use snapsheet_animation::SettleAnimation;
use snapsheet_core::{Clock, MonotonicClock, RuntimeHandle, ValueCell, ValueReader};

use crate::config::{ModeConfigs, SheetConfig, SheetMode, MAX_RELEASE_VELOCITY};
use crate::events::{EventHub, EventSubscription, SheetEvent};
use crate::progress::{ProgressBroadcaster, ProgressTrack};
use crate::snap::{bucket_index, resolve_snap};
use crate::velocity::DragVelocityTracker;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SheetPhase {
    Idle,
    Dragging { baseline: f32 },
    Settling { target: f32 },
}

/// Mode switch or override received while a drag holds the write lock.
/// A single slot, latest wins; applied when the finger lifts.
#[derive(Debug, Clone, Copy, PartialEq)]
enum PendingDirective {
    SwitchMode(SheetMode),
    OverrideHeight(f32),
}

struct ControllerInner {
    runtime: RuntimeHandle,
    clock: Rc<dyn Clock>,
    configs: ModeConfigs,
    mode: Cell<SheetMode>,
    height: ValueCell<f32>,
    broadcaster: ProgressBroadcaster,
    events: EventHub,
    settle: SettleAnimation,
    phase: Cell<SheetPhase>,
    tracker: RefCell<DragVelocityTracker>,
    pending: Cell<Option<PendingDirective>>,
    /// Snap bucket of the previous rest position; bucket-change events compare
    /// against this, so repeated settles into the same bucket stay silent.
    rest_bucket: Cell<usize>,
    rest_height: Cell<f32>,
}

impl ControllerInner {
    fn active_config(&self) -> &SheetConfig {
        self.configs.config(self.mode.get())
    }

    /// Single exit point for height writes. Progress tracks update in the
    /// same call, after the height cell, so subscribers of either see the
    /// new frame's values together.
    fn write_height(&self, height: f32) {
        debug_assert!(
            {
                let config = self.active_config();
                height >= config.min_height() && height <= config.max_height()
            },
            "height {height} written outside the active extent"
        );
        if self.height.get() == height {
            return;
        }
        self.height.set(height);
        self.broadcaster.update(height);
    }

    fn finish_drag(this: &Rc<Self>, height_velocity: f32) {
        let height = this.height.get();
        match this.pending.take() {
            Some(PendingDirective::SwitchMode(mode)) => {
                Self::apply_mode(this, mode, height_velocity);
            }
            Some(PendingDirective::OverrideHeight(target)) => {
                log::debug!("release applies pending override to {target}");
                Self::start_settle(this, target, height_velocity);
            }
            None => {
                let config = this.active_config();
                let target = resolve_snap(
                    height,
                    height_velocity,
                    config.snap_points(),
                    config.velocity_threshold(),
                );
                log::debug!("release at {height} ({height_velocity} units/s) resolves to {target}");
                Self::start_settle(this, target, height_velocity);
            }
        }
    }

    fn apply_mode(this: &Rc<Self>, mode: SheetMode, velocity: f32) {
        this.mode.set(mode);
        let config = this.active_config();
        let clamped = config.clamp(this.height.get());
        let minimum = config.min_height();
        this.write_height(clamped);
        log::debug!("mode switched to {mode:?}");
        Self::start_settle(this, minimum, velocity);
    }

    /// Spring from the current height to `target`. `velocity` seeds the spring
    /// so a fling release keeps its momentum through the handoff.
    fn start_settle(this: &Rc<Self>, target: f32, velocity: f32) {
        let spring = this.active_config().spring();
        let position = this.height.get();
        this.phase.set(SheetPhase::Settling { target });

        let on_frame = {
            let weak = Rc::downgrade(this);
            move |height: f32| {
                if let Some(inner) = weak.upgrade() {
                    // Under-damped springs overshoot; the cell never leaves
                    // the active extent.
                    let clamped = inner.active_config().clamp(height);
                    inner.write_height(clamped);
                }
            }
        };
        let on_end = {
            let weak = Rc::downgrade(this);
            move |final_height: f32| {
                if let Some(inner) = weak.upgrade() {
                    inner.complete_settle(final_height);
                }
            }
        };
        this.settle
            .start(position, velocity, target, spring, on_frame, on_end);
    }

    fn complete_settle(&self, final_height: f32) {
        let final_height = self.active_config().clamp(final_height);
        self.write_height(final_height);
        self.phase.set(SheetPhase::Idle);

        let bucket = bucket_index(final_height, self.active_config().snap_points());
        if self.rest_bucket.replace(bucket) != bucket {
            let events = self.events.clone();
            self.runtime
                .enqueue_effect(move || events.emit(&SheetEvent::BucketChanged { index: bucket }));
        }
        if self.rest_height.replace(final_height) != final_height {
            let events = self.events.clone();
            self.runtime.enqueue_effect(move || {
                events.emit(&SheetEvent::HeightSettled {
                    height: final_height,
                })
            });
        }
        log::debug!("settled at {final_height} (bucket {bucket})");
    }
}

/// Handle to one resizable sheet instance.
///
/// Cheap to clone; all clones address the same sheet. Construction fixes the
/// mode configs, the initial mode, and the runtime that drives settling.
#[derive(Clone)]
pub struct SheetController {
    inner: Rc<ControllerInner>,
}

impl SheetController {
    /// Creates a controller resting at the initial mode's minimum height,
    /// timing drags with the platform monotonic clock.
    pub fn new(runtime: RuntimeHandle, configs: ModeConfigs, initial_mode: SheetMode) -> Self {
        Self::with_clock(
            runtime,
            configs,
            initial_mode,
            Rc::new(MonotonicClock::default()),
        )
    }

    /// Creates a controller with an injected clock. Tests pass a manual clock
    /// so velocity tracking is deterministic.
    pub fn with_clock(
        runtime: RuntimeHandle,
        configs: ModeConfigs,
        initial_mode: SheetMode,
        clock: Rc<dyn Clock>,
    ) -> Self {
        let initial_height = configs.config(initial_mode).min_height();
        let initial_bucket =
            bucket_index(initial_height, configs.config(initial_mode).snap_points());
        Self {
            inner: Rc::new(ControllerInner {
                settle: SettleAnimation::new(runtime.clone()),
                runtime,
                clock,
                configs,
                mode: Cell::new(initial_mode),
                height: ValueCell::new(initial_height),
                broadcaster: ProgressBroadcaster::new(),
                events: EventHub::new(),
                phase: Cell::new(SheetPhase::Idle),
                tracker: RefCell::new(DragVelocityTracker::new()),
                pending: Cell::new(None),
                rest_bucket: Cell::new(initial_bucket),
                rest_height: Cell::new(initial_height),
            }),
        }
    }

    pub fn height(&self) -> f32 {
        self.inner.height.get()
    }

    /// Subscription handle over the height cell. Readers observe every write
    /// within the frame that made it.
    pub fn height_reader(&self) -> ValueReader<f32> {
        self.inner.height.reader()
    }

    pub fn mode(&self) -> SheetMode {
        self.inner.mode.get()
    }

    /// Config of the active mode.
    pub fn config(&self) -> &SheetConfig {
        self.inner.active_config()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.inner.phase.get(), SheetPhase::Dragging { .. })
    }

    pub fn is_settling(&self) -> bool {
        matches!(self.inner.phase.get(), SheetPhase::Settling { .. })
    }

    /// Target of the in-flight settle, if one is running.
    pub fn settle_target(&self) -> Option<f32> {
        match self.inner.phase.get() {
            SheetPhase::Settling { target } => Some(target),
            _ => None,
        }
    }

    /// Begins a drag at the current height. An in-flight settle is cancelled
    /// and never resumes; the gesture continues from its interpolated value.
    pub fn drag_start(&self) {
        let inner = &self.inner;
        if matches!(inner.phase.get(), SheetPhase::Dragging { .. }) {
            log::warn!("drag_start while already dragging, restarting gesture");
        }
        inner.settle.interrupt();
        let baseline = inner.height.get();
        inner.phase.set(SheetPhase::Dragging { baseline });
        let mut tracker = inner.tracker.borrow_mut();
        tracker.reset();
        tracker.add_sample(inner.clock.now_ms(), baseline);
        log::debug!("drag started at {baseline}");
    }

    /// Applies the cumulative gesture translation since `drag_start`.
    /// Positive translation is a downward drag and shrinks the sheet.
    pub fn drag_update(&self, translation: f32) {
        let inner = &self.inner;
        let SheetPhase::Dragging { baseline } = inner.phase.get() else {
            log::warn!("drag_update outside an active drag, ignoring");
            return;
        };
        if !translation.is_finite() {
            log::warn!("non-finite drag translation, ignoring");
            return;
        }
        let candidate = baseline - translation;
        let clamped = inner.active_config().clamp(candidate);
        inner.write_height(clamped);
        inner
            .tracker
            .borrow_mut()
            .add_sample(inner.clock.now_ms(), clamped);
    }

    /// Ends the drag with the release velocity reported by the host's input
    /// layer, in gesture-axis units (positive = finger moving down).
    pub fn drag_end(&self, velocity: f32) {
        let inner = &self.inner;
        if !matches!(inner.phase.get(), SheetPhase::Dragging { .. }) {
            log::warn!("drag_end outside an active drag, ignoring");
            return;
        }
        let velocity = if velocity.is_finite() {
            velocity
        } else {
            log::warn!("non-finite release velocity, treating as a rest release");
            0.0
        };
        // Gesture axis points down the screen; height grows upward.
        let height_velocity = (-velocity).clamp(-MAX_RELEASE_VELOCITY, MAX_RELEASE_VELOCITY);
        ControllerInner::finish_drag(inner, height_velocity);
    }

    /// Ends the drag using the built-in velocity tracker, for hosts whose
    /// input layer does not report a release velocity.
    pub fn drag_end_tracked(&self) {
        let inner = &self.inner;
        if !matches!(inner.phase.get(), SheetPhase::Dragging { .. }) {
            log::warn!("drag_end outside an active drag, ignoring");
            return;
        }
        let height_velocity = inner
            .tracker
            .borrow()
            .calculate_velocity_with_max(MAX_RELEASE_VELOCITY);
        ControllerInner::finish_drag(inner, height_velocity);
    }

    /// Switches the active mode. Outside a drag this settles to the new
    /// mode's minimum snap point; during a drag the switch is queued and
    /// applied when the finger lifts.
    pub fn set_mode(&self, mode: SheetMode) {
        let inner = &self.inner;
        if matches!(inner.phase.get(), SheetPhase::Dragging { .. }) {
            let directive =
                (mode != inner.mode.get()).then_some(PendingDirective::SwitchMode(mode));
            inner.pending.set(directive);
            log::debug!("mode switch to {mode:?} queued until release");
            return;
        }
        if inner.mode.get() == mode {
            return;
        }
        let velocity = inner
            .settle
            .interrupt()
            .map_or(0.0, |interrupt| interrupt.velocity);
        ControllerInner::apply_mode(inner, mode, velocity);
    }

    /// Animates the sheet to an externally requested height (keyboard
    /// avoidance, deep links). The target is clamped into the active extent
    /// and need not be a snap point. Never jumps: the move always springs.
    pub fn override_height(&self, target: f32) {
        let inner = &self.inner;
        if !target.is_finite() {
            log::warn!("non-finite override target, ignoring");
            return;
        }
        let config = inner.active_config();
        let clamped = config.clamp(target);
        if clamped != target {
            log::warn!(
                "override target {target} outside [{}, {}], clamped",
                config.min_height(),
                config.max_height()
            );
        }
        match inner.phase.get() {
            SheetPhase::Dragging { .. } => {
                inner
                    .pending
                    .set(Some(PendingDirective::OverrideHeight(clamped)));
                log::debug!("override to {clamped} queued until release");
            }
            SheetPhase::Settling { .. } => {
                // Same mode, same spring: redirect in place, momentum intact.
                if inner.settle.retarget(clamped) {
                    inner.phase.set(SheetPhase::Settling { target: clamped });
                } else {
                    ControllerInner::start_settle(inner, clamped, 0.0);
                }
            }
            SheetPhase::Idle => {
                ControllerInner::start_settle(inner, clamped, 0.0);
            }
        }
    }

    /// Registers a named progress span. The track is seeded from the current
    /// height and recomputed on every subsequent height write.
    pub fn register_track(&self, name: &str, lower: f32, upper: f32) -> ProgressTrack {
        self.inner
            .broadcaster
            .register(name, lower, upper, self.inner.height.get())
    }

    pub fn track(&self, name: &str) -> Option<ProgressTrack> {
        self.inner.broadcaster.track(name)
    }

    /// Subscribes to discrete sheet events. Listeners run when the host
    /// drains effects, never inside the frame that produced the event.
    pub fn on_event(&self, listener: impl Fn(&SheetEvent) + 'static) -> EventSubscription {
        self.inner.events.subscribe(listener)
    }
}
