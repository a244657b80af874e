//! Headless harness for exercising sheet controllers in tests.
//!
//! `SheetTestRule` drives the runtime the way a host frame loop would:
//! advancing a manual clock and the frame timestamp in lockstep, draining
//! frame callbacks, and draining queued effects between frames. Nothing here
//! needs a display.

use snapsheet::{ModeConfigs, SheetController, SheetEvent, SheetMode};
use snapsheet_core::{
    DefaultScheduler, ManualClock, Runtime, RuntimeHandle, ValueReader, WatchHandle,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

/// Frame period used by [`SheetTestRule::advance_frame`] (~60 FPS).
pub const FRAME_NANOS: u64 = 16_666_667;

/// Wall-clock milliseconds the manual clock advances per frame.
pub const FRAME_MILLIS: i64 = 16;

pub struct SheetTestRule {
    runtime: Runtime,
    clock: Rc<ManualClock>,
    frame_time_nanos: Cell<u64>,
}

impl SheetTestRule {
    pub fn new() -> Self {
        Self {
            runtime: Runtime::new(Arc::new(DefaultScheduler)),
            clock: Rc::new(ManualClock::default()),
            frame_time_nanos: Cell::new(0),
        }
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn clock(&self) -> Rc<ManualClock> {
        Rc::clone(&self.clock)
    }

    /// Builds a controller wired to this rule's runtime and manual clock.
    pub fn controller(&self, configs: ModeConfigs, initial_mode: SheetMode) -> SheetController {
        SheetController::with_clock(
            self.runtime_handle(),
            configs,
            initial_mode,
            self.clock(),
        )
    }

    /// Advances wall time and the frame timestamp by one frame, then drains
    /// frame callbacks. Queued effects are left in place; tests drain them
    /// explicitly or via [`pump_until_idle`](Self::pump_until_idle).
    pub fn advance_frame(&self) {
        self.clock.advance_ms(FRAME_MILLIS);
        let frame_time = self.frame_time_nanos.get() + FRAME_NANOS;
        self.frame_time_nanos.set(frame_time);
        self.runtime.handle().drain_frame_callbacks(frame_time);
    }

    pub fn advance_frames(&self, count: u32) {
        for _ in 0..count {
            self.advance_frame();
        }
    }

    /// Runs queued effects (event listeners and posted closures).
    pub fn drain_effects(&self) {
        self.runtime.handle().drain_effects();
    }

    /// Alternates frames and effect drains until the runtime reports no
    /// pending work. Panics rather than spinning if something re-arms itself
    /// forever.
    pub fn pump_until_idle(&self) {
        let mut i = 0;
        while self.runtime.needs_frame() {
            i += 1;
            if i > 1000 {
                panic!("pump_until_idle looped too many times!");
            }
            self.advance_frame();
            self.drain_effects();
        }
        self.drain_effects();
    }

    /// Scripted drag: starts, applies each cumulative translation one frame
    /// apart, and releases with the given gesture-axis velocity.
    pub fn perform_drag(
        &self,
        controller: &SheetController,
        translations: &[f32],
        release_velocity: f32,
    ) {
        controller.drag_start();
        for &translation in translations {
            self.advance_frame();
            controller.drag_update(translation);
        }
        controller.drag_end(release_velocity);
    }

    /// Scripted drag released through the built-in velocity tracker.
    pub fn perform_drag_tracked(&self, controller: &SheetController, translations: &[f32]) {
        controller.drag_start();
        for &translation in translations {
            self.advance_frame();
            controller.drag_update(translation);
        }
        controller.drag_end_tracked();
    }
}

impl Default for SheetTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `SheetTestRule`.
pub fn run_sheet_test<R>(f: impl FnOnce(&SheetTestRule) -> R) -> R {
    let rule = SheetTestRule::new();
    f(&rule)
}

/// Records every value a cell reader observes, plus the seed value at attach.
pub struct RecordingReader {
    values: Rc<RefCell<Vec<f32>>>,
    _watch: WatchHandle<f32>,
}

impl RecordingReader {
    pub fn attach(reader: &ValueReader<f32>) -> Self {
        let values = Rc::new(RefCell::new(vec![reader.get()]));
        let sink = Rc::clone(&values);
        let watch = reader.subscribe(move |value| sink.borrow_mut().push(value));
        Self {
            values,
            _watch: watch,
        }
    }

    pub fn values(&self) -> Vec<f32> {
        self.values.borrow().clone()
    }

    pub fn last(&self) -> f32 {
        *self
            .values
            .borrow()
            .last()
            .expect("recording reader always holds the seed value")
    }

    pub fn clear(&self) {
        self.values.borrow_mut().clear();
    }
}

/// Captures discrete sheet events as the effect queue delivers them.
pub struct EventLog {
    events: Rc<RefCell<Vec<SheetEvent>>>,
    _subscription: snapsheet::EventSubscription,
}

impl EventLog {
    pub fn attach(controller: &SheetController) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let subscription = controller.on_event(move |event| sink.borrow_mut().push(*event));
        Self {
            events,
            _subscription: subscription,
        }
    }

    pub fn events(&self) -> Vec<SheetEvent> {
        self.events.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

#[cfg(test)]
#[path = "tests/harness_tests.rs"]
mod tests;
