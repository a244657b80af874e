//! Platform abstraction traits for the snapsheet runtime.
//!
//! These traits let the engine delegate frame scheduling and clock
//! responsibilities to the host, enabling integration with different
//! environments (native render loops, wasm requestAnimationFrame, headless
//! tests) without depending directly on any windowing stack.

use std::cell::Cell;

/// Schedules work for the snapsheet runtime.
///
/// Implementations are responsible for triggering frame processing on behalf
/// of the engine. They must be safe to use from multiple threads because
/// cross-thread effect posts wake the runtime through this trait.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host schedule a new frame.
    fn schedule_frame(&self);
}

/// Scheduler that does nothing; suitable for hosts that pump continuously.
#[derive(Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_frame(&self) {}
}

/// Monotonic time source for gesture timestamps.
///
/// Velocity tracking needs wall-clock-independent millisecond timestamps.
/// The trait exists so tests can drive time by hand.
pub trait Clock {
    /// Milliseconds elapsed since an arbitrary fixed origin.
    fn now_ms(&self) -> i64;
}

/// Production clock backed by [`web_time::Instant`], so the same code path
/// works on native targets and wasm.
pub struct MonotonicClock {
    origin: web_time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: web_time::Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> i64 {
        self.origin.elapsed().as_millis() as i64
    }
}

/// Hand-driven clock for deterministic tests.
pub struct ManualClock {
    now_ms: Cell<i64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now_ms: Cell::new(0),
        }
    }

    /// Advance the clock by `delta_ms` milliseconds.
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.set(self.now_ms.get() + delta_ms);
    }

    /// Set the clock to an absolute timestamp.
    pub fn set_ms(&self, now_ms: i64) {
        self.now_ms.set(now_ms);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.get()
    }
}
