//! One-shot frame callbacks with RAII cancellation.

use crate::runtime::{FrameCallbackId, RuntimeHandle};

/// Hands out one-shot callbacks that fire on the next drained frame.
///
/// Continuous animations re-register from inside their callback; dropping the
/// returned [`FrameCallbackRegistration`] cancels a pending callback, so a
/// driver that lets its registration go out of scope simply stops.
#[derive(Clone)]
pub struct FrameClock {
    runtime: RuntimeHandle,
}

impl FrameClock {
    pub(crate) fn new(runtime: RuntimeHandle) -> Self {
        Self { runtime }
    }

    /// Register `callback` to run on the next frame with the frame timestamp
    /// in nanoseconds.
    pub fn with_frame_nanos(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> FrameCallbackRegistration {
        let id = self.runtime.register_frame_callback(callback);
        FrameCallbackRegistration {
            runtime: self.runtime.clone(),
            id,
        }
    }

    /// Register `callback` to run on the next frame with the frame timestamp
    /// in milliseconds.
    pub fn with_frame_millis(
        &self,
        callback: impl FnOnce(u64) + 'static,
    ) -> FrameCallbackRegistration {
        self.with_frame_nanos(move |nanos| callback(nanos / 1_000_000))
    }
}

/// Keeps a pending frame callback alive. Dropping cancels the callback if it
/// has not fired yet.
pub struct FrameCallbackRegistration {
    runtime: RuntimeHandle,
    id: Option<FrameCallbackId>,
}

impl FrameCallbackRegistration {
    /// Cancel without waiting for drop.
    pub fn cancel(mut self) {
        self.cancel_internal();
    }

    fn cancel_internal(&mut self) {
        if let Some(id) = self.id.take() {
            self.runtime.cancel_frame_callback(id);
        }
    }
}

impl Drop for FrameCallbackRegistration {
    fn drop(&mut self) {
        self.cancel_internal();
    }
}
