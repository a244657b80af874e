#![doc = r"Runtime substrate for the snapsheet interaction engine."]

pub mod frame_clock;
pub mod platform;
pub mod runtime;
pub mod value_cell;

pub use frame_clock::{FrameCallbackRegistration, FrameClock};
pub use platform::{Clock, DefaultScheduler, ManualClock, MonotonicClock, RuntimeScheduler};
pub use runtime::{EffectDispatcher, FrameCallbackId, Runtime, RuntimeHandle};
pub use value_cell::{ValueCell, ValueReader, WatchHandle};
