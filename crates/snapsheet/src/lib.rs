#![doc = r"Resizable bottom-sheet interaction engine.

Maps drag gestures onto a clamped sheet height, resolves release velocity
against per-mode snap tables, settles with an interruptible spring, and
broadcasts normalized progress to registered visual consumers."]

pub mod config;
pub mod controller;
pub mod events;
pub mod progress;
pub mod snap;
pub mod velocity;

pub use config::{
    ModeConfigs, SheetConfig, SheetMode, SnapPoints, DEFAULT_VELOCITY_THRESHOLD,
    MAX_RELEASE_VELOCITY,
};
pub use controller::SheetController;
pub use events::{EventSubscription, SheetEvent};
pub use progress::{ProgressBroadcaster, ProgressTrack};
pub use snap::{bucket_index, nearest_snap, resolve_snap};
pub use velocity::DragVelocityTracker;

pub use snapsheet_animation::{interpolate, SpringSpec};
pub use snapsheet_core::{Runtime, RuntimeHandle, ValueReader};
