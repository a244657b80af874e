#![doc = r"Spring physics and the settle frame driver for snapsheet."]

pub mod interpolate;
pub mod settle;
pub mod spring;

pub use interpolate::{interpolate, Lerp};
pub use settle::{SettleAnimation, SettleInterrupt};
pub use spring::{SpringSimulation, SpringSpec};
