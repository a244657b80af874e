#![doc = r"Testing utilities and headless harness for snapsheet."]

pub mod harness;

pub use harness::{
    run_sheet_test, EventLog, RecordingReader, SheetTestRule, FRAME_MILLIS, FRAME_NANOS,
};
