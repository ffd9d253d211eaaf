#![doc = "Runtime for the virtual RC meter: LCD driver, console readout, scan loop."]

pub mod console;
pub mod lcd;
pub mod scan;

pub use console::{CaptureStatus, StatusSink, TerminalStatus};
pub use scan::{DisplayMode, Meter, ScanOutcome};
