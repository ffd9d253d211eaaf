#![doc = "Core measurement routines for the virtual RC meter."]

pub mod convert;
pub mod delay;
pub mod measure;

pub use convert::{Converter, Reading};
pub use measure::{measure_period, RawPeriod};
