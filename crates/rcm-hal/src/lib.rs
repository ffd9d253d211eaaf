#![doc = "Hardware abstraction for the virtual RC meter: board trait and simulator."]

pub mod board;
pub mod sim;

pub use board::{Hal, InputPin, OutputPin};
pub use sim::{LcdByte, LcdCapture, SignalSource, SimBoard};
