use std::fmt;
use thiserror::Error;

/// Meter error types covering configuration, measurement, and display failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MeterError {
    /// Configuration or initialization error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The input pin failed to change state within the timeout window.
    ///
    /// The [`StallPhase`] records which wait actually stalled.
    #[error("no signal: {0}")]
    NoSignal(StallPhase),

    /// Console or LCD output error.
    #[error("display error: {0}")]
    Display(String),

    /// Generic runtime fault.
    #[error("meter fault: {0}")]
    Fault(String),
}

/// Convenience type alias for meter operations.
pub type MeterResult<T> = Result<T, MeterError>;

/// Identifies which wait inside the period measurement timed out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallPhase {
    /// Waiting for the pin to go low before the first edge (pin stuck high).
    SyncLow,
    /// Waiting for the rising edge that starts the measurement (pin stuck low).
    SyncHigh,
    /// Accumulating periods; carries the number of full periods completed
    /// before the signal disappeared.
    Accumulating {
        /// Full periods captured before the stall.
        completed: u32,
    },
}

impl fmt::Display for StallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncLow => write!(f, "pin stuck high during falling-edge sync"),
            Self::SyncHigh => write!(f, "pin stuck low waiting for rising edge"),
            Self::Accumulating { completed } => {
                write!(f, "signal lost after {completed} completed periods")
            }
        }
    }
}
