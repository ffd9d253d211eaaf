//! Square-wave period measurement on the free-running counter.
//!
//! The measurement is edge-synchronized: it first waits out any partial
//! high half-period, then arms on the next rising edge and times `n`
//! consecutive full periods in one counter run. Averaging over many
//! periods is what pushes the usable range up to several hundred kHz
//! despite the polling granularity.

use rcm_common::{MeterError, MeterResult, StallPhase};
use rcm_hal::{Hal, InputPin};

/// Raw result of one period measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPeriod {
    /// Counter ticks spanned by all measured periods.
    pub ticks: u64,
    /// Number of full periods the ticks cover.
    pub periods: u32,
}

impl RawPeriod {
    /// Average period in seconds at the given system clock.
    #[must_use]
    pub fn period_seconds(&self, clock_hz: u64) -> f64 {
        rcm_common::ticks_to_seconds(self.ticks, clock_hz) / f64::from(self.periods)
    }

    /// Average frequency in Hz at the given system clock.
    #[must_use]
    pub fn frequency_hz(&self, clock_hz: u64) -> f64 {
        1.0 / self.period_seconds(clock_hz)
    }
}

/// Measure the combined duration of `periods` consecutive signal periods.
///
/// Three phases, each bounded by the no-signal timeout (a quarter second
/// of counter ticks):
///
/// 1. wait for the pin to go low, so the next high is a clean edge;
/// 2. wait for the rising edge that starts the measurement;
/// 3. time `periods` low/high pairs against a single counter run.
///
/// The timeout in phase 3 bounds the whole accumulation, not each
/// half-period, so a slow-but-present signal is only rejected once its
/// total measured time exceeds the window.
///
/// # Errors
///
/// Returns [`MeterError::NoSignal`] when the pin stops toggling; the
/// carried [`StallPhase`] says which wait stalled.
pub fn measure_period<H: Hal>(hal: &mut H, periods: u32) -> MeterResult<RawPeriod> {
    // A quarter second of counter ticks at the configured clock.
    let timeout = hal.clock_hz() / 4;

    hal.reset_counter();
    while hal.read_pin(InputPin::Signal) {
        if hal.read_counter() > timeout {
            return Err(MeterError::NoSignal(StallPhase::SyncLow));
        }
    }

    hal.reset_counter();
    while !hal.read_pin(InputPin::Signal) {
        if hal.read_counter() > timeout {
            return Err(MeterError::NoSignal(StallPhase::SyncHigh));
        }
    }

    hal.reset_counter();
    for completed in 0..periods {
        while hal.read_pin(InputPin::Signal) {
            if hal.read_counter() > timeout {
                return Err(MeterError::NoSignal(StallPhase::Accumulating { completed }));
            }
        }
        while !hal.read_pin(InputPin::Signal) {
            if hal.read_counter() > timeout {
                return Err(MeterError::NoSignal(StallPhase::Accumulating { completed }));
            }
        }
    }

    Ok(RawPeriod {
        ticks: hal.read_counter(),
        periods,
    })
}
