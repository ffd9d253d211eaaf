//! Unit conversion helpers shared across the workspace.
//!
//! The free-running counter increments once every two system-clock
//! cycles, so one tick spans `2 / clock_hz` seconds. All tick/time
//! conversions live here so the factor of two appears exactly once.

use std::time::Duration;

/// Seconds spanned by `ticks` counter ticks at the given system clock.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn ticks_to_seconds(ticks: u64, clock_hz: u64) -> f64 {
    ticks as f64 * 2.0 / clock_hz as f64
}

/// Counter ticks spanned by a duration at the given system clock.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn duration_to_ticks(duration: Duration, clock_hz: u64) -> u64 {
    (duration.as_secs_f64() * clock_hz as f64 / 2.0).round() as u64
}

/// System-clock cycles spanned by a duration.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn duration_to_cycles(duration: Duration, clock_hz: u64) -> u64 {
    (duration.as_secs_f64() * clock_hz as f64).round() as u64
}

/// Seconds spanned by raw system-clock cycles.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn cycles_to_seconds(cycles: u64, clock_hz: u64) -> f64 {
    cycles as f64 / clock_hz as f64
}

/// Display unit for a capacitance value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapUnit {
    /// Nanofarads.
    Nano,
    /// Microfarads.
    Micro,
}

impl CapUnit {
    /// Unit suffix as printed on the LCD.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Nano => "nF",
            Self::Micro => "uF",
        }
    }
}

/// Pick a display unit for a capacitance in microfarads.
///
/// Values below `nf_threshold_uf` are rescaled to nanofarads so small
/// capacitors keep a readable number of digits.
#[must_use]
pub fn autoscale_capacitance(cap_uf: f64, nf_threshold_uf: f64) -> (f64, CapUnit) {
    if cap_uf < nf_threshold_uf {
        (cap_uf * 1000.0, CapUnit::Nano)
    } else {
        (cap_uf, CapUnit::Micro)
    }
}
