//! Health and diagnostics for the meter daemon.
//!
//! Tracks scan outcomes in lock-free shared state so a future export
//! surface (or just the exit log) can report health without touching the
//! scan loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

use rcm_runtime::ScanOutcome;

/// Consecutive no-signal scans before health drops to [`HealthStatus::NoSignal`].
const NO_SIGNAL_UNHEALTHY_STREAK: u64 = 3;

/// Health of the running meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No scan has completed yet.
    Starting,
    /// Recent scans produced readings.
    Healthy,
    /// The last scan found no signal, but not yet persistently.
    Degraded,
    /// Several consecutive scans found no signal.
    NoSignal,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Starting => write!(f, "starting"),
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::NoSignal => write!(f, "no_signal"),
        }
    }
}

/// Shared diagnostics state updated after every scan.
#[derive(Debug)]
pub struct DiagnosticsState {
    scan_count: AtomicU64,
    ok_count: AtomicU64,
    no_signal_count: AtomicU64,
    no_signal_streak: AtomicU64,
    // f64 bits; u64::MAX marks "no reading yet" (an impossible NaN encoding
    // for a measured frequency).
    last_frequency_bits: AtomicU64,
    start_time: Instant,
}

const NO_READING: u64 = u64::MAX;

impl DiagnosticsState {
    /// Create fresh diagnostics state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scan_count: AtomicU64::new(0),
            ok_count: AtomicU64::new(0),
            no_signal_count: AtomicU64::new(0),
            no_signal_streak: AtomicU64::new(0),
            last_frequency_bits: AtomicU64::new(NO_READING),
            start_time: Instant::now(),
        }
    }

    /// Record the outcome of one scan.
    pub fn record(&self, outcome: &ScanOutcome) {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        match outcome {
            ScanOutcome::Reading(reading) => {
                self.ok_count.fetch_add(1, Ordering::Relaxed);
                self.no_signal_streak.store(0, Ordering::Relaxed);
                self.last_frequency_bits
                    .store(reading.frequency_hz.to_bits(), Ordering::Relaxed);
            }
            ScanOutcome::NoSignal(_) => {
                self.no_signal_count.fetch_add(1, Ordering::Relaxed);
                self.no_signal_streak.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Reset the counters; the start time is kept.
    pub fn reset(&self) {
        self.scan_count.store(0, Ordering::Relaxed);
        self.ok_count.store(0, Ordering::Relaxed);
        self.no_signal_count.store(0, Ordering::Relaxed);
        self.no_signal_streak.store(0, Ordering::Relaxed);
        self.last_frequency_bits.store(NO_READING, Ordering::Relaxed);
    }

    /// Current health classification.
    #[must_use]
    pub fn health(&self) -> HealthStatus {
        if self.scan_count.load(Ordering::Relaxed) == 0 {
            return HealthStatus::Starting;
        }
        match self.no_signal_streak.load(Ordering::Relaxed) {
            0 => HealthStatus::Healthy,
            streak if streak >= NO_SIGNAL_UNHEALTHY_STREAK => HealthStatus::NoSignal,
            _ => HealthStatus::Degraded,
        }
    }

    /// Most recent measured frequency, if any scan has produced one.
    #[must_use]
    pub fn last_frequency_hz(&self) -> Option<f64> {
        let bits = self.last_frequency_bits.load(Ordering::Relaxed);
        (bits != NO_READING).then(|| f64::from_bits(bits))
    }

    /// Snapshot for logging or JSON export.
    #[must_use]
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            health: self.health(),
            scan_count: self.scan_count.load(Ordering::Relaxed),
            ok_count: self.ok_count.load(Ordering::Relaxed),
            no_signal_count: self.no_signal_count.load(Ordering::Relaxed),
            last_frequency_hz: self.last_frequency_hz(),
            uptime_seconds: self.start_time.elapsed().as_secs_f64(),
        }
    }
}

impl Default for DiagnosticsState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time diagnostics snapshot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DiagnosticsSnapshot {
    /// Health classification.
    pub health: HealthStatus,
    /// Total scans.
    pub scan_count: u64,
    /// Scans that produced a reading.
    pub ok_count: u64,
    /// Scans that found no signal.
    pub no_signal_count: u64,
    /// Most recent measured frequency in Hz.
    pub last_frequency_hz: Option<f64>,
    /// Seconds since daemon start.
    pub uptime_seconds: f64,
}
