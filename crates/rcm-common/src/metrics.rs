//! Scan metrics collection.
//!
//! Ring buffer-based statistics over measured frequencies plus counters
//! for successful and no-signal scans, without heap allocations during
//! normal operation.

/// Scan statistics with a frequency ring buffer.
#[derive(Debug)]
pub struct ScanMetrics {
    /// Ring buffer of measured frequencies in Hz.
    samples: Box<[f64]>,
    /// Current write position in the ring buffer.
    write_pos: usize,
    /// Number of samples collected (saturates at buffer size).
    sample_count: usize,
    /// Total scans that produced a reading.
    ok_count: u64,
    /// Total scans that timed out with no signal.
    no_signal_count: u64,
    /// Minimum observed frequency in Hz.
    min_hz: f64,
    /// Maximum observed frequency in Hz.
    max_hz: f64,
    /// Sum of observed frequencies for mean calculation.
    sum_hz: f64,
}

impl ScanMetrics {
    /// Create a new metrics collector retaining `history_size` samples.
    #[must_use]
    pub fn new(history_size: usize) -> Self {
        let size = history_size.max(1);
        Self {
            samples: vec![0.0; size].into_boxed_slice(),
            write_pos: 0,
            sample_count: 0,
            ok_count: 0,
            no_signal_count: 0,
            min_hz: f64::INFINITY,
            max_hz: 0.0,
            sum_hz: 0.0,
        }
    }

    /// Record a successful measurement.
    pub fn record_reading(&mut self, frequency_hz: f64) {
        self.samples[self.write_pos] = frequency_hz;
        self.write_pos = (self.write_pos + 1) % self.samples.len();
        self.sample_count = self.sample_count.saturating_add(1).min(self.samples.len());

        self.ok_count += 1;
        self.min_hz = self.min_hz.min(frequency_hz);
        self.max_hz = self.max_hz.max(frequency_hz);
        self.sum_hz += frequency_hz;
    }

    /// Record a scan that timed out without a signal.
    pub fn record_no_signal(&mut self) {
        self.no_signal_count += 1;
    }

    /// Total scans that produced a reading.
    #[must_use]
    pub fn ok_count(&self) -> u64 {
        self.ok_count
    }

    /// Total scans that found no signal.
    #[must_use]
    pub fn no_signal_count(&self) -> u64 {
        self.no_signal_count
    }

    /// Minimum observed frequency.
    #[must_use]
    pub fn min_hz(&self) -> Option<f64> {
        (self.ok_count > 0).then_some(self.min_hz)
    }

    /// Maximum observed frequency.
    #[must_use]
    pub fn max_hz(&self) -> Option<f64> {
        (self.ok_count > 0).then_some(self.max_hz)
    }

    /// Mean observed frequency.
    #[must_use]
    pub fn mean_hz(&self) -> Option<f64> {
        #[allow(clippy::cast_precision_loss)]
        (self.ok_count > 0).then(|| self.sum_hz / self.ok_count as f64)
    }

    /// Compute a percentile over the retained frequency samples.
    ///
    /// Returns `None` if no samples have been collected or the percentile
    /// is outside 0.0..=100.0.
    #[must_use]
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        if self.sample_count == 0 {
            return None;
        }
        if !(0.0..=100.0).contains(&percentile) || percentile.is_nan() {
            return None;
        }

        let mut sorted: Vec<f64> = self.samples[..self.sample_count].to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let idx = ((percentile / 100.0) * (sorted.len() - 1) as f64).round() as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    /// Get a snapshot of current metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ok_count: self.ok_count,
            no_signal_count: self.no_signal_count,
            min_hz: self.min_hz(),
            max_hz: self.max_hz(),
            mean_hz: self.mean_hz(),
            sample_count: self.sample_count,
        }
    }

    /// Reset all metrics to initial state.
    pub fn reset(&mut self) {
        self.samples.fill(0.0);
        self.write_pos = 0;
        self.sample_count = 0;
        self.ok_count = 0;
        self.no_signal_count = 0;
        self.min_hz = f64::INFINITY;
        self.max_hz = 0.0;
        self.sum_hz = 0.0;
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Immutable snapshot of scan metrics for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Scans that produced a reading.
    pub ok_count: u64,
    /// Scans that found no signal.
    pub no_signal_count: u64,
    /// Minimum observed frequency in Hz.
    pub min_hz: Option<f64>,
    /// Maximum observed frequency in Hz.
    pub max_hz: Option<f64>,
    /// Mean observed frequency in Hz.
    pub mean_hz: Option<f64>,
    /// Number of samples retained in the ring buffer.
    pub sample_count: usize,
}

impl MetricsSnapshot {
    /// Frequency spread (max - min) in Hz.
    #[must_use]
    pub fn spread_hz(&self) -> Option<f64> {
        match (self.min_hz, self.max_hz) {
            (Some(min), Some(max)) => Some(max - min),
            _ => None,
        }
    }

    /// Total scans, successful or not.
    #[must_use]
    pub fn total_scans(&self) -> u64 {
        self.ok_count + self.no_signal_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_recording() {
        let mut metrics = ScanMetrics::new(100);

        metrics.record_reading(999.5);
        metrics.record_reading(1000.5);
        metrics.record_reading(1000.0);

        assert_eq!(metrics.ok_count(), 3);
        assert_eq!(metrics.min_hz(), Some(999.5));
        assert_eq!(metrics.max_hz(), Some(1000.5));
        assert_eq!(metrics.mean_hz(), Some(1000.0));
    }

    #[test]
    fn test_no_signal_counting() {
        let mut metrics = ScanMetrics::new(100);

        metrics.record_reading(1000.0);
        metrics.record_no_signal();
        metrics.record_no_signal();

        assert_eq!(metrics.ok_count(), 1);
        assert_eq!(metrics.no_signal_count(), 2);
        assert_eq!(metrics.snapshot().total_scans(), 3);
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = ScanMetrics::new(10);
        assert!(metrics.min_hz().is_none());
        assert!(metrics.max_hz().is_none());
        assert!(metrics.mean_hz().is_none());
        assert!(metrics.percentile(50.0).is_none());
    }

    #[test]
    fn test_percentile_calculation() {
        let mut metrics = ScanMetrics::new(100);
        for i in 1..=100 {
            metrics.record_reading(f64::from(i));
        }

        let p50 = metrics.percentile(50.0).unwrap();
        assert!((49.0..=51.0).contains(&p50));

        let p99 = metrics.percentile(99.0).unwrap();
        assert!((98.0..=100.0).contains(&p99));
    }

    #[test]
    fn test_percentile_validation() {
        let mut metrics = ScanMetrics::new(10);
        metrics.record_reading(500.0);

        assert!(metrics.percentile(0.0).is_some());
        assert!(metrics.percentile(100.0).is_some());
        assert!(metrics.percentile(-1.0).is_none());
        assert!(metrics.percentile(101.0).is_none());
        assert!(metrics.percentile(f64::NAN).is_none());
    }

    #[test]
    fn test_ring_buffer_wrapping() {
        let mut metrics = ScanMetrics::new(10);
        for i in 0..25 {
            metrics.record_reading(f64::from(i) * 10.0);
        }

        assert_eq!(metrics.ok_count(), 25);
        assert_eq!(metrics.snapshot().sample_count, 10);
    }

    #[test]
    fn test_reset() {
        let mut metrics = ScanMetrics::new(10);
        metrics.record_reading(1000.0);
        metrics.record_no_signal();

        metrics.reset();

        assert_eq!(metrics.ok_count(), 0);
        assert_eq!(metrics.no_signal_count(), 0);
        assert!(metrics.min_hz().is_none());
    }

    #[test]
    fn test_snapshot_spread() {
        let mut metrics = ScanMetrics::new(10);
        metrics.record_reading(990.0);
        metrics.record_reading(1010.0);

        let snap = metrics.snapshot();
        assert_eq!(snap.spread_hz(), Some(20.0));
    }
}
