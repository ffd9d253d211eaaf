//! The top-level scan loop.
//!
//! Each scan measures the signal, samples the ADC, converts both into a
//! [`Reading`], and publishes it to the console and the LCD. The LCD
//! shows capacitance by default and switches to resistance once the
//! frequency lands in the configured band, which indicates a resistor
//! (not a capacitor) is setting the oscillator rate.

use std::time::Duration;

use tracing::{debug, info, warn};

use rcm_common::{autoscale_capacitance, MeterConfig, MeterError, MeterResult, ScanMetrics, StallPhase};
use rcm_core::delay::wait_ms;
use rcm_core::{measure_period, Converter, Reading};
use rcm_hal::{Hal, OutputPin};

use crate::console::{format_no_signal, format_reading, StatusSink};
use crate::lcd::{self, LcdLine};

/// Startup banner shown once on the console.
pub const BANNER: &str =
    "Square-wave period measurement on the free-running counter.\r\nRC meter ready.";

/// What the LCD shows for a valid reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// Capacitance and frequency.
    Capacitance,
    /// Resistance from the ADC divider.
    Resistance,
}

/// Result of a single scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScanOutcome {
    /// A valid reading was published.
    Reading(Reading),
    /// The signal was absent; the stall phase says where it died.
    NoSignal(StallPhase),
}

/// The meter: hardware, output sink, and scan state.
#[derive(Debug)]
pub struct Meter<H: Hal, S: StatusSink> {
    hal: H,
    sink: S,
    config: MeterConfig,
    converter: Converter,
    metrics: ScanMetrics,
    mode: DisplayMode,
    led_on: bool,
    scans: u64,
}

impl<H: Hal, S: StatusSink> Meter<H, S> {
    /// Build a meter over a board and a status sink.
    #[must_use]
    pub fn new(hal: H, sink: S, config: MeterConfig) -> Self {
        let converter = Converter::new(&config);
        Self {
            hal,
            sink,
            config,
            converter,
            metrics: ScanMetrics::default(),
            mode: DisplayMode::Capacitance,
            led_on: false,
            scans: 0,
        }
    }

    /// Bring up the display, print the banner, and wait the settle delay.
    ///
    /// # Errors
    ///
    /// Returns an error if the console sink fails.
    pub fn initialize(&mut self) -> MeterResult<()> {
        lcd::init(&mut self.hal);
        // Let the oscillator settle before announcing readiness.
        wait_ms(&mut self.hal, duration_ms(self.config.settle_delay));
        self.sink.banner(BANNER)?;
        info!(
            clock_hz = self.config.clock_hz,
            sample_periods = self.config.sample_periods,
            "meter initialized"
        );
        Ok(())
    }

    /// Run one scan: measure, convert, publish, then wait the scan delay.
    ///
    /// A missing signal is not an error at this level; it is reported as
    /// [`ScanOutcome::NoSignal`] and the loop keeps going. Only output
    /// failures propagate.
    ///
    /// # Errors
    ///
    /// Returns an error if the console sink fails.
    pub fn scan(&mut self) -> MeterResult<ScanOutcome> {
        let outcome = match measure_period(&mut self.hal, self.config.sample_periods) {
            Ok(raw) => {
                let adc_counts = self.hal.read_adc(self.config.adc.channel);
                let reading = self.converter.reading(raw, adc_counts);
                self.publish_reading(&reading)?;
                self.metrics.record_reading(reading.frequency_hz);
                debug!(
                    frequency_hz = reading.frequency_hz,
                    capacitance_uf = reading.capacitance_uf,
                    code = reading.code,
                    "scan complete"
                );
                ScanOutcome::Reading(reading)
            }
            Err(MeterError::NoSignal(phase)) => {
                self.publish_no_signal()?;
                self.metrics.record_no_signal();
                warn!(%phase, "no signal");
                ScanOutcome::NoSignal(phase)
            }
            Err(other) => return Err(other),
        };

        self.scans += 1;
        wait_ms(&mut self.hal, duration_ms(self.config.scan_delay));
        Ok(outcome)
    }

    fn publish_reading(&mut self, reading: &Reading) -> MeterResult<()> {
        self.sink.status(&format_reading(reading))?;

        // The LCD mode in effect was decided by the previous scan, so a
        // band entry shows up on the display one scan later.
        match self.mode {
            DisplayMode::Capacitance => {
                let (value, unit) = autoscale_capacitance(
                    reading.capacitance_uf,
                    self.config.display.nf_threshold_uf,
                );
                lcd::print(
                    &mut self.hal,
                    LcdLine::Top,
                    &format!("C: {:.3} {} {}", value, unit.suffix(), reading.code),
                    true,
                );
                lcd::print(
                    &mut self.hal,
                    LcdLine::Bottom,
                    &format!("F: {:.3} Hz", reading.frequency_hz),
                    true,
                );
            }
            DisplayMode::Resistance => {
                lcd::print(
                    &mut self.hal,
                    LcdLine::Top,
                    &format!("R: {:.2}", reading.resistance_ohms),
                    true,
                );
                lcd::print(&mut self.hal, LcdLine::Bottom, "   ohms", true);
            }
        }

        let band = self.config.led_band;
        if reading.frequency_hz > band.low_hz && reading.frequency_hz < band.high_hz {
            self.led_on = true;
            self.mode = DisplayMode::Resistance;
        } else {
            self.mode = DisplayMode::Capacitance;
        }

        // Heartbeat: the LED blinks while scans are completing.
        self.led_on = !self.led_on;
        self.hal.set_pin(OutputPin::Led, self.led_on);
        Ok(())
    }

    fn publish_no_signal(&mut self) -> MeterResult<()> {
        self.sink.status(&format_no_signal())?;
        lcd::print(&mut self.hal, LcdLine::Top, "No Signal", true);
        lcd::print(&mut self.hal, LcdLine::Bottom, "", true);
        Ok(())
    }

    /// Scans completed so far.
    #[must_use]
    pub fn scans(&self) -> u64 {
        self.scans
    }

    /// Current display mode.
    #[must_use]
    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Accumulated scan metrics.
    #[must_use]
    pub fn metrics(&self) -> &ScanMetrics {
        &self.metrics
    }

    /// Reset accumulated metrics.
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// The underlying board.
    #[must_use]
    pub fn hal(&self) -> &H {
        &self.hal
    }

    /// Mutable access to the underlying board.
    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    /// The status sink.
    #[must_use]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(duration: Duration) -> u32 {
    duration.as_millis() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::CaptureStatus;
    use rcm_common::config::SourceConfig;
    use rcm_hal::{SignalSource, SimBoard};

    fn fast_config(frequency_hz: f64) -> MeterConfig {
        let mut config = MeterConfig::default();
        config.sample_periods = 10;
        config.settle_delay = Duration::from_millis(1);
        config.scan_delay = Duration::from_millis(1);
        config.sim.source = SourceConfig::Square {
            frequency_hz,
            duty: 0.5,
        };
        config.sim.poll_cost_cycles = 40;
        config
    }

    fn meter(config: MeterConfig) -> Meter<SimBoard, CaptureStatus> {
        let board = SimBoard::from_config(&config);
        Meter::new(board, CaptureStatus::default(), config)
    }

    #[test]
    fn test_settle_delay_elapses_before_banner() {
        // A sink that rejects the banner aborts initialize at the banner
        // call, so the virtual clock shows everything that ran before it.
        struct RejectBanner;

        impl crate::console::StatusSink for RejectBanner {
            fn banner(&mut self, _text: &str) -> rcm_common::MeterResult<()> {
                Err(MeterError::Display("banner rejected".into()))
            }

            fn status(&mut self, _line: &str) -> rcm_common::MeterResult<()> {
                Ok(())
            }
        }

        let mut config = MeterConfig::default();
        config.settle_delay = Duration::from_millis(500);
        let board = SimBoard::from_config(&config);
        let settle_cycles = rcm_common::duration_to_cycles(config.settle_delay, config.clock_hz);

        let mut m = Meter::new(board, RejectBanner, config);
        m.initialize().unwrap_err();

        // The settle wait runs before the banner, so its cycles are on
        // the clock even though initialize aborted at the banner.
        assert!(m.hal().now_cycles() >= settle_cycles);
    }

    #[test]
    fn test_scan_publishes_reading() {
        let mut m = meter(fast_config(1000.0));
        m.initialize().unwrap();

        let outcome = m.scan().unwrap();
        let ScanOutcome::Reading(reading) = outcome else {
            panic!("expected a reading, got {outcome:?}");
        };
        assert!((reading.frequency_hz - 1000.0).abs() < 20.0);

        let status = m.sink().statuses.last().unwrap();
        assert!(status.starts_with("f="), "status {status:?}");
        assert!(status.contains("code=102"), "status {status:?}");
        assert!(m.hal().lcd().line_trimmed(1).starts_with("C: "));
        assert!(m.hal().lcd().line_trimmed(2).starts_with("F: "));
    }

    #[test]
    fn test_scan_no_signal() {
        let mut config = fast_config(1000.0);
        config.sim.source = SourceConfig::Constant { level: false };
        config.sim.poll_cost_cycles = 4000;
        let mut m = meter(config);
        m.initialize().unwrap();

        let outcome = m.scan().unwrap();
        assert_eq!(outcome, ScanOutcome::NoSignal(StallPhase::SyncHigh));
        assert!(m.sink().statuses.last().unwrap().starts_with("NO SIGNAL"));
        assert_eq!(m.hal().lcd().line_trimmed(1), "No Signal");
        assert_eq!(m.hal().lcd().line_trimmed(2), "");
        assert_eq!(m.metrics().snapshot().no_signal_count, 1);
    }

    #[test]
    fn test_resistance_mode_engages_one_scan_later() {
        // 150 kHz sits inside the default 120-180 kHz band.
        let mut m = meter(fast_config(150_000.0));
        m.initialize().unwrap();

        m.scan().unwrap();
        assert_eq!(m.mode(), DisplayMode::Resistance);
        // First scan still displayed capacitance.
        assert!(m.hal().lcd().line_trimmed(1).starts_with("C: "));

        m.scan().unwrap();
        assert!(m.hal().lcd().line_trimmed(1).starts_with("R: "));
        assert_eq!(m.hal().lcd().line_trimmed(2), "ohms");
    }

    #[test]
    fn test_mode_returns_to_capacitance() {
        let mut m = meter(fast_config(150_000.0));
        m.initialize().unwrap();
        m.scan().unwrap();
        assert_eq!(m.mode(), DisplayMode::Resistance);

        m.hal_mut()
            .set_source(SignalSource::square(1000.0, 40_000_000));
        m.scan().unwrap();
        assert_eq!(m.mode(), DisplayMode::Capacitance);
    }

    #[test]
    fn test_led_toggles_between_scans() {
        let mut m = meter(fast_config(1000.0));
        m.initialize().unwrap();

        m.scan().unwrap();
        let first = m.hal().output(OutputPin::Led);
        m.scan().unwrap();
        let second = m.hal().output(OutputPin::Led);
        assert_ne!(first, second);
    }

    #[test]
    fn test_metrics_accumulate() {
        let mut m = meter(fast_config(2000.0));
        m.initialize().unwrap();
        for _ in 0..3 {
            m.scan().unwrap();
        }
        let snapshot = m.metrics().snapshot();
        assert_eq!(snapshot.ok_count, 3);
        assert_eq!(m.scans(), 3);
        assert!(snapshot.mean_hz.unwrap() > 1900.0);
    }
}
