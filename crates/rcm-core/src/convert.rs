//! Conversion of raw measurements into engineering values.
//!
//! The capacitance estimate assumes the signal comes from a 555-style
//! astable oscillator whose frequency is `timing_factor / (R * C)`; with
//! the oscillator's timing resistance known, measuring `f` yields `C`.
//! The resistance estimate assumes a divider of a known resistor over
//! the unknown, sampled by the ADC.

use rcm_common::config::{CodeBand, MeterConfig};
use serde::Serialize;

use crate::measure::RawPeriod;

/// One fully converted scan reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Reading {
    /// Counter ticks spanned by the measurement.
    pub ticks: u64,
    /// Periods the ticks cover.
    pub periods: u32,
    /// Average signal period in seconds.
    pub period_s: f64,
    /// Average signal frequency in Hz.
    pub frequency_hz: f64,
    /// Estimated capacitance in microfarads.
    pub capacitance_uf: f64,
    /// Raw ADC sample.
    pub adc_counts: u16,
    /// ADC sample as volts.
    pub voltage: f64,
    /// Estimated resistance in ohms; infinite when the divider reads
    /// full scale.
    pub resistance_ohms: f64,
    /// Classified component code.
    pub code: u16,
}

/// Converts raw counter and ADC values using the configured constants.
#[derive(Debug, Clone)]
pub struct Converter {
    clock_hz: u64,
    timing_factor: f64,
    rc_resistance_ohms: f64,
    vref: f64,
    full_scale: f64,
    divider_ohms: f64,
    default_code: u16,
    bands: Vec<CodeBand>,
}

impl Converter {
    /// Build a converter from meter configuration.
    #[must_use]
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            clock_hz: config.clock_hz,
            timing_factor: config.rc.timing_factor,
            rc_resistance_ohms: config.rc.resistance_ohms,
            vref: config.adc.vref,
            full_scale: f64::from(config.adc.full_scale),
            divider_ohms: config.adc.divider_ohms,
            default_code: config.codes.default_code,
            bands: config.codes.bands.clone(),
        }
    }

    /// Convert a raw period measurement and ADC sample into a reading.
    #[must_use]
    pub fn reading(&self, raw: RawPeriod, adc_counts: u16) -> Reading {
        let period_s = raw.period_seconds(self.clock_hz);
        let frequency_hz = 1.0 / period_s;
        let capacitance_uf = self.capacitance_uf(frequency_hz);
        let voltage = self.voltage(adc_counts);
        Reading {
            ticks: raw.ticks,
            periods: raw.periods,
            period_s,
            frequency_hz,
            capacitance_uf,
            adc_counts,
            voltage,
            resistance_ohms: self.resistance_ohms(voltage),
            code: self.classify(capacitance_uf),
        }
    }

    /// Capacitance in microfarads from oscillator frequency.
    #[must_use]
    pub fn capacitance_uf(&self, frequency_hz: f64) -> f64 {
        self.timing_factor / (frequency_hz * self.rc_resistance_ohms) * 1e6
    }

    /// ADC sample as volts.
    #[must_use]
    pub fn voltage(&self, adc_counts: u16) -> f64 {
        f64::from(adc_counts) * self.vref / self.full_scale
    }

    /// Unknown divider resistance in ohms from the sampled voltage.
    ///
    /// At full scale the divider equation has no finite solution, so the
    /// result saturates to infinity instead of dividing by zero.
    #[must_use]
    pub fn resistance_ohms(&self, voltage: f64) -> f64 {
        let headroom = self.vref - voltage;
        if headroom <= 0.0 {
            f64::INFINITY
        } else {
            self.divider_ohms * voltage / headroom
        }
    }

    /// Component code for a capacitance; first matching band wins.
    #[must_use]
    pub fn classify(&self, capacitance_uf: f64) -> u16 {
        self.bands
            .iter()
            .find(|band| band.min_uf < capacitance_uf && capacitance_uf < band.max_uf)
            .map_or(self.default_code, |band| band.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> Converter {
        Converter::new(&MeterConfig::default())
    }

    #[test]
    fn test_reading_from_1khz() {
        // Exactly 100 periods of 1 ms: 2_000_000 ticks at 40 MHz.
        let raw = RawPeriod {
            ticks: 2_000_000,
            periods: 100,
        };
        let reading = converter().reading(raw, 512);

        assert!((reading.frequency_hz - 1000.0).abs() < 1e-6);
        assert!((reading.period_s - 0.001).abs() < 1e-12);
        // 1.44 / (1000 * 5001) * 1e6 = 0.28794 uF
        assert!((reading.capacitance_uf - 0.287_942).abs() < 1e-4);
        assert_eq!(reading.code, 102);
    }

    #[test]
    fn test_capacitance_tracks_inverse_frequency() {
        let c = converter();
        let at_1k = c.capacitance_uf(1000.0);
        let at_2k = c.capacitance_uf(2000.0);
        assert!((at_1k / at_2k - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_voltage_and_resistance() {
        let c = converter();
        // Half scale: just over half of vref, divider near the fixed leg.
        let v = c.voltage(512);
        assert!((v - 512.0 * 3.3 / 1023.0).abs() < 1e-12);

        let r = c.resistance_ohms(v);
        assert!((r - 980.0 * v / (3.3 - v)).abs() < 1e-9);

        // Mid-rail exactly: R equals the fixed divider leg.
        let r_mid = c.resistance_ohms(1.65);
        assert!((r_mid - 980.0).abs() < 1e-9);
    }

    #[test]
    fn test_resistance_saturates_at_full_scale() {
        let c = converter();
        assert!(c.resistance_ohms(3.3).is_infinite());
        assert!(c.resistance_ohms(3.4).is_infinite());
    }

    #[test]
    fn test_classification_bands() {
        let c = converter();
        assert_eq!(c.classify(0.1), 104);
        assert_eq!(c.classify(1.0), 105);
        assert_eq!(c.classify(0.00103), 102);
        assert_eq!(c.classify(0.0101), 103);
        // Outside every band falls back to the default.
        assert_eq!(c.classify(0.5), 102);
        assert_eq!(c.classify(10.0), 102);
    }

    #[test]
    fn test_band_edges_exclusive() {
        let c = converter();
        assert_eq!(c.classify(0.08), 102);
        assert_eq!(c.classify(0.15), 102);
    }
}
