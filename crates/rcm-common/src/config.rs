//! Configuration structures for the meter runtime.
//!
//! Supports TOML deserialization with sensible defaults matching the
//! reference hardware (40 MHz system clock, 100-period sampling, the
//! lab RC oscillator constants).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level meter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// System clock rate in Hz. The free-running counter ticks at half
    /// this rate; the delay timer counts at the full rate.
    pub clock_hz: u64,

    /// Number of consecutive periods accumulated per measurement.
    pub sample_periods: u32,

    /// Settle delay after power-up before the first scan.
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,

    /// Delay between successive scans.
    #[serde(with = "humantime_serde")]
    pub scan_delay: Duration,

    /// ADC front-end configuration.
    pub adc: AdcConfig,

    /// RC oscillator constants for the capacitance estimate.
    pub rc: RcConfig,

    /// Component-code classification bands.
    pub codes: CodeConfig,

    /// Frequency band that switches the display to resistance mode and
    /// latches the indicator LED on.
    pub led_band: LedBandConfig,

    /// Readout formatting configuration.
    pub display: DisplayConfig,

    /// Simulated board configuration.
    pub sim: SimConfig,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            clock_hz: 40_000_000,
            sample_periods: 100,
            settle_delay: Duration::from_millis(500),
            scan_delay: Duration::from_millis(200),
            adc: AdcConfig::default(),
            rc: RcConfig::default(),
            codes: CodeConfig::default(),
            led_band: LedBandConfig::default(),
            display: DisplayConfig::default(),
            sim: SimConfig::default(),
        }
    }
}

/// ADC front-end configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdcConfig {
    /// Analog channel number sampled each scan.
    pub channel: u8,

    /// Reference voltage in volts.
    pub vref: f64,

    /// Full-scale sample value (10-bit converter: 1023).
    pub full_scale: u16,

    /// Known fixed resistor in the divider, in ohms.
    pub divider_ohms: f64,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            channel: 4,
            vref: 3.3,
            full_scale: 1023,
            divider_ohms: 980.0,
        }
    }
}

/// RC oscillator constants used to derive capacitance from frequency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RcConfig {
    /// Astable timing factor (1.44 for the 555-style oscillator).
    pub timing_factor: f64,

    /// Total timing resistance of the oscillator in ohms.
    pub resistance_ohms: f64,
}

impl Default for RcConfig {
    fn default() -> Self {
        Self {
            timing_factor: 1.44,
            resistance_ohms: 5001.0,
        }
    }
}

/// One component-code classification band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CodeBand {
    /// Lower bound of the band in microfarads (exclusive).
    pub min_uf: f64,
    /// Upper bound of the band in microfarads (exclusive).
    pub max_uf: f64,
    /// Component code reported when the capacitance falls in the band.
    pub code: u16,
}

/// Component-code classification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeConfig {
    /// Code reported when no band matches.
    pub default_code: u16,

    /// Classification bands, checked in order; first match wins.
    pub bands: Vec<CodeBand>,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            default_code: 102,
            bands: vec![
                CodeBand {
                    min_uf: 0.08,
                    max_uf: 0.15,
                    code: 104,
                },
                CodeBand {
                    min_uf: 0.90,
                    max_uf: 1.05,
                    code: 105,
                },
                // Narrow tolerance bands around two nominal values.
                CodeBand {
                    min_uf: 0.00095,
                    max_uf: 0.00111,
                    code: 102,
                },
                CodeBand {
                    min_uf: 0.0095,
                    max_uf: 0.0107,
                    code: 103,
                },
            ],
        }
    }
}

/// Frequency band for the resistance display mode / indicator LED.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct LedBandConfig {
    /// Lower band edge in Hz (exclusive).
    pub low_hz: f64,
    /// Upper band edge in Hz (exclusive).
    pub high_hz: f64,
}

impl Default for LedBandConfig {
    fn default() -> Self {
        Self {
            low_hz: 120_000.0,
            high_hz: 180_000.0,
        }
    }
}

/// Readout formatting configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Below this many microfarads the LCD shows nanofarads.
    pub nf_threshold_uf: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            nf_threshold_uf: 0.05,
        }
    }
}

/// Signal source driving the simulated input pin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceConfig {
    /// Square wave at a fixed frequency.
    Square {
        /// Frequency in Hz.
        frequency_hz: f64,
        /// High fraction of the period (0.0..1.0).
        #[serde(default = "default_duty")]
        duty: f64,
    },
    /// Pin held at a constant level (exercises the no-signal path).
    Constant {
        /// Pin level.
        level: bool,
    },
}

fn default_duty() -> f64 {
    0.5
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Square {
            frequency_hz: 1000.0,
            duty: 0.5,
        }
    }
}

/// Simulated board configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Signal source on the period input pin.
    pub source: SourceConfig,

    /// Fixed sample returned by the simulated ADC.
    pub adc_counts: u16,

    /// Virtual cycles consumed by each hardware access. Models the loop
    /// overhead that paces every busy-wait on real silicon.
    pub poll_cost_cycles: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            adc_counts: 512,
            poll_cost_cycles: 40,
        }
    }
}

impl MeterConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Counter ticks corresponding to one millisecond (clock_hz / 2000).
    #[must_use]
    pub fn ticks_per_ms(&self) -> u64 {
        self.clock_hz / 2000
    }

    /// The no-signal timeout threshold in counter ticks (clock_hz / 4).
    #[must_use]
    pub fn timeout_ticks(&self) -> u64 {
        self.clock_hz / 4
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
