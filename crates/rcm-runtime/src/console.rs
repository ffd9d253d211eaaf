//! Serial-console readout.
//!
//! The live readout overwrites itself in place: every status line ends
//! with a carriage return instead of a newline, so a terminal shows one
//! continuously updating line. Lines are space-padded so a shorter
//! status fully covers a longer previous one.

use std::io::Write;

use rcm_common::{MeterError, MeterResult};
use rcm_core::Reading;

/// Padded width of the no-signal status line.
const NO_SIGNAL_WIDTH: usize = 40;

/// Destination for console status output.
pub trait StatusSink {
    /// Emit the one-time startup banner (followed by a line break).
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::Display`] if the sink cannot be written.
    fn banner(&mut self, text: &str) -> MeterResult<()>;

    /// Emit a live status line (terminated by a carriage return).
    ///
    /// # Errors
    ///
    /// Returns [`MeterError::Display`] if the sink cannot be written.
    fn status(&mut self, line: &str) -> MeterResult<()>;
}

/// Status sink writing to any byte stream, typically stdout.
#[derive(Debug)]
pub struct TerminalStatus<W: Write> {
    writer: W,
}

impl<W: Write> TerminalStatus<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write(&mut self, text: &str, terminator: &str) -> MeterResult<()> {
        self.writer
            .write_all(text.as_bytes())
            .and_then(|()| self.writer.write_all(terminator.as_bytes()))
            .and_then(|()| self.writer.flush())
            .map_err(|e| MeterError::Display(e.to_string()))
    }
}

impl<W: Write> StatusSink for TerminalStatus<W> {
    fn banner(&mut self, text: &str) -> MeterResult<()> {
        self.write(text, "\r\n")
    }

    // Flushed every line: without a newline, stdio would otherwise sit
    // on the carriage-return-terminated status forever.
    fn status(&mut self, line: &str) -> MeterResult<()> {
        self.write(line, "\r")
    }
}

/// Status sink that records lines in memory, for tests.
#[derive(Debug, Default)]
pub struct CaptureStatus {
    /// Banner lines, in order.
    pub banners: Vec<String>,
    /// Status lines, in order.
    pub statuses: Vec<String>,
}

impl StatusSink for CaptureStatus {
    fn banner(&mut self, text: &str) -> MeterResult<()> {
        self.banners.push(text.to_string());
        Ok(())
    }

    fn status(&mut self, line: &str) -> MeterResult<()> {
        self.statuses.push(line.to_string());
        Ok(())
    }
}

/// Format the live console status line for a reading.
#[must_use]
pub fn format_reading(reading: &Reading) -> String {
    format!(
        "f={:.2}Hz, Count={}, Cap={:.4}uF , resistance={:.4}ohms code={} ",
        reading.frequency_hz,
        reading.ticks,
        reading.capacitance_uf,
        reading.resistance_ohms,
        reading.code
    )
}

/// Format the console status line shown when the signal is absent.
#[must_use]
pub fn format_no_signal() -> String {
    format!("{:<NO_SIGNAL_WIDTH$}", "NO SIGNAL")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_core::RawPeriod;
    use rcm_common::MeterConfig;
    use rcm_core::Converter;

    fn sample_reading() -> Reading {
        let converter = Converter::new(&MeterConfig::default());
        let raw = RawPeriod {
            ticks: 2_000_000,
            periods: 100,
        };
        converter.reading(raw, 512)
    }

    #[test]
    fn test_format_reading_layout() {
        let line = format_reading(&sample_reading());
        assert!(line.starts_with("f=1000.00Hz, Count=2000000, Cap=0.2879uF "));
        assert!(line.contains("ohms code=102 "));
    }

    #[test]
    fn test_no_signal_padded() {
        let line = format_no_signal();
        assert!(line.starts_with("NO SIGNAL"));
        assert_eq!(line.len(), NO_SIGNAL_WIDTH);
    }

    #[test]
    fn test_terminal_status_terminators() {
        let mut buf = Vec::new();
        {
            let mut sink = TerminalStatus::new(&mut buf);
            sink.banner("hello").unwrap();
            sink.status("live").unwrap();
        }
        assert_eq!(buf, b"hello\r\nlive\r");
    }

    #[test]
    fn test_capture_status_records() {
        let mut sink = CaptureStatus::default();
        sink.banner("b").unwrap();
        sink.status("s1").unwrap();
        sink.status("s2").unwrap();
        assert_eq!(sink.banners, ["b"]);
        assert_eq!(sink.statuses, ["s1", "s2"]);
    }
}
