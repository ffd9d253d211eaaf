//! Cycle-accurate simulated board.
//!
//! [`SimBoard`] models the reference hardware closely enough to run the
//! firmware's busy-wait loops unmodified:
//!
//! - A virtual clock in absolute system-clock cycles. Every hardware
//!   access advances it by a configurable poll cost, which is what makes
//!   polling loops progress and terminate.
//! - The free-running counter ticks at half the clock rate, as on the
//!   reference part.
//! - The delay timer counts full clock cycles, only while enabled, and
//!   holds its value when disabled.
//! - The signal pin is driven by a square-wave or constant source
//!   evaluated from absolute virtual time.
//! - LCD bus traffic is captured: nibbles latched on enable falling
//!   edges are reassembled into bytes and interpreted far enough to
//!   expose the two display lines to tests.

use crate::board::{Hal, InputPin, OutputPin};
use rcm_common::config::{MeterConfig, SourceConfig};

/// Signal source driving the simulated period input pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    /// Pin held at a constant level.
    Constant(bool),
    /// Square wave: low for `low_cycles`, then high for the rest of
    /// `period_cycles`, repeating from virtual time zero.
    Square {
        /// Full period in system-clock cycles.
        period_cycles: u64,
        /// Low portion of the period in cycles.
        low_cycles: u64,
    },
}

impl SignalSource {
    /// Build a source from configuration at the given clock rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_config(config: &SourceConfig, clock_hz: u64) -> Self {
        match *config {
            SourceConfig::Constant { level } => Self::Constant(level),
            SourceConfig::Square { frequency_hz, duty } => {
                let period = (clock_hz as f64 / frequency_hz).round().max(2.0) as u64;
                let duty = duty.clamp(0.01, 0.99);
                let low = ((period as f64) * (1.0 - duty)).round().max(1.0) as u64;
                Self::Square {
                    period_cycles: period,
                    low_cycles: low.min(period - 1),
                }
            }
        }
    }

    /// Square wave at a frequency, 50% duty.
    #[must_use]
    pub fn square(frequency_hz: f64, clock_hz: u64) -> Self {
        Self::from_config(
            &SourceConfig::Square {
                frequency_hz,
                duty: 0.5,
            },
            clock_hz,
        )
    }

    /// Pin level at an absolute virtual time in cycles.
    #[must_use]
    pub fn level_at(&self, cycles: u64) -> bool {
        match *self {
            Self::Constant(level) => level,
            Self::Square {
                period_cycles,
                low_cycles,
            } => (cycles % period_cycles) >= low_cycles,
        }
    }
}

/// One byte observed on the LCD bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdByte {
    /// Register-select level (false = command, true = data).
    pub rs: bool,
    /// Reassembled byte value.
    pub value: u8,
}

/// Captures and interprets 4-bit LCD bus traffic.
///
/// Nibbles are latched on each falling edge of the enable pin and paired
/// into bytes. Enough of the HD44780 command set is interpreted (DDRAM
/// address set, clear display) to reconstruct the visible text.
#[derive(Debug, Clone)]
pub struct LcdCapture {
    rs: bool,
    enable: bool,
    data: [bool; 4],
    pending_nibble: Option<(bool, u8)>,
    bytes: Vec<LcdByte>,
    commands: Vec<u8>,
    ddram: [[u8; Self::COLS]; 2],
    line: usize,
    col: usize,
}

impl LcdCapture {
    const COLS: usize = 16;

    fn new() -> Self {
        Self {
            rs: false,
            enable: false,
            data: [false; 4],
            pending_nibble: None,
            bytes: Vec::new(),
            commands: Vec::new(),
            ddram: [[b' '; Self::COLS]; 2],
            line: 0,
            col: 0,
        }
    }

    fn pin_changed(&mut self, pin: OutputPin, level: bool) {
        match pin {
            OutputPin::LcdRs => self.rs = level,
            OutputPin::LcdD4 => self.data[0] = level,
            OutputPin::LcdD5 => self.data[1] = level,
            OutputPin::LcdD6 => self.data[2] = level,
            OutputPin::LcdD7 => self.data[3] = level,
            OutputPin::LcdEnable => {
                let falling = self.enable && !level;
                self.enable = level;
                if falling {
                    self.latch_nibble();
                }
            }
            OutputPin::Led => {}
        }
    }

    fn latch_nibble(&mut self) {
        let nibble = u8::from(self.data[0])
            | u8::from(self.data[1]) << 1
            | u8::from(self.data[2]) << 2
            | u8::from(self.data[3]) << 3;

        match self.pending_nibble.take() {
            Some((rs, high)) if rs == self.rs => {
                self.apply_byte(LcdByte {
                    rs,
                    value: high << 4 | nibble,
                });
            }
            // RS changed mid-byte: discard the stale half and resync.
            _ => self.pending_nibble = Some((self.rs, nibble)),
        }
    }

    fn apply_byte(&mut self, byte: LcdByte) {
        self.bytes.push(byte);
        if byte.rs {
            if self.col < Self::COLS {
                self.ddram[self.line][self.col] = byte.value;
                self.col += 1;
            }
        } else {
            self.commands.push(byte.value);
            match byte.value {
                0x01 => {
                    self.ddram = [[b' '; Self::COLS]; 2];
                    self.line = 0;
                    self.col = 0;
                }
                cmd if cmd & 0x80 != 0 => {
                    let addr = cmd & 0x7f;
                    self.line = usize::from(addr >= 0x40);
                    self.col = usize::from(addr & 0x3f);
                }
                _ => {}
            }
        }
    }

    /// All bytes observed on the bus, in order.
    #[must_use]
    pub fn bytes(&self) -> &[LcdByte] {
        &self.bytes
    }

    /// All command bytes observed, in order.
    #[must_use]
    pub fn commands(&self) -> &[u8] {
        &self.commands
    }

    /// Visible text of a display line (1 or 2), space-padded to width.
    ///
    /// # Panics
    ///
    /// Panics if `line` is not 1 or 2.
    #[must_use]
    pub fn line(&self, line: usize) -> String {
        assert!(line == 1 || line == 2, "LCD has lines 1 and 2");
        self.ddram[line - 1].iter().map(|&b| char::from(b)).collect()
    }

    /// Visible text of a display line with trailing spaces removed.
    ///
    /// # Panics
    ///
    /// Panics if `line` is not 1 or 2.
    #[must_use]
    pub fn line_trimmed(&self, line: usize) -> String {
        self.line(line).trim_end().to_string()
    }
}

impl Default for LcdCapture {
    fn default() -> Self {
        Self::new()
    }
}

/// Cycle-accurate simulated board.
#[derive(Debug, Clone)]
pub struct SimBoard {
    clock_hz: u64,
    poll_cost_cycles: u64,
    now_cycles: u64,
    counter_base: u64,
    timer_enabled: bool,
    timer_base: u64,
    timer_frozen: u64,
    source: SignalSource,
    adc_counts: u16,
    last_adc_channel: Option<u8>,
    outputs: [bool; OutputPin::COUNT],
    lcd: LcdCapture,
}

impl SimBoard {
    /// Create a board with a 50%-duty 1 kHz square wave and default poll cost.
    #[must_use]
    pub fn new(clock_hz: u64) -> Self {
        Self {
            clock_hz,
            poll_cost_cycles: 40,
            now_cycles: 0,
            counter_base: 0,
            timer_enabled: false,
            timer_base: 0,
            timer_frozen: 0,
            source: SignalSource::square(1000.0, clock_hz),
            adc_counts: 512,
            last_adc_channel: None,
            outputs: [false; OutputPin::COUNT],
            lcd: LcdCapture::new(),
        }
    }

    /// Create a board from meter configuration.
    #[must_use]
    pub fn from_config(config: &MeterConfig) -> Self {
        Self::new(config.clock_hz)
            .with_source(SignalSource::from_config(&config.sim.source, config.clock_hz))
            .with_poll_cost(config.sim.poll_cost_cycles)
            .with_adc_counts(config.sim.adc_counts)
    }

    /// Set the signal source.
    #[must_use]
    pub fn with_source(mut self, source: SignalSource) -> Self {
        self.source = source;
        self
    }

    /// Set the per-access poll cost in cycles (minimum 1).
    #[must_use]
    pub fn with_poll_cost(mut self, cycles: u64) -> Self {
        self.poll_cost_cycles = cycles.max(1);
        self
    }

    /// Set the fixed ADC sample.
    #[must_use]
    pub fn with_adc_counts(mut self, counts: u16) -> Self {
        self.adc_counts = counts;
        self
    }

    /// Replace the signal source on a running board.
    pub fn set_source(&mut self, source: SignalSource) {
        self.source = source;
    }

    /// Absolute virtual time in system-clock cycles.
    #[must_use]
    pub fn now_cycles(&self) -> u64 {
        self.now_cycles
    }

    /// Cycles elapsed since an earlier [`now_cycles`](Self::now_cycles) mark.
    #[must_use]
    pub fn elapsed_since(&self, mark: u64) -> u64 {
        self.now_cycles - mark
    }

    /// Current level of an output pin.
    #[must_use]
    pub fn output(&self, pin: OutputPin) -> bool {
        self.outputs[pin.index()]
    }

    /// Captured LCD traffic.
    #[must_use]
    pub fn lcd(&self) -> &LcdCapture {
        &self.lcd
    }

    /// Channel of the most recent ADC read, if any.
    #[must_use]
    pub fn last_adc_channel(&self) -> Option<u8> {
        self.last_adc_channel
    }

    fn advance(&mut self) {
        self.now_cycles += self.poll_cost_cycles;
    }
}

impl Hal for SimBoard {
    fn clock_hz(&self) -> u64 {
        self.clock_hz
    }

    fn reset_counter(&mut self) {
        self.advance();
        self.counter_base = self.now_cycles;
    }

    fn read_counter(&mut self) -> u64 {
        self.advance();
        // The counter ticks once per two clock cycles.
        (self.now_cycles - self.counter_base) / 2
    }

    fn read_pin(&mut self, pin: InputPin) -> bool {
        self.advance();
        match pin {
            InputPin::Signal => self.source.level_at(self.now_cycles),
        }
    }

    fn set_pin(&mut self, pin: OutputPin, level: bool) {
        self.advance();
        self.outputs[pin.index()] = level;
        self.lcd.pin_changed(pin, level);
    }

    fn enable_timer(&mut self) {
        self.advance();
        if !self.timer_enabled {
            self.timer_base = self.now_cycles - self.timer_frozen;
            self.timer_enabled = true;
        }
    }

    fn disable_timer(&mut self) {
        self.advance();
        if self.timer_enabled {
            self.timer_frozen = self.now_cycles - self.timer_base;
            self.timer_enabled = false;
        }
    }

    fn reset_timer(&mut self) {
        self.advance();
        if self.timer_enabled {
            self.timer_base = self.now_cycles;
        } else {
            self.timer_frozen = 0;
        }
    }

    fn read_timer(&mut self) -> u64 {
        self.advance();
        if self.timer_enabled {
            self.now_cycles - self.timer_base
        } else {
            self.timer_frozen
        }
    }

    fn read_adc(&mut self, channel: u8) -> u16 {
        self.advance();
        self.last_adc_channel = Some(channel);
        self.adc_counts
    }
}
