//! Board capability trait.
//!
//! The measurement and display code never touches registers directly; it
//! is written against this trait so the same routines run on real
//! silicon or on the [`SimBoard`](crate::sim::SimBoard). The capability
//! set is deliberately small: a free-running counter, a delay timer
//! peripheral, digital pins, and a single ADC channel.

/// Digital input pins the meter reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputPin {
    /// The square-wave period input.
    Signal,
}

/// Digital output pins the meter drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputPin {
    /// LCD register select (command/data).
    LcdRs,
    /// LCD enable strobe.
    LcdEnable,
    /// LCD data bus bit 4.
    LcdD4,
    /// LCD data bus bit 5.
    LcdD5,
    /// LCD data bus bit 6.
    LcdD6,
    /// LCD data bus bit 7.
    LcdD7,
    /// Indicator LED.
    Led,
}

impl OutputPin {
    pub(crate) const COUNT: usize = 7;

    pub(crate) fn index(self) -> usize {
        match self {
            Self::LcdRs => 0,
            Self::LcdEnable => 1,
            Self::LcdD4 => 2,
            Self::LcdD5 => 3,
            Self::LcdD6 => 4,
            Self::LcdD7 => 5,
            Self::Led => 6,
        }
    }
}

/// Hardware capability set for the meter.
///
/// All methods take `&mut self`: on the simulated board every access
/// advances the virtual clock, which is what paces the busy-wait loops.
///
/// # Timing model
///
/// - The free-running counter increments once every **two** system-clock
///   cycles and is zeroed by [`reset_counter`](Hal::reset_counter).
/// - The delay timer counts full system-clock cycles, only while
///   enabled, and holds its value when disabled.
pub trait Hal {
    /// System clock rate in Hz.
    fn clock_hz(&self) -> u64;

    /// Zero the free-running counter.
    fn reset_counter(&mut self);

    /// Read the free-running counter (ticks since the last reset).
    fn read_counter(&mut self) -> u64;

    /// Read a digital input pin.
    fn read_pin(&mut self, pin: InputPin) -> bool;

    /// Drive a digital output pin.
    fn set_pin(&mut self, pin: OutputPin, level: bool);

    /// Enable the delay timer peripheral.
    fn enable_timer(&mut self);

    /// Disable the delay timer peripheral.
    fn disable_timer(&mut self);

    /// Zero the delay timer.
    fn reset_timer(&mut self);

    /// Read the delay timer (cycles counted while enabled).
    fn read_timer(&mut self) -> u64;

    /// Read one 10-bit ADC sample from the given channel.
    ///
    /// Conversion is assumed to always complete; there is no failure
    /// path, mirroring the reference hardware's blocking read.
    fn read_adc(&mut self, channel: u8) -> u16;
}
