//! HD44780 character LCD driver in 4-bit mode.
//!
//! Each byte goes out as two nibbles on D4..D7, latched by a strobe on
//! the enable pin. Timing follows the controller's datasheet minimums
//! with generous margins: 40 us around each strobe, 2 ms after data and
//! 5 ms after commands.

use rcm_core::delay::{delay_us, wait_ms_timer};
use rcm_hal::{Hal, OutputPin};

/// Characters per display line.
pub const CHARS_PER_LINE: usize = 16;

/// Display line selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LcdLine {
    /// Top line (DDRAM base 0x00).
    Top,
    /// Bottom line (DDRAM base 0x40).
    Bottom,
}

impl LcdLine {
    fn set_address_command(self) -> u8 {
        match self {
            Self::Top => 0x80,
            Self::Bottom => 0xC0,
        }
    }
}

fn pulse<H: Hal>(hal: &mut H) {
    hal.set_pin(OutputPin::LcdEnable, true);
    delay_us(hal, 40);
    hal.set_pin(OutputPin::LcdEnable, false);
}

fn write_nibble<H: Hal>(hal: &mut H, nibble: u8) {
    hal.set_pin(OutputPin::LcdD7, nibble & 0x8 != 0);
    hal.set_pin(OutputPin::LcdD6, nibble & 0x4 != 0);
    hal.set_pin(OutputPin::LcdD5, nibble & 0x2 != 0);
    hal.set_pin(OutputPin::LcdD4, nibble & 0x1 != 0);
    pulse(hal);
}

fn write_byte<H: Hal>(hal: &mut H, byte: u8) {
    write_nibble(hal, byte >> 4);
    delay_us(hal, 40);
    write_nibble(hal, byte & 0xf);
}

/// Write a command byte and wait out its execution time.
pub fn command<H: Hal>(hal: &mut H, byte: u8) {
    hal.set_pin(OutputPin::LcdRs, false);
    write_byte(hal, byte);
    wait_ms_timer(hal, 5);
}

/// Write a data (character) byte and wait out its execution time.
pub fn data<H: Hal>(hal: &mut H, byte: u8) {
    hal.set_pin(OutputPin::LcdRs, true);
    write_byte(hal, byte);
    wait_ms_timer(hal, 2);
}

/// Initialize the display into 4-bit, two-line, cursor-off mode.
///
/// The 0x33, 0x33, 0x32 preamble forces the controller into a known
/// 8-bit state regardless of what mode it woke up in, then switches to
/// 4-bit. Ends with a cleared screen.
pub fn init<H: Hal>(hal: &mut H) {
    hal.set_pin(OutputPin::LcdEnable, false);
    wait_ms_timer(hal, 20);

    command(hal, 0x33);
    command(hal, 0x33);
    command(hal, 0x32);

    command(hal, 0x28); // 4-bit bus, two lines, 5x8 font
    command(hal, 0x0C); // display on, cursor off
    command(hal, 0x01); // clear
    wait_ms_timer(hal, 20);
}

/// Print a string on one display line.
///
/// Text longer than the line is truncated; with `clear_to_end` the rest
/// of the line is overwritten with spaces so stale characters from a
/// previous, longer readout cannot linger.
pub fn print<H: Hal>(hal: &mut H, line: LcdLine, text: &str, clear_to_end: bool) {
    command(hal, line.set_address_command());
    wait_ms_timer(hal, 5);

    let mut written = 0;
    for byte in text.bytes().take(CHARS_PER_LINE) {
        data(hal, byte);
        written += 1;
    }
    if clear_to_end {
        for _ in written..CHARS_PER_LINE {
            data(hal, b' ');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_hal::SimBoard;

    const CLOCK_HZ: u64 = 40_000_000;

    fn board() -> SimBoard {
        SimBoard::new(CLOCK_HZ).with_poll_cost(4)
    }

    #[test]
    fn test_init_command_sequence() {
        let mut hal = board();
        init(&mut hal);
        assert_eq!(hal.lcd().commands(), &[0x33, 0x33, 0x32, 0x28, 0x0C, 0x01]);
    }

    #[test]
    fn test_print_top_line() {
        let mut hal = board();
        init(&mut hal);
        print(&mut hal, LcdLine::Top, "Hello", true);
        assert_eq!(hal.lcd().line_trimmed(1), "Hello");
        assert_eq!(hal.lcd().line(1).len(), CHARS_PER_LINE);
    }

    #[test]
    fn test_print_bottom_line_truncates() {
        let mut hal = board();
        init(&mut hal);
        print(&mut hal, LcdLine::Bottom, "0123456789abcdefOVERFLOW", true);
        assert_eq!(hal.lcd().line(2), "0123456789abcdef");
    }

    #[test]
    fn test_clear_to_end_erases_stale_text() {
        let mut hal = board();
        init(&mut hal);
        print(&mut hal, LcdLine::Top, "a long readout", true);
        print(&mut hal, LcdLine::Top, "short", true);
        assert_eq!(hal.lcd().line_trimmed(1), "short");
    }

    #[test]
    fn test_no_clear_preserves_tail() {
        let mut hal = board();
        init(&mut hal);
        print(&mut hal, LcdLine::Top, "abcdef", true);
        print(&mut hal, LcdLine::Top, "XY", false);
        assert_eq!(hal.lcd().line_trimmed(1), "XYcdef");
    }
}
