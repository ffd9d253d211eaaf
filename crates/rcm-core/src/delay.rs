//! Busy-wait delay primitives.
//!
//! Two independent time bases, mirroring the reference board:
//!
//! - [`wait_1ms`] / [`wait_ms`] spin on the free-running counter, which
//!   ticks at half the system clock.
//! - [`delay_us`] spins on the delay timer peripheral, which counts full
//!   clock cycles and is enabled only for the duration of the call.
//!
//! All delays are minimums: each completes no earlier than the requested
//! time, overshooting by at most one poll interval.

use rcm_hal::Hal;

/// Spin on the free-running counter for one millisecond.
pub fn wait_1ms<H: Hal>(hal: &mut H) {
    let ticks = hal.clock_hz() / 2000;
    hal.reset_counter();
    while hal.read_counter() < ticks {}
}

/// Spin on the free-running counter for `ms` milliseconds.
pub fn wait_ms<H: Hal>(hal: &mut H, ms: u32) {
    for _ in 0..ms {
        wait_1ms(hal);
    }
}

/// Spin on the delay timer for `us` microseconds (at most 255).
///
/// The delay is burned in 100 us, then 10 us, then 1 us chunks so the
/// per-iteration poll overhead stays a small fraction of each chunk. The
/// timer is enabled on entry and disabled on exit, leaving the
/// peripheral free for other users.
pub fn delay_us<H: Hal>(hal: &mut H, us: u8) {
    let clock = hal.clock_hz();
    let mut remaining = u64::from(us);
    hal.enable_timer();

    while remaining >= 100 {
        remaining -= 100;
        burn(hal, clock / 10_000);
    }
    while remaining >= 10 {
        remaining -= 10;
        burn(hal, clock / 100_000);
    }
    while remaining > 0 {
        remaining -= 1;
        burn(hal, clock / 1_000_000);
    }

    hal.disable_timer();
}

fn burn<H: Hal>(hal: &mut H, cycles: u64) {
    hal.reset_timer();
    while hal.read_timer() < cycles {}
}

/// Spin on the delay timer for `ms` milliseconds, as four 250 us chunks
/// per millisecond.
pub fn wait_ms_timer<H: Hal>(hal: &mut H, ms: u32) {
    for _ in 0..ms {
        for _ in 0..4 {
            delay_us(hal, 250);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcm_hal::SimBoard;

    const CLOCK_HZ: u64 = 40_000_000;

    // Tight poll cost so assertions on elapsed time can use small slack.
    fn board() -> SimBoard {
        SimBoard::new(CLOCK_HZ).with_poll_cost(4)
    }

    #[test]
    fn test_wait_1ms_duration() {
        let mut hal = board();
        let mark = hal.now_cycles();
        wait_1ms(&mut hal);
        let elapsed = hal.elapsed_since(mark);
        // 1 ms = 40_000 cycles; allow reset + final read overshoot.
        assert!(elapsed >= 40_000, "elapsed {elapsed}");
        assert!(elapsed < 40_100, "elapsed {elapsed}");
    }

    #[test]
    fn test_wait_ms_scales() {
        let mut hal = board();
        let mark = hal.now_cycles();
        wait_ms(&mut hal, 5);
        let elapsed = hal.elapsed_since(mark);
        assert!(elapsed >= 200_000, "elapsed {elapsed}");
        assert!(elapsed < 200_500, "elapsed {elapsed}");
    }

    #[test]
    fn test_delay_us_single_microsecond() {
        let mut hal = board();
        let mark = hal.now_cycles();
        delay_us(&mut hal, 1);
        let elapsed = hal.elapsed_since(mark);
        // 1 us = 40 cycles plus enable/reset/disable overhead.
        assert!(elapsed >= 40, "elapsed {elapsed}");
        assert!(elapsed < 120, "elapsed {elapsed}");
    }

    #[test]
    fn test_delay_us_chunked() {
        let mut hal = board();
        let mark = hal.now_cycles();
        // 237 us = 2x100 + 3x10 + 7x1
        delay_us(&mut hal, 237);
        let elapsed = hal.elapsed_since(mark);
        assert!(elapsed >= 237 * 40, "elapsed {elapsed}");
        assert!(elapsed < 237 * 40 + 600, "elapsed {elapsed}");
    }

    #[test]
    fn test_delay_us_chunk_boundaries() {
        // Fenceposts of the 100/10/1 us decomposition, including the
        // exact chunk edges and the maximum input.
        for t in [0u8, 1, 9, 10, 99, 100, 255] {
            let mut hal = board();
            let mark = hal.now_cycles();
            delay_us(&mut hal, t);
            let elapsed = hal.elapsed_since(mark);
            let requested = u64::from(t) * 40;
            assert!(elapsed >= requested, "t={t}: elapsed {elapsed}");
            assert!(elapsed < requested + 600, "t={t}: elapsed {elapsed}");
        }
    }

    #[test]
    fn test_delay_us_zero_is_cheap() {
        let mut hal = board();
        let mark = hal.now_cycles();
        delay_us(&mut hal, 0);
        // Only the enable/disable bookkeeping runs.
        assert!(hal.elapsed_since(mark) < 40);
    }

    #[test]
    fn test_delay_us_leaves_timer_disabled() {
        let mut hal = board();
        delay_us(&mut hal, 50);
        let frozen = hal.read_timer();
        wait_1ms(&mut hal);
        assert_eq!(hal.read_timer(), frozen);
    }

    #[test]
    fn test_wait_ms_timer_duration() {
        let mut hal = board();
        let mark = hal.now_cycles();
        wait_ms_timer(&mut hal, 2);
        let elapsed = hal.elapsed_since(mark);
        // 2 ms = 80_000 cycles, eight delay_us(250) calls of overhead.
        assert!(elapsed >= 80_000, "elapsed {elapsed}");
        assert!(elapsed < 81_500, "elapsed {elapsed}");
    }
}
