//! Common time/period helpers for fallwatch_core.

use std::time::Duration;

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in microseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given sampling rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Number of samples that arrive during `window` at `hz`, rounded up, at least 1.
#[inline]
pub fn ticks_in(window: Duration, hz: u32) -> usize {
    let ticks = (window.as_secs_f64() * f64::from(hz.max(1))).ceil();
    if ticks < 1.0 { 1 } else { ticks as usize }
}

/// Stall threshold: no valid sample for this long means the source is stuck.
///
/// Four read timeouts catch a dead interrupt line quickly; the floor of two
/// sample periods tolerates a single missed sample at low rates.
#[inline]
pub fn stall_threshold_ms(read_timeout_ms: u64, sample_rate_hz: u32) -> u64 {
    let fast = read_timeout_ms.saturating_mul(4);
    let two_p = period_ms(sample_rate_hz).saturating_mul(2);
    fast.max(two_p).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_round_up() {
        assert_eq!(ticks_in(Duration::from_secs(2), 100), 200);
        assert_eq!(ticks_in(Duration::from_millis(15), 100), 2);
        assert_eq!(ticks_in(Duration::ZERO, 100), 1);
        assert_eq!(ticks_in(Duration::from_secs(1), 0), 1);
    }

    #[test]
    fn stall_threshold_uses_larger_of_fast_and_two_periods() {
        // fast=2000, two_p=20
        assert_eq!(stall_threshold_ms(500, 100), 2000);
        // fast=4, two_p=2000 at 1 Hz
        assert_eq!(stall_threshold_ms(1, 1), 2000);
        assert_eq!(stall_threshold_ms(0, 8000), 1);
    }
}
