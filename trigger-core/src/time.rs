//! Wraparound-safe elapsed-time arithmetic.
//!
//! Timestamps throughout the pipeline are 32-bit microsecond or millisecond
//! counters taken from a monotonic timer that wraps long before the system
//! stops running (a u32 microsecond counter rolls over after ~71 minutes).
//! Unsigned wrapping subtraction yields the correct elapsed value across a
//! single wrap, which is all the polling intervals here ever span.

/// Elapsed microseconds between two timer readings.
pub const fn elapsed_us(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

/// Elapsed milliseconds between two timer readings.
pub const fn elapsed_ms(start: u32, now: u32) -> u32 {
    now.wrapping_sub(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_without_wrap() {
        assert_eq!(elapsed_us(1_000, 4_500), 3_500);
        assert_eq!(elapsed_ms(0, 0), 0);
    }

    #[test]
    fn elapsed_across_wrap() {
        // Started just before rollover, read just after.
        let start = u32::MAX - 99;
        let now = 400u32;
        assert_eq!(elapsed_us(start, now), 500);
        // Matches the explicit overflow-corrected formula.
        assert_eq!(elapsed_us(start, now), u32::MAX - start + now + 1);
    }

    #[test]
    fn elapsed_full_range() {
        assert_eq!(elapsed_ms(1, 0), u32::MAX);
    }
}
