//! Timestamps for the pipeline core.
//!
//! The core components take plain u32 counters; these helpers truncate the
//! monotonic Embassy clock accordingly. All consumers compare timestamps
//! with the core's wrapping elapsed-time helpers, so the truncation is
//! safe across rollover.

use embassy_time::Instant;

/// Current monotonic time in microseconds, truncated to 32 bits.
pub fn now_us() -> u32 {
    Instant::now().as_micros() as u32
}

/// Current monotonic time in milliseconds, truncated to 32 bits.
pub fn now_ms() -> u32 {
    Instant::now().as_millis() as u32
}
