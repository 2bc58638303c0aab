//! Byte-level framing for the sensor's streaming protocol.
//!
//! The sensor emits fixed 9-byte frames: two 0x59 sync bytes, three
//! little-endian u16 fields (distance, strength, temperature) and an 8-bit
//! additive checksum: the sum of bytes 0..=7 modulo 256 must equal byte 8.
//!
//! [`FrameParser`] is fed one byte at a time and never blocks; the
//! acquisition loop also polls [`FrameParser::poll_timeout`] so a stalled
//! partial frame falls back to sync search instead of wedging the stream.

use crate::time::elapsed_us;

/// Both frame sync bytes have the same value.
pub const SYNC_BYTE: u8 = 0x59;
/// Total frame length including sync and checksum bytes.
pub const FRAME_LEN: usize = 9;

/// Minimum valid distance; readings below this are sensor dead zone noise.
pub const MIN_DISTANCE_CM: u16 = 7;
/// Maximum valid distance; readings above this are out-of-range returns.
pub const MAX_DISTANCE_CM: u16 = 1200;

/// Frame-completion timeout before the observed rate is known.
pub const DEFAULT_FRAME_TIMEOUT_US: u32 = 3_000;
/// Lower clamp for the adaptive timeout.
pub const MIN_FRAME_TIMEOUT_US: u32 = 1_000;
/// Upper clamp for the adaptive timeout.
pub const MAX_FRAME_TIMEOUT_US: u32 = 10_000;

/// Sync-failure count past which the stream is considered desynchronized
/// enough to warrant a health check.
pub const SYNC_FAILURE_LIMIT: u32 = 1_000;

/// Decoded frame payload, before range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMeasurement {
    pub distance_cm: u16,
    pub strength: u16,
    pub temperature: u16,
}

/// Result of feeding one byte into the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FeedOutcome {
    /// Byte consumed, no complete frame yet.
    Pending,
    /// A complete frame passed its checksum.
    Frame(RawMeasurement),
    /// A complete frame failed its checksum and was discarded.
    ChecksumMismatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    WaitFirstSync,
    WaitSecondSync,
    Reading,
}

/// Framing state machine with explicit, inspectable counters.
pub struct FrameParser {
    state: SyncState,
    buf: [u8; FRAME_LEN],
    index: usize,
    frame_start_us: u32,
    /// Consecutive bytes rejected while searching for sync.
    pub sync_failures: u32,
    /// Frames accepted since the counters were last reset.
    pub frames_ok: u32,
    /// Frames rejected (checksum) since the counters were last reset.
    pub frames_bad: u32,
}

impl FrameParser {
    pub const fn new() -> Self {
        Self {
            state: SyncState::WaitFirstSync,
            buf: [0; FRAME_LEN],
            index: 0,
            frame_start_us: 0,
            sync_failures: 0,
            frames_ok: 0,
            frames_bad: 0,
        }
    }

    /// Consumes one byte from the stream.
    pub fn feed(&mut self, byte: u8, now_us: u32) -> FeedOutcome {
        match self.state {
            SyncState::WaitFirstSync => {
                if byte == SYNC_BYTE {
                    self.state = SyncState::WaitSecondSync;
                } else {
                    self.sync_failures = self.sync_failures.saturating_add(1);
                }
                FeedOutcome::Pending
            }
            SyncState::WaitSecondSync => {
                if byte == SYNC_BYTE {
                    self.buf[0] = SYNC_BYTE;
                    self.buf[1] = SYNC_BYTE;
                    self.index = 2;
                    self.frame_start_us = now_us;
                    self.state = SyncState::Reading;
                    self.sync_failures = 0;
                } else {
                    // The first sync byte was a false positive.
                    self.state = SyncState::WaitFirstSync;
                    self.sync_failures = self.sync_failures.saturating_add(1);
                }
                FeedOutcome::Pending
            }
            SyncState::Reading => {
                self.buf[self.index] = byte;
                self.index += 1;
                if self.index < FRAME_LEN {
                    return FeedOutcome::Pending;
                }
                self.state = SyncState::WaitFirstSync;
                if checksum(&self.buf) == self.buf[FRAME_LEN - 1] {
                    self.frames_ok = self.frames_ok.saturating_add(1);
                    FeedOutcome::Frame(decode(&self.buf))
                } else {
                    self.frames_bad = self.frames_bad.saturating_add(1);
                    FeedOutcome::ChecksumMismatch
                }
            }
        }
    }

    /// Aborts a partially read frame whose completion deadline has passed.
    /// Returns `true` if a partial frame was discarded.
    pub fn poll_timeout(&mut self, now_us: u32, timeout_us: u32) -> bool {
        if self.state == SyncState::Reading && elapsed_us(self.frame_start_us, now_us) > timeout_us {
            self.state = SyncState::WaitFirstSync;
            self.index = 0;
            return true;
        }
        false
    }

    /// True while bytes of a frame body are being collected.
    pub fn mid_frame(&self) -> bool {
        self.state == SyncState::Reading
    }

    /// Resets the per-interval frame counters after a rate observation.
    pub fn reset_window_counters(&mut self) {
        self.frames_ok = 0;
        self.frames_bad = 0;
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

fn checksum(buf: &[u8; FRAME_LEN]) -> u8 {
    let mut sum = 0u8;
    for &b in &buf[..FRAME_LEN - 1] {
        sum = sum.wrapping_add(b);
    }
    sum
}

fn decode(buf: &[u8; FRAME_LEN]) -> RawMeasurement {
    RawMeasurement {
        distance_cm: u16::from_le_bytes([buf[2], buf[3]]),
        strength: u16::from_le_bytes([buf[4], buf[5]]),
        temperature: u16::from_le_bytes([buf[6], buf[7]]),
    }
}

/// Range validation applied to decoded frames before queueing.
pub fn validate_measurement(m: &RawMeasurement, min_strength: u16) -> bool {
    m.distance_cm >= MIN_DISTANCE_CM
        && m.distance_cm <= MAX_DISTANCE_CM
        && m.strength >= min_strength
}

/// Frame-completion timeout derived from the observed frame rate,
/// recalculated once per second by the acquisition loop and clamped to
/// keep recovery fast without truncating healthy frames.
pub fn adaptive_timeout_us(observed_fps: u32) -> u32 {
    if observed_fps == 0 {
        return DEFAULT_FRAME_TIMEOUT_US;
    }
    (3_000_000 / observed_fps).clamp(MIN_FRAME_TIMEOUT_US, MAX_FRAME_TIMEOUT_US)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a well-formed frame for the given payload.
    fn frame_bytes(distance_cm: u16, strength: u16, temperature: u16) -> [u8; FRAME_LEN] {
        let d = distance_cm.to_le_bytes();
        let s = strength.to_le_bytes();
        let t = temperature.to_le_bytes();
        let mut buf = [SYNC_BYTE, SYNC_BYTE, d[0], d[1], s[0], s[1], t[0], t[1], 0];
        let mut sum = 0u8;
        for &b in &buf[..8] {
            sum = sum.wrapping_add(b);
        }
        buf[8] = sum;
        buf
    }

    fn feed_all(parser: &mut FrameParser, bytes: &[u8]) -> Option<FeedOutcome> {
        let mut last = None;
        for &b in bytes {
            let outcome = parser.feed(b, 0);
            if outcome != FeedOutcome::Pending {
                last = Some(outcome);
            }
        }
        last
    }

    #[test]
    fn accepts_valid_frame() {
        let mut parser = FrameParser::new();
        let outcome = feed_all(&mut parser, &frame_bytes(123, 456, 30));
        assert_eq!(
            outcome,
            Some(FeedOutcome::Frame(RawMeasurement {
                distance_cm: 123,
                strength: 456,
                temperature: 30,
            }))
        );
        assert_eq!(parser.frames_ok, 1);
    }

    #[test]
    fn rejects_corrupted_payload() {
        let mut parser = FrameParser::new();
        let mut bytes = frame_bytes(123, 456, 30);
        // Single-bit corruption in the payload changes the sum mod 256.
        bytes[2] ^= 0x01;
        assert_eq!(feed_all(&mut parser, &bytes), Some(FeedOutcome::ChecksumMismatch));
        assert_eq!(parser.frames_bad, 1);
    }

    #[test]
    fn resynchronizes_after_garbage() {
        let mut parser = FrameParser::new();
        feed_all(&mut parser, &[0x00, 0xFF, 0x12]);
        assert_eq!(parser.sync_failures, 3);
        let outcome = feed_all(&mut parser, &frame_bytes(200, 900, 25));
        assert!(matches!(outcome, Some(FeedOutcome::Frame(_))));
        assert_eq!(parser.sync_failures, 0);
    }

    #[test]
    fn lone_sync_byte_is_not_a_frame_start() {
        let mut parser = FrameParser::new();
        // 0x59 followed by a non-sync byte must fall back to searching, and
        // a subsequent complete frame must still parse.
        parser.feed(SYNC_BYTE, 0);
        parser.feed(0x10, 0);
        assert!(!parser.mid_frame());
        let outcome = feed_all(&mut parser, &frame_bytes(80, 300, 22));
        assert!(matches!(outcome, Some(FeedOutcome::Frame(_))));
    }

    #[test]
    fn timeout_aborts_partial_frame() {
        let mut parser = FrameParser::new();
        let bytes = frame_bytes(100, 500, 20);
        for &b in &bytes[..5] {
            parser.feed(b, 1_000);
        }
        assert!(parser.mid_frame());
        assert!(!parser.poll_timeout(3_500, 3_000)); // 2.5 ms elapsed, still within budget
        assert!(parser.poll_timeout(4_100, 3_000));
        assert!(!parser.mid_frame());

        // The stream recovers on the next full frame.
        let outcome = feed_all(&mut parser, &frame_bytes(100, 500, 20));
        assert!(matches!(outcome, Some(FeedOutcome::Frame(_))));
    }

    #[test]
    fn validation_enforces_ranges() {
        let ok = RawMeasurement { distance_cm: 100, strength: 250, temperature: 0 };
        assert!(validate_measurement(&ok, 200));

        let too_close = RawMeasurement { distance_cm: MIN_DISTANCE_CM - 1, ..ok };
        assert!(!validate_measurement(&too_close, 200));

        let too_far = RawMeasurement { distance_cm: MAX_DISTANCE_CM + 1, ..ok };
        assert!(!validate_measurement(&too_far, 200));

        let weak = RawMeasurement { strength: 199, ..ok };
        assert!(!validate_measurement(&weak, 200));

        // Boundary values are valid.
        let near = RawMeasurement { distance_cm: MIN_DISTANCE_CM, ..ok };
        assert!(validate_measurement(&near, 200));
        let far = RawMeasurement { distance_cm: MAX_DISTANCE_CM, ..ok };
        assert!(validate_measurement(&far, 200));
    }

    #[test]
    fn adaptive_timeout_tracks_rate_within_clamps() {
        assert_eq!(adaptive_timeout_us(1_000), 3_000);
        assert_eq!(adaptive_timeout_us(800), 3_750);
        // Very fast observed rates clamp low, stalls clamp high.
        assert_eq!(adaptive_timeout_us(10_000), MIN_FRAME_TIMEOUT_US);
        assert_eq!(adaptive_timeout_us(100), MAX_FRAME_TIMEOUT_US);
        assert_eq!(adaptive_timeout_us(0), DEFAULT_FRAME_TIMEOUT_US);
    }

    #[test]
    fn back_to_back_frames_parse() {
        let mut parser = FrameParser::new();
        let mut ok = 0;
        for distance in [50u16, 51, 52] {
            if let Some(FeedOutcome::Frame(m)) = feed_all(&mut parser, &frame_bytes(distance, 400, 21)) {
                assert_eq!(m.distance_cm, distance);
                ok += 1;
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(parser.frames_ok, 3);
        parser.reset_window_counters();
        assert_eq!(parser.frames_ok, 0);
    }
}
