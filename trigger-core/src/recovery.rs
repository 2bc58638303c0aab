//! Escalating sensor recovery ladder.
//!
//! When the acquisition loop stops seeing frames it climbs this ladder:
//! first flush the buffers, then soft-reset the sensor link, then a full
//! reinitialization. Attempts are rate-limited, and a run of good frames
//! walks the ladder back down to the bottom.

use crate::time::elapsed_ms;

/// No frame for this long means the sensor link is down.
pub const COMM_TIMEOUT_MS: u32 = 2_000;
/// Consecutive good frames required to reset the escalation level.
pub const GOOD_FRAMES_TO_RESET: u32 = 5;

/// One rung of the recovery ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecoveryAction {
    /// Drop queued frames and drain the receive path.
    FlushBuffers,
    /// Re-apply the sensor link settings without a full bring-up.
    SoftReset,
    /// Run the complete sensor bring-up sequence from scratch.
    FullReinit,
}

/// Tracks escalation level, attempt rate limiting, and the good-frame
/// streak that de-escalates.
pub struct RecoveryLadder {
    attempts: u32,
    last_attempt_ms: u32,
    has_attempted: bool,
    good_frames: u32,
}

impl RecoveryLadder {
    pub const fn new() -> Self {
        Self {
            attempts: 0,
            last_attempt_ms: 0,
            has_attempted: false,
            good_frames: 0,
        }
    }

    /// Picks the next recovery action, or `None` while still inside the
    /// rate-limit window of the previous attempt.
    ///
    /// Issuing a full reinitialization resets the attempt counter, so a
    /// link that stays dead cycles through the whole ladder again rather
    /// than hammering the most expensive rung.
    pub fn next_action(&mut self, now_ms: u32, min_delay_ms: u32) -> Option<RecoveryAction> {
        if self.has_attempted && elapsed_ms(self.last_attempt_ms, now_ms) < min_delay_ms {
            return None;
        }

        self.last_attempt_ms = now_ms;
        self.has_attempted = true;
        self.good_frames = 0;

        let action = match self.attempts {
            0 => RecoveryAction::FlushBuffers,
            1 => RecoveryAction::SoftReset,
            _ => RecoveryAction::FullReinit,
        };
        if action == RecoveryAction::FullReinit {
            self.attempts = 0;
        } else {
            self.attempts += 1;
        }
        Some(action)
    }

    /// Records one good frame; returns `true` on the frame that completes
    /// the streak and resets the escalation level.
    pub fn record_good_frame(&mut self) -> bool {
        if self.attempts == 0 {
            return false;
        }
        self.good_frames += 1;
        if self.good_frames >= GOOD_FRAMES_TO_RESET {
            self.attempts = 0;
            self.good_frames = 0;
            return true;
        }
        false
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

impl Default for RecoveryLadder {
    fn default() -> Self {
        Self::new()
    }
}
