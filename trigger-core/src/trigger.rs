//! Trigger decision pipeline: threshold gates, debounce, latch.
//!
//! Per consumed frame the pipeline evaluates the distance and velocity
//! gates for the active switch position, debounces the raw result with
//! asymmetric on/off delays, and latches the debounced output so the
//! physical line holds active for a guaranteed minimum duration once
//! triggered.

use crate::config::TriggerConfig;
use crate::time::elapsed_ms;

/// Raw signal must be continuously asserted this long before the
/// debounced output turns on.
pub const DEBOUNCE_ON_MS: u32 = 30;
/// Raw signal must be continuously deasserted this long before the
/// debounced output turns off.
pub const DEBOUNCE_OFF_MS: u32 = 50;
/// Floor on how quickly a freshly asserted output may drop again.
pub const MIN_PULSE_MS: u32 = 20;
/// Guaranteed hold duration of the latched output.
pub const LATCH_DURATION_MS: u32 = 3_000;

/// Debounces a raw boolean with asymmetric on/off delays and a minimum
/// pulse width, suppressing both activation chatter and premature
/// drop-out.
pub struct Debouncer {
    last_raw: bool,
    last_change_ms: u32,
    last_stable_ms: u32,
    stable: bool,
}

impl Debouncer {
    pub const fn new() -> Self {
        Self {
            last_raw: false,
            last_change_ms: 0,
            last_stable_ms: 0,
            stable: false,
        }
    }

    /// Feeds one raw sample; returns the debounced state.
    pub fn update(&mut self, raw: bool, now_ms: u32) -> bool {
        if raw != self.last_raw {
            self.last_change_ms = now_ms;
            self.last_raw = raw;
        }

        if raw && !self.stable && elapsed_ms(self.last_change_ms, now_ms) >= DEBOUNCE_ON_MS {
            self.stable = true;
            self.last_stable_ms = now_ms;
        } else if !raw
            && self.stable
            && elapsed_ms(self.last_change_ms, now_ms) >= DEBOUNCE_OFF_MS
            && elapsed_ms(self.last_stable_ms, now_ms) >= MIN_PULSE_MS
        {
            self.stable = false;
            self.last_stable_ms = now_ms;
        }

        self.stable
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

/// Latch state: a closed sum type, no sentinel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LatchState {
    Idle,
    Latched {
        /// When the latch engaged.
        since_ms: u32,
    },
}

/// Holds the output active for [`LATCH_DURATION_MS`] once triggered,
/// ignoring the input for the whole hold window.
pub struct Latch {
    state: LatchState,
}

impl Latch {
    pub const fn new() -> Self {
        Self { state: LatchState::Idle }
    }

    /// Feeds the debounced signal; returns `true` while latched.
    pub fn update(&mut self, debounced: bool, now_ms: u32) -> bool {
        match self.state {
            LatchState::Idle => {
                if debounced {
                    self.state = LatchState::Latched { since_ms: now_ms };
                }
            }
            LatchState::Latched { since_ms } => {
                if elapsed_ms(since_ms, now_ms) >= LATCH_DURATION_MS {
                    self.state = LatchState::Idle;
                }
            }
        }
        matches!(self.state, LatchState::Latched { .. })
    }

    pub fn state(&self) -> LatchState {
        self.state
    }
}

impl Default for Latch {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one pipeline evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerDecision {
    /// Threshold gates before debouncing.
    pub raw: bool,
    /// Final latched output; the physical line is active (low) iff set.
    pub output: bool,
    /// One-shot: set on the false-to-true transition of `output`.
    pub rising_edge: bool,
}

/// Full decision pipeline for one configured output.
pub struct TriggerPipeline {
    debouncer: Debouncer,
    latch: Latch,
    last_output: bool,
}

impl TriggerPipeline {
    pub const fn new() -> Self {
        Self {
            debouncer: Debouncer::new(),
            latch: Latch::new(),
            last_output: false,
        }
    }

    /// Evaluates one frame against the active configuration.
    ///
    /// `velocity` is in cm/s, positive = receding; the velocity gate is
    /// bypassed entirely when velocity triggering is disabled.
    pub fn evaluate(
        &mut self,
        distance_cm: u16,
        velocity: f32,
        switch_code: u8,
        config: &TriggerConfig,
        now_ms: u32,
    ) -> TriggerDecision {
        let idx = (switch_code & 0x07) as usize;

        let distance_ok = distance_cm <= config.distance_thresholds[idx];
        let velocity_ok = !config.use_velocity_trigger
            || (velocity >= config.velocity_min[idx] as f32
                && velocity <= config.velocity_max[idx] as f32);

        let raw = distance_ok && velocity_ok;
        let debounced = self.debouncer.update(raw, now_ms);
        let output = self.latch.update(debounced, now_ms);
        let rising_edge = output && !self.last_output;
        self.last_output = output;

        TriggerDecision { raw, output, rising_edge }
    }
}

impl Default for TriggerPipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TriggerConfig;

    #[test]
    fn short_pulse_never_goes_stable() {
        let mut d = Debouncer::new();
        // True for exactly 29 ms, then false: never observed stable-true.
        for t in 0..=29 {
            assert!(!d.update(true, t));
        }
        assert!(!d.update(false, 29));
        assert!(!d.update(false, 100));
    }

    #[test]
    fn on_delay_met_turns_stable() {
        let mut d = Debouncer::new();
        assert!(!d.update(true, 0));
        assert!(!d.update(true, 29));
        assert!(d.update(true, 30));
    }

    #[test]
    fn off_delay_holds_stable_state() {
        let mut d = Debouncer::new();
        d.update(true, 0);
        assert!(d.update(true, 30));
        // Raw drops at t=40; output must hold until 50 ms after the change.
        assert!(d.update(false, 40));
        assert!(d.update(false, 89));
        assert!(!d.update(false, 90));
    }

    #[test]
    fn chatter_resets_off_delay() {
        let mut d = Debouncer::new();
        d.update(true, 0);
        assert!(d.update(true, 30));
        d.update(false, 40);
        // Raw re-asserts briefly; the off countdown restarts from the next
        // falling change.
        d.update(true, 60);
        d.update(false, 70);
        assert!(d.update(false, 119));
        assert!(!d.update(false, 120));
    }

    #[test]
    fn debouncer_survives_timer_wrap() {
        let mut d = Debouncer::new();
        let t0 = u32::MAX - 10;
        d.update(true, t0);
        assert!(!d.update(true, t0.wrapping_add(29)));
        assert!(d.update(true, t0.wrapping_add(30)));
    }

    #[test]
    fn latch_holds_full_duration() {
        let mut latch = Latch::new();
        assert!(latch.update(true, 0));
        // Input is ignored for the whole hold window.
        assert!(latch.update(false, 1));
        assert!(latch.update(false, 1_500));
        assert!(latch.update(false, 2_999));
        // At >= 3000 ms the latch releases regardless of input.
        assert!(!latch.update(false, 3_000));
        assert_eq!(latch.state(), LatchState::Idle);
    }

    #[test]
    fn latch_retriggers_after_release() {
        let mut latch = Latch::new();
        assert!(latch.update(true, 0));
        assert!(!latch.update(false, 3_000));
        assert!(latch.update(true, 3_010));
        assert!(latch.update(false, 6_009));
        assert!(!latch.update(false, 6_010));
    }

    #[test]
    fn latch_idle_ignores_false() {
        let mut latch = Latch::new();
        assert!(!latch.update(false, 0));
        assert_eq!(latch.state(), LatchState::Idle);
    }

    fn test_config() -> TriggerConfig {
        let mut config = TriggerConfig::factory_default();
        config.use_velocity_trigger = false;
        config
    }

    #[test]
    fn distance_gate_uses_switch_position() {
        let mut pipeline = TriggerPipeline::new();
        let config = test_config();
        // Switch 0 threshold is 50 cm; 60 cm must not assert raw.
        let d = pipeline.evaluate(60, 0.0, 0, &config, 0);
        assert!(!d.raw);
        // Switch 1 threshold is 100 cm; the same distance asserts raw.
        let d = pipeline.evaluate(60, 0.0, 1, &config, 1);
        assert!(d.raw);
    }

    #[test]
    fn velocity_gate_bounds_when_enabled() {
        let mut pipeline = TriggerPipeline::new();
        let mut config = TriggerConfig::factory_default();
        config.use_velocity_trigger = true;
        config.velocity_min[0] = -2_200;
        config.velocity_max[0] = -250;

        // Approaching within band.
        assert!(pipeline.evaluate(40, -500.0, 0, &config, 0).raw);
        // Receding: outside the configured (negative) band.
        assert!(!pipeline.evaluate(40, 300.0, 0, &config, 1).raw);
        // Too slow an approach.
        assert!(!pipeline.evaluate(40, -100.0, 0, &config, 2).raw);

        // Disabling the velocity trigger bypasses the gate entirely.
        config.use_velocity_trigger = false;
        assert!(pipeline.evaluate(40, 300.0, 0, &config, 3).raw);
    }

    #[test]
    fn end_to_end_latch_scenario() {
        // Switch position 0, 50 cm threshold, velocity disabled. A target
        // at 45 cm appears at t=0: debounced true at +30 ms, latch engages,
        // output active until +3030 ms, then releases.
        let mut pipeline = TriggerPipeline::new();
        let config = test_config();

        let mut engaged_at = None;
        let mut released_at = None;
        let mut t = 0u32;
        while t <= 3_100 {
            // Target present for the first 40 ms only.
            let (distance, velocity) = if t <= 40 { (45u16, 0.0) } else { (400u16, 0.0) };
            let decision = pipeline.evaluate(distance, velocity, 0, &config, t);
            if decision.rising_edge {
                assert!(engaged_at.is_none(), "latch must engage exactly once");
                engaged_at = Some(t);
            }
            if engaged_at.is_some() && released_at.is_none() && !decision.output {
                released_at = Some(t);
            }
            t += 5;
        }

        assert_eq!(engaged_at, Some(30));
        // Hold is 3000 ms from engagement; the first 5 ms step at or past
        // 3030 releases.
        assert_eq!(released_at, Some(3_030));
    }
}
