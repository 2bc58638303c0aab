//! Adaptive median-filtered velocity estimation.
//!
//! The estimator keeps the 15 most recent frames newest-first and derives
//! velocity from distance/time deltas between the newest frame and frames
//! at even offsets. The median of the accepted samples (not the mean)
//! rejects any single outlier reading. A majority of sub-deadband distance
//! deltas snaps the result to exactly zero so a stationary target never
//! jitters around 0, and a pass with no usable pairs holds the last known
//! velocity instead of flickering trigger eligibility.
//!
//! Sign convention (pinned contract): **positive velocity = target
//! receding** (distance increasing away from the sensor). The factory
//! velocity thresholds are negative because they describe an approaching
//! target.

use crate::frame::SensorFrame;
use crate::time::elapsed_us;

/// History ring capacity, newest-first.
pub const HISTORY_LEN: usize = 15;
/// Minimum history entries before any estimate is attempted.
pub const MIN_HISTORY: usize = 5;
/// Maximum velocity samples folded into one estimate.
pub const MAX_SAMPLES: usize = 5;
/// Sample pairs closer in time than this are too noisy to divide by.
pub const PAIR_MIN_DT_US: u32 = 1_000;
/// Sample pairs further apart than this are stale.
pub const PAIR_MAX_DT_US: u32 = 50_000;
/// Consecutive empty passes tolerated before the error flag is raised.
pub const ERROR_LIMIT: u32 = 10;

/// Default distance deadband: deltas at or below this are "small movement".
pub const DISTANCE_DEADBAND_CM: i32 = 1;
/// Default velocity deadband: medians at or below this snap to zero.
pub const VELOCITY_DEADBAND_CM_S: f32 = 1.0;

/// Velocity estimator over a bounded frame history.
pub struct VelocityEstimator {
    history: [SensorFrame; HISTORY_LEN],
    count: usize,
    last_velocity: f32,
    error_count: u32,
    /// Distance deltas at or below this magnitude count as small movement.
    pub distance_deadband_cm: i32,
    /// Final medians at or below this magnitude snap to exactly zero.
    pub velocity_deadband_cm_s: f32,
}

impl VelocityEstimator {
    pub const fn new() -> Self {
        Self {
            history: [SensorFrame::EMPTY; HISTORY_LEN],
            count: 0,
            last_velocity: 0.0,
            error_count: 0,
            distance_deadband_cm: DISTANCE_DEADBAND_CM,
            velocity_deadband_cm_s: VELOCITY_DEADBAND_CM_S,
        }
    }

    /// Inserts `frame` at index 0, evicting the oldest entry at capacity.
    /// O(history length), acceptable at the target frame rates.
    pub fn add_frame(&mut self, frame: SensorFrame) {
        let mut i = HISTORY_LEN - 1;
        while i > 0 {
            self.history[i] = self.history[i - 1];
            i -= 1;
        }
        self.history[0] = frame;
        if self.count < HISTORY_LEN {
            self.count += 1;
        }
    }

    /// Current filtered velocity in cm/s (positive = receding).
    pub fn calculate(&mut self) -> f32 {
        if self.count < MIN_HISTORY {
            return 0.0;
        }

        let mut samples = [0.0f32; MAX_SAMPLES];
        let mut accepted = 0usize;
        let mut small_movements = 0usize;

        // Stride 2 keeps sample pairs far enough apart in time to divide
        // by, while still spanning only the recent past.
        let mut i = 2;
        while i < self.count && accepted < MAX_SAMPLES {
            let dt_us = elapsed_us(self.history[i].timestamp_us, self.history[0].timestamp_us);
            if dt_us > PAIR_MIN_DT_US && dt_us < PAIR_MAX_DT_US {
                let dist_diff =
                    self.history[0].distance_cm as i32 - self.history[i].distance_cm as i32;
                if dist_diff.abs() <= self.distance_deadband_cm {
                    small_movements += 1;
                }
                samples[accepted] = dist_diff as f32 * 1_000_000.0 / dt_us as f32;
                accepted += 1;
            }
            i += 2;
        }

        if accepted == 0 {
            // Hold the last known velocity rather than flickering the
            // trigger eligibility on a transient gap.
            self.error_count += 1;
            return self.last_velocity;
        }

        if small_movements >= accepted / 2 + 1 {
            // Mostly sub-deadband deltas: the target is stationary.
            self.last_velocity = 0.0;
            self.error_count = 0;
            return 0.0;
        }

        let mut median = median_of(&mut samples[..accepted]);
        if libm::fabsf(median) <= self.velocity_deadband_cm_s {
            median = 0.0;
        }

        self.last_velocity = median;
        self.error_count = 0;
        median
    }

    /// True once the estimator has gone more than [`ERROR_LIMIT`]
    /// consecutive passes without a usable sample pair.
    pub fn degraded(&self) -> bool {
        self.error_count > ERROR_LIMIT
    }

    pub fn last_velocity(&self) -> f32 {
        self.last_velocity
    }
}

impl Default for VelocityEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Median by full selection sort; fine at <= 5 elements.
fn median_of(samples: &mut [f32]) -> f32 {
    let n = samples.len();
    if n == 1 {
        return samples[0];
    }
    for i in 0..n - 1 {
        for j in i + 1..n {
            if samples[i] > samples[j] {
                samples.swap(i, j);
            }
        }
    }
    samples[n / 2]
}
