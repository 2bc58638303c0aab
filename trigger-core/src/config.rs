//! Trigger configuration: per-position thresholds, persistence format,
//! validation.
//!
//! The configuration is stored in flash as a fixed-layout little-endian
//! record sealed with an additive checksum. A record that fails the
//! checksum or the range validation is discarded in favor of the factory
//! defaults; it is never partially applied.

use crate::framing::{MAX_DISTANCE_CM, MIN_DISTANCE_CM};

/// Serialized size of [`TriggerConfig`] in flash.
pub const SERIALIZED_LEN: usize = 52;

/// A configuration field that failed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Distance threshold outside the sensor's usable range.
    DistanceOutOfRange { index: usize, value: u16 },
    /// Velocity band with min above max.
    VelocityRangeInverted { index: usize },
}

/// Active trigger configuration, one slot per 3-bit switch position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TriggerConfig {
    /// Distance threshold per switch position, in centimeters.
    pub distance_thresholds: [u16; 8],
    /// Lower velocity bound per position, cm/s (positive = receding).
    pub velocity_min: [i16; 8],
    /// Upper velocity bound per position, cm/s.
    pub velocity_max: [i16; 8],
    /// When false the velocity gate is bypassed entirely.
    pub use_velocity_trigger: bool,
    /// Enables the periodic processing debug report.
    pub enable_debug: bool,
    /// Additive checksum over the serialized payload; 0 until sealed.
    pub checksum: u16,
}

impl TriggerConfig {
    /// Factory defaults: thresholds 50..700 cm in coarse steps, a wide
    /// approach-only velocity band, velocity gating on, debug off.
    pub const fn factory_default() -> Self {
        Self {
            distance_thresholds: [50, 100, 200, 300, 400, 500, 600, 700],
            velocity_min: [-2_200; 8],
            velocity_max: [-250; 8],
            use_velocity_trigger: true,
            enable_debug: false,
            checksum: 0,
        }
    }

    /// Serializes to the fixed flash layout. The checksum field is written
    /// as-is; call [`seal`](Self::seal) first when persisting.
    pub fn to_bytes(&self) -> [u8; SERIALIZED_LEN] {
        let mut buf = [0u8; SERIALIZED_LEN];
        let mut pos = 0;
        for v in self.distance_thresholds {
            buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
            pos += 2;
        }
        for v in self.velocity_min {
            buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
            pos += 2;
        }
        for v in self.velocity_max {
            buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
            pos += 2;
        }
        buf[pos] = self.use_velocity_trigger as u8;
        buf[pos + 1] = self.enable_debug as u8;
        buf[pos + 2..pos + 4].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    /// Deserializes from the fixed flash layout. Returns `None` on a short
    /// buffer; checksum and range validation are separate steps.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < SERIALIZED_LEN {
            return None;
        }
        let mut config = Self::factory_default();
        let mut pos = 0;
        for v in config.distance_thresholds.iter_mut() {
            *v = u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            pos += 2;
        }
        for v in config.velocity_min.iter_mut() {
            *v = i16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            pos += 2;
        }
        for v in config.velocity_max.iter_mut() {
            *v = i16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
            pos += 2;
        }
        config.use_velocity_trigger = bytes[pos] != 0;
        config.enable_debug = bytes[pos + 1] != 0;
        config.checksum = u16::from_le_bytes([bytes[pos + 2], bytes[pos + 3]]);
        Some(config)
    }

    /// Additive checksum over the payload bytes (everything before the
    /// checksum field itself), wrapping at u16.
    pub fn compute_checksum(&self) -> u16 {
        let bytes = self.to_bytes();
        let mut sum = 0u16;
        for &b in &bytes[..SERIALIZED_LEN - 2] {
            sum = sum.wrapping_add(b as u16);
        }
        sum
    }

    /// Stamps the current payload checksum into the record.
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    pub fn checksum_ok(&self) -> bool {
        self.checksum == self.compute_checksum()
    }

    /// Range validation: every threshold within the sensor's usable span
    /// and every velocity band ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, &value) in self.distance_thresholds.iter().enumerate() {
            if value < MIN_DISTANCE_CM || value > MAX_DISTANCE_CM {
                return Err(ConfigError::DistanceOutOfRange { index, value });
            }
        }
        for index in 0..8 {
            if self.velocity_min[index] > self.velocity_max[index] {
                return Err(ConfigError::VelocityRangeInverted { index });
            }
        }
        Ok(())
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self::factory_default()
    }
}

/// Operator-tunable runtime parameters, adjustable without reflashing and
/// not persisted with the trigger configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RuntimeTuning {
    /// Minimum signal strength for a frame to be accepted.
    pub min_strength: u16,
    /// Minimum delay between recovery attempts.
    pub recovery_delay_ms: u32,
    /// Idle timeout after which a configuration session ends.
    pub config_mode_timeout_ms: u32,
}

impl RuntimeTuning {
    pub const fn factory_default() -> Self {
        Self {
            min_strength: 200,
            recovery_delay_ms: 5_000,
            config_mode_timeout_ms: 15_000,
        }
    }
}

impl Default for RuntimeTuning {
    fn default() -> Self {
        Self::factory_default()
    }
}
