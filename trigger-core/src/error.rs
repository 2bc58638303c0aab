//! Error-flag bitmask shared between the acquisition and processing loops.
//!
//! Each flag is independently settable and clearable; transient conditions
//! set a flag without halting either loop, and the owning component clears
//! it once the condition passes.

/// Bitmask of latched error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorFlags(u32);

impl ErrorFlags {
    /// No frame received within the communication timeout.
    pub const COMM_TIMEOUT: Self = Self(0x01);
    /// Frame queue full, frames being dropped.
    pub const BUFFER_OVERFLOW: Self = Self(0x02);
    /// Sensor bring-up did not complete.
    pub const SENSOR_INIT_FAILED: Self = Self(0x04);
    /// Frame queue above the warning fill threshold.
    pub const BUFFER_WARNING: Self = Self(0x08);
    /// Frame queue above the critical fill threshold.
    pub const BUFFER_CRITICAL: Self = Self(0x10);
    /// Checksum mismatch or out-of-range frame data.
    pub const FRAME_CORRUPTION: Self = Self(0x20);
    /// Velocity estimator repeatedly failed to find usable sample pairs.
    pub const VELOCITY_CALC_ERROR: Self = Self(0x40);
    /// Configuration failed checksum or range validation.
    pub const CONFIG_ERROR: Self = Self(0x80);

    /// All flags clear.
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn set(&mut self, flag: Self) {
        self.0 |= flag.0;
    }

    pub fn clear(&mut self, flag: Self) {
        self.0 &= !flag.0;
    }

    /// Sets or clears `flag` depending on `active`.
    pub fn apply(&mut self, flag: Self, active: bool) {
        if active {
            self.set(flag);
        } else {
            self.clear(flag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_independent() {
        let mut flags = ErrorFlags::empty();
        flags.set(ErrorFlags::COMM_TIMEOUT);
        flags.set(ErrorFlags::BUFFER_CRITICAL);
        assert!(flags.contains(ErrorFlags::COMM_TIMEOUT));
        assert!(flags.contains(ErrorFlags::BUFFER_CRITICAL));
        assert!(!flags.contains(ErrorFlags::CONFIG_ERROR));

        flags.clear(ErrorFlags::COMM_TIMEOUT);
        assert!(!flags.contains(ErrorFlags::COMM_TIMEOUT));
        assert!(flags.contains(ErrorFlags::BUFFER_CRITICAL));
    }

    #[test]
    fn apply_sets_and_clears() {
        let mut flags = ErrorFlags::empty();
        flags.apply(ErrorFlags::FRAME_CORRUPTION, true);
        assert!(!flags.is_empty());
        flags.apply(ErrorFlags::FRAME_CORRUPTION, false);
        assert!(flags.is_empty());
    }
}
