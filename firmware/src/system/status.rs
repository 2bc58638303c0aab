//! Shared system status.
//!
//! One mutex-protected struct holds everything both cores and the
//! ancillary tasks need to observe: lifecycle flags, the active switch
//! code, the error bitmask, stream counters and the latest readings.
//! Locks are held only to copy data in or out, never across I/O.

use defmt::Format;
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use trigger_core::ErrorFlags;

/// Global system status protected by a mutex
pub static STATUS: Mutex<CriticalSectionRawMutex, SharedStatus> = Mutex::new(SharedStatus::INIT);

/// Snapshot of everything the system knows about itself
#[derive(Format)]
pub struct SharedStatus {
    /// Sensor bring-up completed
    pub sensor_initialized: bool,
    /// Processing loop is ready to consume frames
    pub processing_ready: bool,
    /// Mirror of the active configuration's debug flag
    pub debug_enabled: bool,
    /// Trigger output line currently active
    pub trigger_output: bool,
    /// Configuration session active; frame processing suspended
    pub config_mode_active: bool,
    /// Active selector position (0-7)
    pub switch_code: u8,
    /// Latched error conditions
    pub error_flags: ErrorFlags,
    /// Valid frames pushed by the acquisition loop
    pub frames_received: u32,
    /// Frames consumed by the processing loop
    pub frames_processed: u32,
    /// Frames lost to a full queue
    pub dropped_frames: u32,
    /// Recovery ladder actions taken
    pub recovery_attempts: u32,
    /// Millisecond timestamp of the last good frame
    pub last_frame_ms: u32,
    /// Latest filtered velocity in cm/s (positive = receding)
    pub velocity: f32,
    /// Latest measured distance in centimeters
    pub distance_cm: u16,
    /// Latest signal strength
    pub strength: u16,
}

impl SharedStatus {
    pub const INIT: Self = Self {
        sensor_initialized: false,
        processing_ready: false,
        debug_enabled: false,
        trigger_output: false,
        config_mode_active: false,
        switch_code: 0,
        error_flags: ErrorFlags::empty(),
        frames_received: 0,
        frames_processed: 0,
        dropped_frames: 0,
        recovery_attempts: 0,
        last_frame_ms: 0,
        velocity: 0.0,
        distance_cm: 0,
        strength: 0,
    };
}

/// Sets one error flag
pub async fn set_error(flag: ErrorFlags) {
    STATUS.lock().await.error_flags.set(flag);
}

/// Clears one error flag
pub async fn clear_error(flag: ErrorFlags) {
    STATUS.lock().await.error_flags.clear(flag);
}

/// Sets or clears one error flag depending on `active`
pub async fn apply_error(flag: ErrorFlags, active: bool) {
    STATUS.lock().await.error_flags.apply(flag, active);
}

/// True while a configuration session suspends frame processing
pub async fn config_mode_active() -> bool {
    STATUS.lock().await.config_mode_active
}
