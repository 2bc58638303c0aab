//! Active configuration cell and its accessor surface.
//!
//! The configuration tool mutates the active configuration exclusively
//! through the setters here. Every setter validates the whole candidate
//! configuration before adopting it; a mutation that would leave the
//! configuration invalid is refused and the previous values stay active.
//! The processing loop takes a copy per pass, so a frame is always
//! evaluated against one consistent configuration.

use core::cell::RefCell;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use trigger_core::{ConfigError, RuntimeTuning, TriggerConfig};

static ACTIVE_CONFIG: Mutex<CriticalSectionRawMutex, RefCell<TriggerConfig>> =
    Mutex::new(RefCell::new(TriggerConfig::factory_default()));

static RUNTIME_TUNING: Mutex<CriticalSectionRawMutex, RefCell<RuntimeTuning>> =
    Mutex::new(RefCell::new(RuntimeTuning::factory_default()));

/// Copy of the active configuration.
pub fn snapshot() -> TriggerConfig {
    ACTIVE_CONFIG.lock(|c| *c.borrow())
}

/// Replaces the active configuration wholesale. Callers (the flash load
/// path) must have validated `config` already.
pub fn adopt(config: TriggerConfig) {
    ACTIVE_CONFIG.lock(|c| *c.borrow_mut() = config);
}

/// Copy of the runtime tuning parameters.
pub fn tuning() -> RuntimeTuning {
    RUNTIME_TUNING.lock(|t| *t.borrow())
}

fn try_update(mutate: impl FnOnce(&mut TriggerConfig)) -> Result<(), ConfigError> {
    ACTIVE_CONFIG.lock(|cell| {
        let mut candidate = *cell.borrow();
        mutate(&mut candidate);
        candidate.validate()?;
        *cell.borrow_mut() = candidate;
        Ok(())
    })
}

pub fn distance_threshold(index: usize) -> u16 {
    snapshot().distance_thresholds[index & 0x07]
}

pub fn set_distance_threshold(index: usize, value: u16) -> Result<(), ConfigError> {
    try_update(|c| c.distance_thresholds[index & 0x07] = value)
}

pub fn velocity_bounds(index: usize) -> (i16, i16) {
    let config = snapshot();
    (config.velocity_min[index & 0x07], config.velocity_max[index & 0x07])
}

pub fn set_velocity_bounds(index: usize, min: i16, max: i16) -> Result<(), ConfigError> {
    try_update(|c| {
        c.velocity_min[index & 0x07] = min;
        c.velocity_max[index & 0x07] = max;
    })
}

pub fn velocity_trigger_enabled() -> bool {
    snapshot().use_velocity_trigger
}

pub fn set_velocity_trigger_enabled(enabled: bool) -> Result<(), ConfigError> {
    try_update(|c| c.use_velocity_trigger = enabled)
}

pub fn debug_enabled() -> bool {
    snapshot().enable_debug
}

pub fn set_debug_enabled(enabled: bool) -> Result<(), ConfigError> {
    try_update(|c| c.enable_debug = enabled)
}

pub fn set_min_strength(value: u16) {
    RUNTIME_TUNING.lock(|t| t.borrow_mut().min_strength = value);
}

pub fn set_recovery_delay_ms(value: u32) {
    RUNTIME_TUNING.lock(|t| t.borrow_mut().recovery_delay_ms = value);
}

pub fn set_config_mode_timeout_ms(value: u32) {
    RUNTIME_TUNING.lock(|t| t.borrow_mut().config_mode_timeout_ms = value);
}
