//! Task implementations, one module per concern.

pub mod acquire;
pub mod config_session;
pub mod flash_config;
pub mod process;
pub mod status_led;
pub mod switch_monitor;
