//! Core signal pipeline for a LiDAR distance/speed trigger controller.
//!
//! Everything in this crate is hardware-independent: components take
//! timestamps as plain `u32` microsecond/millisecond counters and perform
//! no I/O, so the firmware can drive them from the MCU timer while tests
//! drive them from synthetic clocks.
//!
//! Pipeline order, as wired by the firmware:
//!
//! ```text
//! UART bytes -> FrameParser -> SensorFrame -> FrameQueue -> VelocityEstimator
//!                                                        -> TriggerPipeline -> output pin
//! ```
//!
//! All elapsed-time arithmetic is wraparound-safe because the 32-bit
//! counters roll over well within the controller's continuous runtime.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod frame;
pub mod framing;
pub mod recovery;
pub mod time;
pub mod trigger;
pub mod velocity;

pub use config::{ConfigError, RuntimeTuning, TriggerConfig};
pub use error::ErrorFlags;
pub use frame::{FillLevel, FrameQueue, SensorFrame};
pub use framing::{FeedOutcome, FrameParser, RawMeasurement};
pub use recovery::{RecoveryAction, RecoveryLadder};
pub use trigger::{Debouncer, Latch, TriggerDecision, TriggerPipeline};
pub use velocity::VelocityEstimator;
