//! Status events for the visualization boundary.
//!
//! Multi-producer, single-consumer channel; the status LED task is the
//! consumer. Per-frame readings are sent best-effort so a slow consumer
//! never backpressures the processing loop.

use defmt::Format;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

/// Status event channel with capacity of 16
pub static STATUS_EVENTS: Channel<CriticalSectionRawMutex, StatusEvent, 16> = Channel::new();

/// Sends an event, waiting for channel space. Use for one-shots that must
/// not be lost (mode changes, trigger edges).
pub async fn send(event: StatusEvent) {
    STATUS_EVENTS.sender().send(event).await;
}

/// Sends an event best-effort; dropped when the channel is full. Use for
/// the high-rate reading stream.
pub fn try_send(event: StatusEvent) {
    let _ = STATUS_EVENTS.sender().try_send(event);
}

/// Receives the next status event
pub async fn wait() -> StatusEvent {
    STATUS_EVENTS.receiver().receive().await
}

/// Top-level system mode as shown on the status LED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum SystemMode {
    /// Sensor bring-up and configuration load in progress
    Init,
    /// Normal frame processing
    Running,
    /// Configuration session active, frame processing suspended
    Config,
}

/// Events published towards the visualization boundary
#[derive(Debug, Clone, Copy, Format)]
pub enum StatusEvent {
    /// System mode changed
    ModeChanged(SystemMode),
    /// Trigger output went active
    TriggerEdge,
    /// Latest processed reading
    Reading {
        distance_cm: u16,
        velocity: f32,
        strength: u16,
    },
    /// Processing idle (config mode), no readings flowing
    Idle,
}
