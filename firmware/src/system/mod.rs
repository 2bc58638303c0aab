//! Shared system infrastructure: hardware resource allocation, shared
//! status, the inter-core frame queue, the active configuration cell and
//! the status event channel.

pub mod clock;
pub mod config_store;
pub mod event;
pub mod queue;
pub mod resources;
pub mod status;
