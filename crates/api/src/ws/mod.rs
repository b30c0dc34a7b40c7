//! WebSocket progress streaming.
//!
//! Provides the upgrade handler for campaign streams and the heartbeat that
//! keeps idle observer connections alive.

mod handler;
mod heartbeat;

pub use handler::stream_campaign;
pub use heartbeat::{start_heartbeat, HEARTBEAT_INTERVAL};
