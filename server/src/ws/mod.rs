pub mod actor;
pub mod handler;
pub mod protocol;

use tokio::sync::mpsc;

/// Type alias for the sender half of a WebSocket connection's channel.
/// The presence service keeps a clone of it to push frames to that client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
