//! Server-to-client event frames.
//!
//! Every frame is a JSON text message of the form `{"event": <name>, "data": <payload>}`.
//! Clients send nothing meaningful over the socket; all requests go through HTTP.

use axum::extract::ws::Message as WsMessage;
use serde::{Deserialize, Serialize};

use crate::db::models::Message;

pub const EVENT_ONLINE_USERS: &str = "getOnlineUsers";
pub const EVENT_NEW_MESSAGE: &str = "newMessage";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full set of registered user ids, sent to every open connection on membership change.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<String>),
    /// A freshly persisted message, sent only to the receiver's connection.
    #[serde(rename = "newMessage")]
    NewMessage(Message),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::OnlineUsers(_) => EVENT_ONLINE_USERS,
            Self::NewMessage(_) => EVENT_NEW_MESSAGE,
        }
    }

    /// Encode as a WebSocket text frame. Returns None if serialization fails.
    pub fn to_ws_message(&self) -> Option<WsMessage> {
        match serde_json::to_string(self) {
            Ok(json) => Some(WsMessage::Text(json.into())),
            Err(e) => {
                tracing::warn!(event = self.name(), error = %e, "Failed to encode event");
                None
            }
        }
    }
}
