//! Presence registry and fan-out channel.
//!
//! Tracks which users have an open WebSocket connection (at most one per user,
//! newest wins), broadcasts the online-user set to every open connection when
//! membership changes, and routes targeted events to a single user's connection.
//!
//! Delivery is best-effort: an event for a user without a registered
//! connection is dropped. Nothing here reports errors to callers.

pub mod handlers;

use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::ws::protocol::ServerEvent;
use crate::ws::ConnectionSender;

/// Opaque identifier of one open real-time connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An open connection as seen by the registry. The transport owns the socket;
/// we only hold the outbound sender and the identity established at handshake.
struct OpenConnection {
    user_id: Option<String>,
    sender: ConnectionSender,
}

/// Process-wide presence state. Construct once at startup and share via `Arc`.
#[derive(Default)]
pub struct PresenceService {
    /// Every open connection, anonymous ones included (broadcast targets).
    connections: DashMap<ConnectionId, OpenConnection>,
    /// user id -> current connection. Mutations and the broadcast they trigger
    /// happen under this lock so broadcasts go out in mutation order.
    online: Mutex<HashMap<String, ConnectionId>>,
}

impl PresenceService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a newly opened connection.
    ///
    /// An absent or empty `user_id` leaves the connection anonymous: it still
    /// receives broadcasts but is never registered. A user who already has a
    /// connection is silently re-pointed at the new one.
    pub fn on_connect(&self, user_id: Option<&str>, id: ConnectionId, sender: ConnectionSender) {
        let user_id = user_id.filter(|u| !u.is_empty()).map(str::to_string);
        let mut online = self.lock_online();

        self.connections.insert(
            id,
            OpenConnection {
                user_id: user_id.clone(),
                sender,
            },
        );

        match &user_id {
            Some(user) => {
                if let Some(previous) = online.insert(user.clone(), id) {
                    tracing::debug!(
                        user_id = %user,
                        previous = %previous,
                        connection_id = %id,
                        "Replaced presence mapping"
                    );
                }
                tracing::info!(user_id = %user, connection_id = %id, "User online");
            }
            None => {
                tracing::debug!(connection_id = %id, "Anonymous connection opened");
            }
        }

        self.broadcast_online(&online);
    }

    /// Forget a closed connection. Unknown ids are ignored.
    ///
    /// The user's entry is removed only if it still points at this connection;
    /// a newer connection for the same user keeps the user online.
    pub fn on_disconnect(&self, id: ConnectionId) {
        let mut online = self.lock_online();

        let Some((_, closed)) = self.connections.remove(&id) else {
            return;
        };

        if let Some(user) = closed.user_id {
            if online.get(&user) == Some(&id) {
                online.remove(&user);
                tracing::info!(user_id = %user, connection_id = %id, "User offline");
            } else {
                tracing::debug!(
                    user_id = %user,
                    connection_id = %id,
                    "Closed connection was already superseded"
                );
            }
        }

        self.broadcast_online(&online);
    }

    /// Current connection registered for `user_id`, if any.
    pub fn lookup(&self, user_id: &str) -> Option<ConnectionId> {
        self.lock_online().get(user_id).copied()
    }

    /// Snapshot of registered user ids, sorted.
    pub fn online_users(&self) -> Vec<String> {
        sorted_keys(&self.lock_online())
    }

    /// Number of open connections, anonymous ones included.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Send `event` to the registered connection of `user_id`.
    /// Returns whether a connection accepted the frame; a miss is not an error.
    pub fn deliver(&self, user_id: &str, event: &ServerEvent) -> bool {
        let Some(id) = self.lookup(user_id) else {
            tracing::debug!(user_id = %user_id, event = event.name(), "Recipient offline, event dropped");
            return false;
        };
        let Some(msg) = event.to_ws_message() else {
            return false;
        };
        match self.connections.get(&id) {
            Some(conn) => conn.sender.send(msg).is_ok(),
            None => false,
        }
    }

    fn broadcast_online(&self, online: &HashMap<String, ConnectionId>) {
        let event = ServerEvent::OnlineUsers(sorted_keys(online));
        let Some(msg) = event.to_ws_message() else {
            return;
        };
        for conn in self.connections.iter() {
            // A closed receiver means that connection is on its way out.
            let _ = conn.value().sender.send(msg.clone());
        }
    }

    fn lock_online(&self) -> MutexGuard<'_, HashMap<String, ConnectionId>> {
        self.online.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sorted_keys(online: &HashMap<String, ConnectionId>) -> Vec<String> {
    let mut users: Vec<String> = online.keys().cloned().collect();
    users.sort();
    users
}
