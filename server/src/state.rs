use std::sync::Arc;
use std::time::Duration;

use crate::db::DbPool;
use crate::presence::PresenceService;

/// Session and password settings taken from the config at startup.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// Lifetime of a session token and its cookie.
    pub session_ttl_days: i64,
    /// Add `Secure` to the session cookie.
    pub secure_cookies: bool,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
}

/// WebSocket liveness checks: ping every `ping_interval`, drop the
/// connection if the pong takes longer than `pong_timeout`.
#[derive(Debug, Clone)]
pub struct KeepaliveSettings {
    pub ping_interval: Duration,
    pub pong_timeout: Duration,
}

impl Default for KeepaliveSettings {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(10),
        }
    }
}

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    /// Who is online and how to reach them
    pub presence: Arc<PresenceService>,
    pub auth: AuthSettings,
    pub keepalive: KeepaliveSettings,
}
