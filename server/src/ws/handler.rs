use axum::{
    extract::{rejection::QueryRejection, ws::WebSocketUpgrade, Query, State},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use crate::auth::jwt;
use crate::state::AppState;
use crate::ws::actor;

/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also arrive as `?token=`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /ws
///
/// Always upgrades. A valid session (cookie, Bearer header or `token` query)
/// makes the connection count as that user's presence; anything else, an
/// unparsable query string included, yields an anonymous connection that only
/// receives broadcasts.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    query: Result<Query<WsQuery>, QueryRejection>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let query_token = match query {
        Ok(Query(params)) => params.token.filter(|t| !t.is_empty()),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Ignoring unparsable WebSocket query");
            None
        }
    };
    let token = jwt::token_from_headers(&headers).or(query_token);

    let user_id = token.and_then(|token| {
        match jwt::validate_session_token(&state.jwt_secret, &token) {
            Ok(claims) => Some(claims.sub),
            Err(err) => {
                tracing::debug!(error = %err, "WebSocket token rejected, connecting anonymously");
                None
            }
        }
    });

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, user_id))
}
