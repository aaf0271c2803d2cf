use axum::{extract::State, Json};
use serde::Serialize;

use crate::auth::middleware::Claims;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersResponse {
    pub online_users: Vec<String>,
}

/// GET /api/presence — snapshot of currently registered user ids. JWT auth required.
pub async fn get_online_users(
    State(state): State<AppState>,
    _claims: Claims,
) -> Json<OnlineUsersResponse> {
    Json(OnlineUsersResponse {
        online_users: state.presence.online_users(),
    })
}
