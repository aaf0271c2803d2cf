//! Message endpoints. Sending persists first, then hands the stored record to
//! the presence service for live delivery. Delivery is best-effort and never
//! changes the response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::Claims;
use crate::db::{
    self,
    models::{Message, User},
};
use crate::error::{ApiError, ApiResult};
use crate::friends;
use crate::messages::store;
use crate::state::AppState;
use crate::users;
use crate::ws::protocol::ServerEvent;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// GET /api/messages/users
/// Sidebar contacts: the caller's friends.
pub async fn get_users_for_sidebar(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<Json<Vec<User>>> {
    let users = db::with_conn(&state.db, move |conn| {
        Ok(friends::store::friends_of(conn, &claims.sub)?)
    })
    .await?;
    Ok(Json(users))
}

/// GET /api/messages/{id}
pub async fn get_messages(
    State(state): State<AppState>,
    claims: Claims,
    Path(other_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = db::with_conn(&state.db, move |conn| {
        Ok(store::conversation(conn, &claims.sub, &other_id)?)
    })
    .await?;
    Ok(Json(messages))
}

/// POST /api/messages/send/{id}
pub async fn send_message(
    State(state): State<AppState>,
    claims: Claims,
    Path(receiver_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let text = req.text.filter(|t| !t.trim().is_empty());
    let image = req.image.filter(|i| !i.trim().is_empty());
    if text.is_none() && image.is_none() {
        return Err(ApiError::bad_request("Message must contain text or an image"));
    }

    let sender_id = claims.sub;
    let message = db::with_conn(&state.db, move |conn| {
        users::store::require(conn, &receiver_id)?;
        Ok(store::insert(conn, &sender_id, &receiver_id, text, image)?)
    })
    .await?;

    let delivered = state
        .presence
        .deliver(&message.receiver_id, &ServerEvent::NewMessage(message.clone()));
    tracing::debug!(
        message_id = %message.id,
        receiver_id = %message.receiver_id,
        delivered,
        "Message stored"
    );

    Ok((StatusCode::CREATED, Json(message)))
}
