use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::middleware::Claims;
use crate::db::{
    self,
    models::{FriendRequest, RequestStatus},
};
use crate::error::{ApiError, ApiResult};
use crate::friends::store;
use crate::state::AppState;
use crate::users;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequestBody {
    #[serde(default)]
    pub receiver_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondBody {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

/// POST /api/friends/request
pub async fn send_request(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<SendRequestBody>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let receiver_id = body
        .receiver_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::bad_request("Receiver ID is required"))?;

    if receiver_id == claims.sub {
        return Err(ApiError::bad_request("Cannot send friend request to yourself"));
    }

    let sender_id = claims.sub;
    let (sender, receiver) = (sender_id.clone(), receiver_id.clone());
    db::with_conn(&state.db, move |conn| {
        users::store::require(conn, &receiver)?;
        if store::are_friends(conn, &sender, &receiver)? {
            return Err(ApiError::bad_request("Already friends"));
        }
        if store::request_exists_between(conn, &sender, &receiver)? {
            return Err(ApiError::bad_request("Friend request already exists"));
        }
        store::insert_request(conn, &sender, &receiver)?;
        Ok(())
    })
    .await?;

    tracing::info!(sender_id = %sender_id, receiver_id = %receiver_id, "Friend request sent");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Friend request sent successfully" })),
    ))
}

/// GET /api/friends/requests
pub async fn list_requests(
    State(state): State<AppState>,
    claims: Claims,
) -> ApiResult<Json<Vec<FriendRequest>>> {
    let requests = db::with_conn(&state.db, move |conn| {
        Ok(store::pending_for(conn, &claims.sub)?)
    })
    .await?;
    Ok(Json(requests))
}

/// POST /api/friends/respond
pub async fn respond(
    State(state): State<AppState>,
    claims: Claims,
    Json(body): Json<RespondBody>,
) -> ApiResult<Json<Value>> {
    let (Some(request_id), Some(action)) = (
        body.request_id.filter(|id| !id.is_empty()),
        body.action.filter(|a| !a.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Request ID and action are required"));
    };

    let status = match action.as_str() {
        "accept" => RequestStatus::Accepted,
        "decline" => RequestStatus::Declined,
        _ => return Err(ApiError::bad_request("Invalid action")),
    };

    let receiver_id = claims.sub;
    let request = request_id.clone();
    let receiver = receiver_id.clone();
    db::with_conn(&state.db, move |conn| {
        let sender = store::find_pending_sender(conn, &request, &receiver)?
            .ok_or_else(|| ApiError::not_found("Friend request not found"))?;
        store::resolve_request(conn, &request, &sender, &receiver, status)?;
        Ok(())
    })
    .await?;

    tracing::info!(
        request_id = %request_id,
        user_id = %receiver_id,
        status = status.as_str(),
        "Friend request resolved"
    );
    Ok(Json(json!({
        "message": format!("Friend request {} successfully", status.as_str())
    })))
}
