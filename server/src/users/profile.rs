use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Claims;
use crate::db::{self, models::User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::{self, store::ProfileField, MAX_FULL_NAME_LEN};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFullNameRequest {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckUsernameQuery {
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UsernameAvailability {
    pub available: bool,
}

/// PUT /api/auth/update-profile
/// Stores the picture reference as given; uploading to external storage is the client's job.
pub async fn update_profile(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<User>> {
    let profile_pic = req
        .profile_pic
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| ApiError::bad_request("Profile pic is required"))?;

    let user = db::with_conn(&state.db, move |conn| {
        users::store::update_field(conn, &claims.sub, ProfileField::ProfilePic, &profile_pic)
    })
    .await?;

    tracing::info!(user_id = %user.id, "Profile picture updated");
    Ok(Json(user))
}

/// PUT /api/auth/update-username
pub async fn update_username(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateUsernameRequest>,
) -> ApiResult<Json<User>> {
    let username = req
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("Username is required"))?;

    if !users::is_valid_username(&username) {
        return Err(ApiError::bad_request(
            "Username must be 3-30 characters, start with a letter, and contain only letters, numbers or underscores",
        ));
    }

    let user = db::with_conn(&state.db, move |conn| {
        if users::store::username_taken(conn, &username, Some(&claims.sub))? {
            return Err(ApiError::bad_request("Username already taken"));
        }
        users::store::update_field(conn, &claims.sub, ProfileField::Username, &username)
    })
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "Username updated");
    Ok(Json(user))
}

/// PUT /api/auth/update-fullname
pub async fn update_full_name(
    State(state): State<AppState>,
    claims: Claims,
    Json(req): Json<UpdateFullNameRequest>,
) -> ApiResult<Json<User>> {
    let full_name = req
        .full_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::bad_request("Full name is required"))?;

    if full_name.chars().count() > MAX_FULL_NAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Full name must be at most {} characters",
            MAX_FULL_NAME_LEN
        )));
    }

    let user = db::with_conn(&state.db, move |conn| {
        users::store::update_field(conn, &claims.sub, ProfileField::FullName, &full_name)
    })
    .await?;

    Ok(Json(user))
}

/// GET /api/auth/check-username?username=
/// The caller's own current username counts as available.
pub async fn check_username(
    State(state): State<AppState>,
    claims: Claims,
    Query(query): Query<CheckUsernameQuery>,
) -> ApiResult<Json<UsernameAvailability>> {
    let username = query.username.unwrap_or_default().trim().to_string();
    if !users::is_valid_username(&username) {
        return Ok(Json(UsernameAvailability { available: false }));
    }

    let taken = db::with_conn(&state.db, move |conn| {
        Ok(users::store::username_taken(conn, &username, Some(&claims.sub))?)
    })
    .await?;

    Ok(Json(UsernameAvailability { available: !taken }))
}
