//! Account endpoints: signup, login, logout and session check.
//!
//! Successful signup/login install the session JWT as an HttpOnly cookie and
//! also return it in the body for clients that prefer a Bearer header.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::jwt;
use crate::auth::middleware::Claims;
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::db::{self, models::User};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::users::{self, store::NewUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// User JSON plus the session token.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
}

fn required(field: Option<String>) -> Option<String> {
    field.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(username), Some(email), Some(password)) = (
        required(req.username),
        required(req.email),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request("All fields are required"));
    };

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if !users::is_valid_username(&username) {
        return Err(ApiError::bad_request(
            "Username must be 3-30 characters, start with a letter, and contain only letters, numbers or underscores",
        ));
    }

    let email = normalize_email(&email);
    let full_name = req.full_name.map(|n| n.trim().to_string()).unwrap_or_default();

    // Reject duplicates before paying for a bcrypt hash.
    {
        let (email, username) = (email.clone(), username.clone());
        db::with_conn(&state.db, move |conn| {
            users::store::ensure_available(conn, &email, &username)
        })
        .await?;
    }

    let cost = state.auth.password_cost;
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&password, cost)).await??;

    // Checked again under the insert's lock in case of a concurrent signup.
    let user = db::with_conn(&state.db, move |conn| {
        users::store::ensure_available(conn, &email, &username)?;
        Ok(users::store::insert(
            conn,
            NewUser {
                email,
                username,
                full_name,
                password_hash,
            },
        )?)
    })
    .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

    let token = jwt::issue_session_token(&state.jwt_secret, &user.id, state.auth.session_ttl_days)?;
    let cookie = jwt::session_cookie(&token, &state.auth);

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse { user, token }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (required(req.email), req.password) else {
        return Err(ApiError::bad_request("Invalid credentials"));
    };
    let email = normalize_email(&email);

    let credentials =
        db::with_conn(&state.db, move |conn| Ok(users::store::find_credentials(conn, &email)?))
            .await?;
    let Some((user, hash)) = credentials else {
        return Err(ApiError::bad_request("Invalid credentials"));
    };

    let matches =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash)).await?;
    if !matches {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::bad_request("Invalid credentials"));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    let token = jwt::issue_session_token(&state.jwt_secret, &user.id, state.auth.session_ttl_days)?;
    let cookie = jwt::session_cookie(&token, &state.auth);

    Ok(([(header::SET_COOKIE, cookie)], Json(AuthResponse { user, token })))
}

/// POST /api/auth/logout — expires the session cookie. Always succeeds.
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::SET_COOKIE, jwt::clear_session_cookie(&state.auth))],
        Json(json!({ "message": "Logged out successfully" })),
    )
}

/// GET /api/auth/check — the authenticated user. JWT auth required.
pub async fn check_auth(State(state): State<AppState>, claims: Claims) -> ApiResult<Json<User>> {
    let user = db::with_conn(&state.db, move |conn| users::store::require(conn, &claims.sub)).await?;
    Ok(Json(user))
}
