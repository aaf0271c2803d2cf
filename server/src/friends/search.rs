use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::auth::middleware::Claims;
use crate::db::{self, models::User};
use crate::error::{ApiError, ApiResult};
use crate::friends::store;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: Option<String>,
}

/// GET /api/friends/search?query=
pub async fn search_users(
    State(state): State<AppState>,
    claims: Claims,
    Query(params): Query<SearchQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let query = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;

    let users = db::with_conn(&state.db, move |conn| {
        Ok(store::search_users(conn, &query, &claims.sub)?)
    })
    .await?;

    Ok(Json(users))
}
