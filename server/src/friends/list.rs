use axum::{extract::State, Json};

use crate::auth::middleware::Claims;
use crate::db::{self, models::User};
use crate::error::ApiResult;
use crate::friends::store;
use crate::state::AppState;

/// GET /api/friends
pub async fn get_friends(State(state): State<AppState>, claims: Claims) -> ApiResult<Json<Vec<User>>> {
    let friends = db::with_conn(&state.db, move |conn| Ok(store::friends_of(conn, &claims.sub)?)).await?;
    Ok(Json(friends))
}
