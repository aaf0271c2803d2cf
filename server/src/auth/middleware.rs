use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::auth::jwt;
use crate::error::ApiError;

/// JWT claims extracted from the session cookie or an Authorization: Bearer header.
/// Implements axum's FromRequestParts for use as an extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (UUIDv7)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = jwt::token_from_headers(&parts.headers).ok_or_else(|| {
            ApiError::Unauthorized("Unauthorized - No Token Provided".to_string())
        })?;

        // Get JWT secret from request extensions (set by middleware layer)
        let jwt_secret = parts
            .extensions
            .get::<JwtSecret>()
            .ok_or_else(|| ApiError::internal("JWT secret missing from request extensions"))?;

        jwt::validate_session_token(&jwt_secret.0, &token)
            .map_err(|_| ApiError::Unauthorized("Unauthorized - Invalid Token".to_string()))
    }
}

/// JWT secret stored in request extensions for the Claims extractor
#[derive(Clone)]
pub struct JwtSecret(pub Vec<u8>);
