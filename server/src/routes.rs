use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::CorsLayer;

use crate::auth::handlers as auth_handlers;
use crate::auth::middleware::JwtSecret;
use crate::friends::{list as friends_list, requests as friend_requests, search as friend_search};
use crate::messages::handlers as message_handlers;
use crate::presence::handlers as presence_handlers;
use crate::state::AppState;
use crate::users::profile;
use crate::ws::handler as ws_handler;

/// Request bodies may carry inline (data URI) images.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Inject the JWT secret into request extensions so the Claims extractor can find it.
async fn inject_jwt_secret(
    State(state): State<AppState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: middleware::Next,
) -> axum::response::Response {
    req.extensions_mut()
        .insert(JwtSecret(state.jwt_secret.clone()));
    next.run(req).await
}

/// Build the full axum Router with all routes and middleware.
///
/// The rate limiter keys on the peer address, so the router must be served
/// with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn build_router(
    state: AppState,
    cors_origin: &str,
) -> Result<Router, Box<dyn std::error::Error>> {
    // Signup and login: one token every 6 seconds per IP, burst of 10
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_second(6)
            .burst_size(10)
            .finish()
            .ok_or("invalid rate limit configuration")?,
    );
    let governor_limiter = governor_config.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            governor_limiter.retain_recent();
        }
    });

    let rate_limited_auth = Router::new()
        .route("/api/auth/signup", post(auth_handlers::signup))
        .route("/api/auth/login", post(auth_handlers::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    let auth_routes = Router::new()
        .route("/api/auth/logout", post(auth_handlers::logout))
        .route("/api/auth/check", get(auth_handlers::check_auth))
        .route("/api/auth/update-profile", put(profile::update_profile))
        .route("/api/auth/update-username", put(profile::update_username))
        .route("/api/auth/update-fullname", put(profile::update_full_name))
        .route("/api/auth/check-username", get(profile::check_username));

    let friend_routes = Router::new()
        .route("/api/friends", get(friends_list::get_friends))
        .route("/api/friends/search", get(friend_search::search_users))
        .route("/api/friends/request", post(friend_requests::send_request))
        .route("/api/friends/requests", get(friend_requests::list_requests))
        .route("/api/friends/respond", post(friend_requests::respond));

    // /api/messages/users must be registered alongside /api/messages/{id};
    // axum prefers the static segment.
    let message_routes = Router::new()
        .route("/api/messages/users", get(message_handlers::get_users_for_sidebar))
        .route("/api/messages/{id}", get(message_handlers::get_messages))
        .route("/api/messages/send/{id}", post(message_handlers::send_message));

    let presence_routes =
        Router::new().route("/api/presence", get(presence_handlers::get_online_users));

    // WebSocket endpoint (identity from cookie or ?token=, anonymous otherwise)
    let ws_routes = Router::new().route("/ws", get(ws_handler::ws_upgrade));

    let health = Router::new().route("/health", get(health_check));

    let cors = CorsLayer::new()
        .allow_origin(cors_origin.parse::<HeaderValue>()?)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Ok(Router::new()
        .merge(rate_limited_auth)
        .merge(auth_routes)
        .merge(friend_routes)
        .merge(message_routes)
        .merge(presence_routes)
        .merge(ws_routes)
        .merge(health)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            inject_jwt_secret,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state))
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
