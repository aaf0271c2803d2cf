//! Shared helpers for the integration tests: a real server on an ephemeral
//! port plus thin HTTP/WebSocket client wrappers.

#![allow(dead_code)]

use futures_util::StreamExt;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

use huddle_server::presence::PresenceService;
use huddle_server::state::{AppState, AuthSettings, KeepaliveSettings};

pub type WsRead = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

pub struct TestServer {
    pub base_url: String,
    pub addr: SocketAddr,
    pub presence: Arc<PresenceService>,
}

/// A signed-up user as seen by the tests.
pub struct TestUser {
    pub id: String,
    pub username: String,
    pub token: String,
}

/// Start the server on a random port with a throwaway data dir.
pub async fn start_test_server() -> TestServer {
    start_test_server_with(KeepaliveSettings::default()).await
}

/// Same as `start_test_server`, with custom WebSocket ping timings.
pub async fn start_test_server_with(keepalive: KeepaliveSettings) -> TestServer {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();

    let db = huddle_server::db::init_db(&data_dir).expect("Failed to init DB");
    let jwt_secret = huddle_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");
    let presence = Arc::new(PresenceService::new());

    let state = AppState {
        db,
        jwt_secret,
        presence: presence.clone(),
        auth: AuthSettings {
            session_ttl_days: 7,
            secure_cookies: false,
            password_cost: 4,
        },
        keepalive,
    };

    let app = huddle_server::routes::build_router(state, "http://localhost:5173")
        .expect("Failed to build router");
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    TestServer {
        base_url: format!("http://{}", addr),
        addr,
        presence,
    }
}

pub async fn signup(server: &TestServer, username: &str) -> TestUser {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/auth/signup", server.base_url))
        .json(&json!({
            "fullName": format!("{} Test", username),
            "username": username,
            "email": format!("{}@example.com", username),
            "password": "secret123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Signup failed for {}", username);

    let body: Value = resp.json().await.unwrap();
    TestUser {
        id: body["_id"].as_str().unwrap().to_string(),
        username: username.to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub async fn get(server: &TestServer, user: &TestUser, path: &str) -> reqwest::Response {
    reqwest::Client::new()
        .get(format!("{}{}", server.base_url, path))
        .bearer_auth(&user.token)
        .send()
        .await
        .unwrap()
}

pub async fn post(server: &TestServer, user: &TestUser, path: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}{}", server.base_url, path))
        .bearer_auth(&user.token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

pub async fn put(server: &TestServer, user: &TestUser, path: &str, body: Value) -> reqwest::Response {
    reqwest::Client::new()
        .put(format!("{}{}", server.base_url, path))
        .bearer_auth(&user.token)
        .json(&body)
        .send()
        .await
        .unwrap()
}

/// Make `a` and `b` friends through the public API.
pub async fn befriend(server: &TestServer, a: &TestUser, b: &TestUser) {
    let resp = post(server, a, "/api/friends/request", json!({ "receiverId": b.id })).await;
    assert_eq!(resp.status(), 201);

    let requests: Value = get(server, b, "/api/friends/requests").await.json().await.unwrap();
    let request_id = requests[0]["_id"].as_str().unwrap().to_string();

    let resp = post(
        server,
        b,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "accept" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
}

/// Open a WebSocket, optionally authenticated via `?token=`.
pub async fn connect_ws(server: &TestServer, token: Option<&str>) -> WsRead {
    let url = match token {
        Some(token) => format!("ws://{}/ws?token={}", server.addr, token),
        None => format!("ws://{}/ws", server.addr),
    };
    let (ws_stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("Failed to connect to WebSocket");
    let (_write, read) = ws_stream.split();
    read
}

/// Next JSON event frame, skipping control frames.
pub async fn next_event(read: &mut WsRead) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), read.next())
            .await
            .expect("Timed out waiting for event");
        match msg {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
            other => panic!("Expected text frame, got {:?}", other),
        }
    }
}

/// Read events until a `getOnlineUsers` with exactly `expected` (in any order) arrives.
pub async fn wait_for_online(read: &mut WsRead, expected: &[&str]) {
    let mut want: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
    want.sort();
    loop {
        let event = next_event(read).await;
        if event["event"] != "getOnlineUsers" {
            continue;
        }
        let mut got: Vec<String> = serde_json::from_value(event["data"].clone()).unwrap();
        got.sort();
        if got == want {
            return;
        }
    }
}

/// Assert that nothing arrives for a short while.
pub async fn assert_silent(read: &mut WsRead) {
    let result = tokio::time::timeout(Duration::from_millis(300), read.next()).await;
    assert!(result.is_err(), "Expected no frame, got {:?}", result);
}
