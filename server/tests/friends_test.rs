//! Integration tests for user search, friend requests and the friends list.

mod common;

use serde_json::{json, Value};

use common::{befriend, get, post, signup, start_test_server};

#[tokio::test]
async fn test_search_users() {
    let server = start_test_server().await;
    let alice = signup(&server, "alice").await;
    signup(&server, "alicia").await;
    signup(&server, "bob").await;

    let resp = get(&server, &alice, "/api/friends/search").await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Search query is required");

    let found: Vec<Value> = get(&server, &alice, "/api/friends/search?query=ALI")
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = found.iter().map(|u| u["username"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["alicia"]);

    let found: Vec<Value> = get(&server, &alice, "/api/friends/search?query=example.com")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_friend_request_flow() {
    let server = start_test_server().await;
    let alice = signup(&server, "alice").await;
    let bob = signup(&server, "bob").await;

    let resp = post(&server, &alice, "/api/friends/request", json!({ "receiverId": bob.id })).await;
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Friend request sent successfully");

    let requests: Vec<Value> = get(&server, &bob, "/api/friends/requests").await.json().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["sender"]["_id"], alice.id.as_str());
    assert_eq!(requests[0]["sender"]["username"], "alice");
    assert_eq!(requests[0]["receiver"], bob.id.as_str());
    assert_eq!(requests[0]["status"], "pending");

    // Alice cannot answer her own request.
    let request_id = requests[0]["_id"].as_str().unwrap().to_string();
    let resp = post(
        &server,
        &alice,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "accept" }),
    )
    .await;
    assert_eq!(resp.status(), 404);

    let resp = post(
        &server,
        &bob,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "maybe" }),
    )
    .await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Invalid action");

    let resp = post(
        &server,
        &bob,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "accept" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Friend request accepted successfully");

    let pending: Vec<Value> = get(&server, &bob, "/api/friends/requests").await.json().await.unwrap();
    assert!(pending.is_empty());

    let friends: Vec<Value> = get(&server, &alice, "/api/friends").await.json().await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0]["_id"], bob.id.as_str());

    let friends: Vec<Value> = get(&server, &bob, "/api/friends").await.json().await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0]["_id"], alice.id.as_str());

    let resp = post(&server, &bob, "/api/friends/request", json!({ "receiverId": alice.id })).await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Already friends");
}

#[tokio::test]
async fn test_friend_request_errors() {
    let server = start_test_server().await;
    let alice = signup(&server, "alice").await;
    let bob = signup(&server, "bob").await;

    let cases = [
        (json!({}), 400, "Receiver ID is required"),
        (json!({ "receiverId": alice.id }), 400, "Cannot send friend request to yourself"),
        (json!({ "receiverId": "no-such-user" }), 404, "User not found"),
    ];
    for (body, status, message) in cases {
        let resp = post(&server, &alice, "/api/friends/request", body).await;
        assert_eq!(resp.status(), status);
        let err: Value = resp.json().await.unwrap();
        assert_eq!(err["message"], message);
    }

    let resp = post(&server, &alice, "/api/friends/request", json!({ "receiverId": bob.id })).await;
    assert_eq!(resp.status(), 201);

    // Either direction counts as a duplicate.
    let resp = post(&server, &bob, "/api/friends/request", json!({ "receiverId": alice.id })).await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Friend request already exists");

    let resp = post(&server, &bob, "/api/friends/respond", json!({ "action": "accept" })).await;
    assert_eq!(resp.status(), 400);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Request ID and action are required");
}

#[tokio::test]
async fn test_declined_request_is_not_a_friendship() {
    let server = start_test_server().await;
    let alice = signup(&server, "alice").await;
    let bob = signup(&server, "bob").await;
    let carol = signup(&server, "carol").await;

    post(&server, &alice, "/api/friends/request", json!({ "receiverId": bob.id })).await;
    let requests: Vec<Value> = get(&server, &bob, "/api/friends/requests").await.json().await.unwrap();
    let request_id = requests[0]["_id"].as_str().unwrap().to_string();

    let resp = post(
        &server,
        &bob,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "decline" }),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Friend request declined successfully");

    let friends: Vec<Value> = get(&server, &bob, "/api/friends").await.json().await.unwrap();
    assert!(friends.is_empty());

    // Answering twice finds nothing pending.
    let resp = post(
        &server,
        &bob,
        "/api/friends/respond",
        json!({ "requestId": request_id, "action": "accept" }),
    )
    .await;
    assert_eq!(resp.status(), 404);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["message"], "Friend request not found");

    befriend(&server, &carol, &bob).await;
    let friends: Vec<Value> = get(&server, &bob, "/api/friends").await.json().await.unwrap();
    assert_eq!(friends.len(), 1);
    assert_eq!(friends[0]["username"], "carol");
}
