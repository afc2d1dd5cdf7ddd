mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use common::auth_header;
use serde_json::{json, Value};

async fn setup() -> (TestServer, sqlx::SqlitePool) {
    let pool = common::setup_test_db().await;
    let app = common::create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

async fn open_direct(server: &TestServer, token: &str, user_id: &str) -> axum_test::TestResponse {
    let (h, v) = auth_header(token);
    server
        .post("/api/conversations/direct")
        .add_header(h, v)
        .json(&json!({ "userId": user_id }))
        .await
}

#[tokio::test]
async fn requires_session() {
    let (server, _pool) = setup().await;

    let res = server.get("/api/conversations").await;
    res.assert_status(StatusCode::UNAUTHORIZED);

    let (h, v) = auth_header("not-a-token");
    let res = server.get("/api/conversations").add_header(h, v).await;
    res.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_cookie_is_accepted() {
    let (server, pool) = setup().await;
    let (_, token) = common::create_test_user(&pool, "alice").await;

    let res = server
        .get("/api/conversations")
        .add_header(
            HeaderName::from_static("cookie"),
            format!("agora.session_token={}", token)
                .parse::<HeaderValue>()
                .unwrap(),
        )
        .await;
    res.assert_status_ok();
}

#[tokio::test]
async fn open_direct_is_idempotent_in_both_directions() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let first = open_direct(&server, &alice_token, &bob_id).await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["created"], true);

    let again = open_direct(&server, &alice_token, &bob_id).await;
    again.assert_status_ok();
    let again: Value = again.json();
    assert_eq!(again["created"], false);
    assert_eq!(again["conversationId"], first["conversationId"]);

    let reverse: Value = open_direct(&server, &bob_token, &alice_id).await.json();
    assert_eq!(reverse["conversationId"], first["conversationId"]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn concurrent_opens_create_one_conversation() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;

    let (a, b) = tokio::join!(
        open_direct(&server, &alice_token, &bob_id),
        open_direct(&server, &alice_token, &bob_id)
    );
    let a: Value = a.json();
    let b: Value = b.json();
    assert_eq!(a["conversationId"], b["conversationId"]);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn open_direct_rejects_self_and_unknown_users() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;

    open_direct(&server, &alice_token, &alice_id)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    open_direct(&server, &alice_token, "")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let res = open_direct(&server, &alice_token, "ghost").await;
    res.assert_status(StatusCode::NOT_FOUND);
    let body: Value = res.json();
    assert_eq!(body["error"], "User not found");
}

#[tokio::test]
async fn strangers_can_still_start_a_conversation() {
    let (server, pool) = setup().await;
    let (alice_id, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, _) = common::create_test_user(&pool, "bob").await;
    let (carol_id, _) = common::create_test_user(&pool, "carol").await;
    common::follow(&pool, &alice_id, &bob_id).await;

    open_direct(&server, &alice_token, &bob_id)
        .await
        .assert_status(StatusCode::CREATED);
    open_direct(&server, &alice_token, &carol_id)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn request_lands_in_recipient_requests() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let opened: Value = open_direct(&server, &alice_token, &bob_id).await.json();

    let (h, v) = auth_header(&bob_token);
    let requests: Vec<Value> = server
        .get("/api/conversations/requests")
        .add_header(h, v)
        .await
        .json();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0]["id"], opened["conversationId"]);
    assert_eq!(requests[0]["requestStatus"], "pending");
    assert_eq!(requests[0]["participants"][0]["username"], "alice");
    assert!(requests[0].get("directKey").is_none());

    let (h, v) = auth_header(&bob_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert!(inbox.is_empty());

    let (h, v) = auth_header(&alice_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert_eq!(inbox.len(), 1);
}

#[tokio::test]
async fn group_lifecycle() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;
    let (carol_id, carol_token) = common::create_test_user(&pool, "carol").await;

    let (h, v) = auth_header(&alice_token);
    let res = server
        .post("/api/conversations/group")
        .add_header(h, v)
        .json(&json!({ "title": "Weekend", "memberIds": [bob_id] }))
        .await;
    res.assert_status(StatusCode::CREATED);
    let group: Value = res.json();
    assert_eq!(group["isGroup"], true);
    assert_eq!(group["requestStatus"], "accepted");
    let group_id = group["id"].as_str().unwrap().to_string();

    // Members see a group straight away.
    let (h, v) = auth_header(&bob_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["title"], "Weekend");

    // Outsiders cannot add people.
    let (h, v) = auth_header(&carol_token);
    server
        .post(&format!("/api/conversations/{}/members", group_id))
        .add_header(h, v)
        .json(&json!({ "userId": carol_id }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&bob_token);
    server
        .post(&format!("/api/conversations/{}/members", group_id))
        .add_header(h, v)
        .json(&json!({ "userId": carol_id }))
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (h, v) = auth_header(&alice_token);
    server
        .post(&format!("/api/conversations/{}/members", group_id))
        .add_header(h, v)
        .json(&json!({ "userId": carol_id }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let (h, v) = auth_header(&carol_token);
    server
        .delete(&format!("/api/conversations/{}/members/me", group_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let (h, v) = auth_header(&carol_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert!(inbox.is_empty());

    let left_at: Option<String> = sqlx::query_scalar(
        "SELECT left_at FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
    )
    .bind(&group_id)
    .bind(&carol_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert!(left_at.is_some());
}

#[tokio::test]
async fn group_needs_members() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/conversations/group")
        .add_header(h, v)
        .json(&json!({ "memberIds": [] }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unread_total_skips_muted_and_resets_on_read() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(&pool, "bob").await;

    let (h, v) = auth_header(&alice_token);
    let group: Value = server
        .post("/api/conversations/group")
        .add_header(h, v)
        .json(&json!({ "memberIds": [bob_id] }))
        .await
        .json();
    let group_id = group["id"].as_str().unwrap().to_string();

    for text in ["one", "two"] {
        let (h, v) = auth_header(&alice_token);
        server
            .post(&format!("/api/conversations/{}/messages", group_id))
            .add_header(h, v)
            .json(&json!({ "content": text }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let unread = |token: String| {
        let (h, v) = auth_header(&token);
        let req = server.get("/api/conversations/unread").add_header(h, v);
        async move { req.await.json::<Value>()["total"].as_i64().unwrap() }
    };
    assert_eq!(unread(bob_token.clone()).await, 2);
    assert_eq!(unread(alice_token.clone()).await, 0);

    let (h, v) = auth_header(&bob_token);
    server
        .patch(&format!("/api/conversations/{}/mute", group_id))
        .add_header(h, v)
        .json(&json!({ "muted": true }))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(unread(bob_token.clone()).await, 0);

    let (h, v) = auth_header(&bob_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert_eq!(inbox[0]["isMuted"], true);
    assert_eq!(inbox[0]["unreadCount"], 2);

    let (h, v) = auth_header(&bob_token);
    let res = server
        .post(&format!("/api/conversations/{}/read", group_id))
        .add_header(h, v)
        .await;
    res.assert_status_ok();
    assert!(res.json::<Value>()["lastReadAt"].as_str().is_some());

    let (h, v) = auth_header(&bob_token);
    let inbox: Vec<Value> = server.get("/api/conversations").add_header(h, v).await.json();
    assert_eq!(inbox[0]["unreadCount"], 0);
}

#[tokio::test]
async fn mark_read_unknown_conversation() {
    let (server, pool) = setup().await;
    let (_, alice_token) = common::create_test_user(&pool, "alice").await;

    let (h, v) = auth_header(&alice_token);
    server
        .post("/api/conversations/nope/read")
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
