mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use common::auth_header;
use serde_json::{json, Value};

async fn setup() -> (TestServer, sqlx::SqlitePool) {
    let pool = common::setup_test_db().await;
    let app = common::create_test_app(pool.clone());
    let server = TestServer::new(app).unwrap();
    (server, pool)
}

/// alice sends bob a first message. Returns (conversation_id, alice_token, bob_token).
async fn pending_request(server: &TestServer, pool: &sqlx::SqlitePool) -> (String, String, String) {
    let (_, alice_token) = common::create_test_user(pool, "alice").await;
    let (bob_id, bob_token) = common::create_test_user(pool, "bob").await;

    let (h, v) = auth_header(&alice_token);
    let body: Value = server
        .post("/api/messages/direct")
        .add_header(h, v)
        .json(&json!({ "userId": bob_id, "content": "Hello" }))
        .await
        .json();
    let conversation_id = body["conversationId"].as_str().unwrap().to_string();
    (conversation_id, alice_token, bob_token)
}

async fn answer(server: &TestServer, token: &str, conversation_id: &str, action: &str) -> axum_test::TestResponse {
    let (h, v) = auth_header(token);
    server
        .post(&format!("/api/conversations/{}/{}", conversation_id, action))
        .add_header(h, v)
        .await
}

async fn list(server: &TestServer, token: &str, path: &str) -> Vec<Value> {
    let (h, v) = auth_header(token);
    server.get(path).add_header(h, v).await.json()
}

#[tokio::test]
async fn accept_moves_request_into_inbox() {
    let (server, pool) = setup().await;
    let (conversation_id, alice_token, bob_token) = pending_request(&server, &pool).await;

    let res = answer(&server, &bob_token, &conversation_id, "accept").await;
    res.assert_status_ok();
    assert_eq!(res.json::<Value>()["requestStatus"], "accepted");

    assert!(list(&server, &bob_token, "/api/conversations/requests").await.is_empty());
    for token in [&alice_token, &bob_token] {
        let inbox = list(&server, token, "/api/conversations").await;
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0]["lastMessage"]["preview"], "Hello");
    }
}

#[tokio::test]
async fn only_the_recipient_answers() {
    let (server, pool) = setup().await;
    let (conversation_id, alice_token, _) = pending_request(&server, &pool).await;
    let (_, eve_token) = common::create_test_user(&pool, "eve").await;

    answer(&server, &alice_token, &conversation_id, "accept")
        .await
        .assert_status(StatusCode::FORBIDDEN);
    answer(&server, &eve_token, &conversation_id, "decline")
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn answered_requests_cannot_change() {
    let (server, pool) = setup().await;
    let (conversation_id, _, bob_token) = pending_request(&server, &pool).await;

    answer(&server, &bob_token, &conversation_id, "accept")
        .await
        .assert_status_ok();

    let res = answer(&server, &bob_token, &conversation_id, "decline").await;
    res.assert_status(StatusCode::CONFLICT);
    assert_eq!(
        res.json::<Value>()["error"],
        "Request is already accepted, cannot mark it declined"
    );
}

#[tokio::test]
async fn decline_then_delete() {
    let (server, pool) = setup().await;
    let (conversation_id, alice_token, bob_token) = pending_request(&server, &pool).await;

    // Active threads cannot be deleted.
    let (h, v) = auth_header(&bob_token);
    server
        .delete(&format!("/api/conversations/{}", conversation_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::CONFLICT);

    answer(&server, &bob_token, &conversation_id, "decline")
        .await
        .assert_status_ok();

    assert!(list(&server, &bob_token, "/api/conversations/requests").await.is_empty());
    assert!(list(&server, &alice_token, "/api/conversations").await.is_empty());

    let (h, v) = auth_header(&alice_token);
    server
        .post(&format!("/api/conversations/{}/messages", conversation_id))
        .add_header(h, v)
        .json(&json!({ "content": "please?" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let (h, v) = auth_header(&bob_token);
    server
        .delete(&format!("/api/conversations/{}", conversation_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NO_CONTENT);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);

    let (h, v) = auth_header(&bob_token);
    server
        .delete(&format!("/api/conversations/{}", conversation_id))
        .add_header(h, v)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn simultaneous_accept_and_decline_settle_once() {
    let (server, pool) = setup().await;
    let (conversation_id, _, bob_token) = pending_request(&server, &pool).await;

    let (accepted, declined) = tokio::join!(
        answer(&server, &bob_token, &conversation_id, "accept"),
        answer(&server, &bob_token, &conversation_id, "decline"),
    );
    let mut codes = [accepted.status_code(), declined.status_code()];
    codes.sort();
    assert_eq!(codes, [StatusCode::OK, StatusCode::CONFLICT]);

    let winner = if accepted.status_code() == StatusCode::OK {
        "accepted"
    } else {
        "declined"
    };
    let stored: String =
        sqlx::query_scalar("SELECT request_status FROM conversations WHERE id = ?")
            .bind(&conversation_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(stored, winner);
}
