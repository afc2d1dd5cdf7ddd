use futures::{SinkExt, StreamExt};
use agora_server::{routes, AppState};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

pub type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Serve the test app on a random port. Returns the base URL and the shared
/// state so tests can act through the messenger directly.
pub async fn start_server() -> (String, sqlx::SqlitePool, Arc<AppState>) {
    let pool = super::setup_test_db().await;
    let state = Arc::new(AppState::new(pool.clone(), super::test_config()));
    let app = routes::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (base, pool, state)
}

pub async fn ws_connect(base: &str, token: &str) -> Socket {
    let url = format!("{}/gateway?token={}", base.replace("http://", "ws://"), token);
    let (ws, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
    // Let the server register the session before anything is pushed.
    tokio::time::sleep(Duration::from_millis(50)).await;
    ws
}

/// Next event of the given `type`, skipping others, or None after 3s.
pub async fn recv_event(ws: &mut Socket, event_type: &str) -> Option<Value> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
    loop {
        let next = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        if let Ok(Message::Text(text)) = next {
            let value: Value = serde_json::from_str(&text).ok()?;
            if value["type"] == event_type {
                return Some(value);
            }
        }
    }
}

pub async fn send_json(ws: &mut Socket, value: &Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .unwrap();
}
