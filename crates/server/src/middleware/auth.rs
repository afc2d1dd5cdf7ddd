use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::models::AuthUser;
use crate::AppState;

pub const SESSION_COOKIE: &str = "agora.session_token";

/// Session token from the `agora.session_token` cookie or a bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get("cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .filter_map(|c| c.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .next()
        .map(str::to_string);

    from_cookie
        .or_else(|| {
            headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .filter(|t| !t.is_empty())
}

pub enum SessionError {
    Invalid,
    Expired,
    Database(sqlx::Error),
}

/// Look up the user behind a session token, rejecting expired sessions.
pub async fn session_user(db: &SqlitePool, token: &str) -> Result<AuthUser, SessionError> {
    let row = sqlx::query_as::<_, (String, String, String)>(
        r#"SELECT u.id, u.username, s.expiresAt
           FROM "session" s
           JOIN "user" u ON u.id = s.userId
           WHERE s.token = ?"#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .map_err(SessionError::Database)?;

    let (id, username, expires_at) = row.ok_or(SessionError::Invalid)?;

    let now = chrono::Utc::now().to_rfc3339();
    if expires_at < now {
        return Err(SessionError::Expired);
    }

    Ok(AuthUser { id, username })
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers)
            .ok_or_else(|| unauthorized("Not authenticated"))?;

        session_user(&state.db, &token).await.map_err(|e| match e {
            SessionError::Invalid => unauthorized("Invalid session"),
            SessionError::Expired => unauthorized("Session expired"),
            SessionError::Database(e) => {
                tracing::error!("Session lookup failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({"error": "Database error"})),
                )
                    .into_response()
            }
        })
    }
}
