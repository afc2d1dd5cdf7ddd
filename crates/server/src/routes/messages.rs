use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::MessagingError;
use crate::models::{AuthUser, DirectMessageRequest, EditMessageRequest, MessageView};
use crate::AppState;

/// POST /api/messages/direct
///
/// Opens the conversation with `userId` if needed, then sends into it.
pub async fn send_direct(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<DirectMessageRequest>,
) -> Result<impl IntoResponse, MessagingError> {
    let (resolution, message) = state
        .messenger
        .send_direct(&user.id, &body.user_id, body.draft)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "conversationId": resolution.conversation_id,
            "created": resolution.created,
            "message": message,
        })),
    ))
}

/// PATCH /api/messages/:messageId
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
    Json(body): Json<EditMessageRequest>,
) -> Result<Json<MessageView>, MessagingError> {
    Ok(Json(
        state
            .messenger
            .edit(&message_id, &user.id, body.content)
            .await?,
    ))
}

/// DELETE /api/messages/:messageId
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(message_id): Path<String>,
) -> Result<StatusCode, MessagingError> {
    state.messenger.soft_delete(&message_id, &user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
