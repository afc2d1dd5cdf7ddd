use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::error::MessagingError;
use crate::models::{
    AddMemberRequest, AuthUser, CreateGroupRequest, DirectRequest, InboxEntry, MessageDraft,
    MessageView, MuteRequest,
};
use crate::AppState;

/// GET /api/conversations
pub async fn list_inbox(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<InboxEntry>>, MessagingError> {
    Ok(Json(state.messenger.inbox(&user.id).await?))
}

/// GET /api/conversations/requests
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<Vec<InboxEntry>>, MessagingError> {
    Ok(Json(state.messenger.requests(&user.id).await?))
}

/// GET /api/conversations/unread
pub async fn unread_total(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, MessagingError> {
    let total = state.messenger.unread_total(&user.id).await?;
    Ok(Json(serde_json::json!({ "total": total })))
}

/// POST /api/conversations/direct
pub async fn open_direct(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<DirectRequest>,
) -> Result<impl IntoResponse, MessagingError> {
    let resolution = state
        .messenger
        .resolve_conversation(&user.id, &body.user_id)
        .await?;
    let status = if resolution.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(resolution)))
}

/// POST /api/conversations/group
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<CreateGroupRequest>,
) -> Result<impl IntoResponse, MessagingError> {
    let conversation = state
        .messenger
        .create_group(&user.id, body.title, body.member_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// POST /api/conversations/:conversationId/members
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<AddMemberRequest>,
) -> Result<StatusCode, MessagingError> {
    state
        .messenger
        .add_member(&conversation_id, &user.id, &body.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/conversations/:conversationId/members/me
pub async fn leave(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, MessagingError> {
    state
        .messenger
        .leave_conversation(&conversation_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/conversations/:conversationId/mute
pub async fn set_muted(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Json(body): Json<MuteRequest>,
) -> Result<StatusCode, MessagingError> {
    state
        .messenger
        .set_muted(&conversation_id, &user.id, body.muted)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/conversations/:conversationId/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, MessagingError> {
    let last_read_at = state.messenger.mark_read(&conversation_id, &user.id).await?;
    Ok(Json(serde_json::json!({ "lastReadAt": last_read_at })))
}

/// POST /api/conversations/:conversationId/accept
pub async fn accept(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, MessagingError> {
    Ok(Json(state.messenger.accept(&conversation_id, &user.id).await?))
}

/// POST /api/conversations/:conversationId/decline
pub async fn decline(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<impl IntoResponse, MessagingError> {
    Ok(Json(state.messenger.decline(&conversation_id, &user.id).await?))
}

/// DELETE /api/conversations/:conversationId
pub async fn delete_declined(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<StatusCode, MessagingError> {
    state
        .messenger
        .delete_declined(&conversation_id, &user.id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/conversations/:conversationId/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<MessageView>>, MessagingError> {
    Ok(Json(state.messenger.fetch(&conversation_id, &user.id).await?))
}

/// POST /api/conversations/:conversationId/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(conversation_id): Path<String>,
    Json(draft): Json<MessageDraft>,
) -> Result<impl IntoResponse, MessagingError> {
    let message = state
        .messenger
        .send(&conversation_id, &user.id, draft)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}
