pub mod conversations;
pub mod messages;

use crate::ws;
use crate::AppState;
use axum::{routing::{get, post, patch, delete}, Router};
use std::sync::Arc;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Conversations
        .route("/conversations", get(conversations::list_inbox))
        .route("/conversations/requests", get(conversations::list_requests))
        .route("/conversations/unread", get(conversations::unread_total))
        .route("/conversations/direct", post(conversations::open_direct))
        .route("/conversations/group", post(conversations::create_group))
        .route("/conversations/{conversationId}", delete(conversations::delete_declined))
        .route("/conversations/{conversationId}/members", post(conversations::add_member))
        .route("/conversations/{conversationId}/members/me", delete(conversations::leave))
        .route("/conversations/{conversationId}/mute", patch(conversations::set_muted))
        .route("/conversations/{conversationId}/read", post(conversations::mark_read))
        .route("/conversations/{conversationId}/accept", post(conversations::accept))
        .route("/conversations/{conversationId}/decline", post(conversations::decline))
        // Messages
        .route("/conversations/{conversationId}/messages", get(conversations::list_messages))
        .route("/conversations/{conversationId}/messages", post(conversations::send_message))
        .route("/messages/direct", post(messages::send_direct))
        .route("/messages/{messageId}", patch(messages::edit_message))
        .route("/messages/{messageId}", delete(messages::delete_message));

    Router::new()
        .nest("/api", api_routes)
        .route("/gateway", get(ws::handler::ws_handler))
        .with_state(state)
}
