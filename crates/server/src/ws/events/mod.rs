mod server_event;

pub use server_event::ServerEvent;

use serde::Deserialize;

// ── Client → Server Events ──

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    MarkRead {
        #[serde(rename = "conversationId")]
        conversation_id: String,
    },
    Ping,
}
