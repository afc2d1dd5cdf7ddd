use serde::{Deserialize, Serialize};

use super::Profile;

/// Stored message row. The body is only ever held encoded; `preview` is
/// the cleartext excerpt shown in conversation lists.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub encrypted_content: String,
    pub preview: String,
    pub content_type: String,
    pub media_url: Option<String>,
    pub listing_id: Option<String>,
    pub is_deleted: bool,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub encrypted_content: String,
    pub preview: String,
    pub content_type: String,
    pub media_url: Option<String>,
    pub listing_id: Option<String>,
    pub created_at: String,
}

impl NewMessage {
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            encrypted_content: self.encrypted_content,
            preview: self.preview,
            content_type: self.content_type,
            media_url: self.media_url,
            listing_id: self.listing_id,
            is_deleted: false,
            is_edited: false,
            edited_at: None,
            created_at: self.created_at,
        }
    }
}

/// What a caller supplies when sending.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDraft {
    #[serde(default)]
    pub content: String,
    pub content_type: Option<String>,
    pub media_url: Option<String>,
    pub listing_id: Option<String>,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A message as returned to a participant: decoded body plus sender
/// display data.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender: Option<Profile>,
    /// `None` when the stored body could not be decoded.
    pub content: Option<String>,
    pub preview: String,
    pub content_type: String,
    pub media_url: Option<String>,
    pub listing_id: Option<String>,
    pub is_edited: bool,
    pub edited_at: Option<String>,
    pub created_at: String,
}

impl MessageView {
    pub fn new(message: Message, content: Option<String>, sender: Option<Profile>) -> Self {
        Self {
            id: message.id,
            conversation_id: message.conversation_id,
            sender_id: message.sender_id,
            sender,
            content,
            preview: message.preview,
            content_type: message.content_type,
            media_url: message.media_url,
            listing_id: message.listing_id,
            is_edited: message.is_edited,
            edited_at: message.edited_at,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub id: String,
    pub sender_id: String,
    pub preview: String,
    pub created_at: String,
}

impl From<&Message> for LastMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            sender_id: message.sender_id.clone(),
            preview: message.preview.clone(),
            created_at: message.created_at.clone(),
        }
    }
}
