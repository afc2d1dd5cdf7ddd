use serde::Serialize;

// ── Server → Client Events ──

/// Pushed to participants. Message events only carry the cleartext preview;
/// clients fetch the body through the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    MessageCreated {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        #[serde(rename = "senderId")]
        sender_id: String,
        preview: String,
        #[serde(rename = "createdAt")]
        created_at: String,
    },
    MessageEdited {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
        preview: String,
        #[serde(rename = "editedAt")]
        edited_at: String,
    },
    MessageDeleted {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "messageId")]
        message_id: String,
    },
    ConversationRequest {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "fromUserId")]
        from_user_id: String,
    },
    ConversationAccepted {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "byUserId")]
        by_user_id: String,
    },
    ConversationAdded {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "byUserId")]
        by_user_id: String,
    },
    ReadState {
        #[serde(rename = "conversationId")]
        conversation_id: String,
        #[serde(rename = "lastReadAt")]
        last_read_at: String,
    },
    Error {
        message: String,
    },
}
