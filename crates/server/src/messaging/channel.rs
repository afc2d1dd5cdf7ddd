use agora_shared::constants::CONTENT_TYPE_TEXT;
use agora_shared::validation::{
    validate_content_type, validate_id, validate_media_url, validate_message_content,
};

use super::cipher::preview_of;
use super::{degrade, Messenger};
use crate::error::{MessagingError, Result};
use crate::models::{
    now_timestamp, Message, MessageDraft, MessageView, NewMessage, Profile, RequestStatus, Resolution,
};
use crate::ws::events::ServerEvent;

fn validate_draft(draft: &MessageDraft) -> Result<()> {
    validate_message_content(&draft.content).map_err(MessagingError::Validation)?;
    if let Some(content_type) = &draft.content_type {
        validate_content_type(content_type).map_err(MessagingError::Validation)?;
    }
    if let Some(url) = &draft.media_url {
        validate_media_url(url).map_err(MessagingError::Validation)?;
    }
    Ok(())
}

impl Messenger {
    /// Append a message. The body is stored encoded; the returned view
    /// carries the plaintext so the caller does not decode it again.
    pub async fn send(
        &self,
        conversation_id: &str,
        sender_id: &str,
        draft: MessageDraft,
    ) -> Result<MessageView> {
        validate_id("senderId", sender_id).map_err(MessagingError::Validation)?;
        validate_draft(&draft)?;

        let conversation = self.load_conversation(conversation_id).await?;
        let participants = self.require_participant(&conversation.id, sender_id).await?;
        if !conversation.is_group && conversation.request_status == RequestStatus::Declined {
            return Err(MessagingError::Forbidden(
                "This conversation was declined".into(),
            ));
        }

        let MessageDraft {
            content,
            content_type,
            media_url,
            listing_id,
        } = draft;

        let new = NewMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            sender_id: sender_id.to_string(),
            encrypted_content: self.cipher.encode(&conversation.id, &content),
            preview: preview_of(&content),
            content_type: content_type.unwrap_or_else(|| CONTENT_TYPE_TEXT.to_string()),
            media_url,
            listing_id,
            created_at: now_timestamp(),
        };

        let message = self.store.append_message(new).await.map_err(|e| {
            tracing::error!("Failed to append message to {}: {:?}", conversation.id, e);
            MessagingError::from(e)
        })?;

        self.notify_others(
            &participants,
            sender_id,
            ServerEvent::MessageCreated {
                conversation_id: message.conversation_id.clone(),
                message_id: message.id.clone(),
                sender_id: message.sender_id.clone(),
                preview: message.preview.clone(),
                created_at: message.created_at.clone(),
            },
        )
        .await;

        let sender = self.sender_profile(sender_id).await;
        Ok(MessageView::new(message, Some(content), sender))
    }

    /// Resolve (or open) the direct conversation with `recipient_id`, then
    /// send into it.
    pub async fn send_direct(
        &self,
        sender_id: &str,
        recipient_id: &str,
        draft: MessageDraft,
    ) -> Result<(Resolution, MessageView)> {
        validate_draft(&draft)?;
        let resolution = self.resolve_conversation(sender_id, recipient_id).await?;
        let message = self
            .send(&resolution.conversation_id, sender_id, draft)
            .await?;
        Ok((resolution, message))
    }

    /// All live messages, oldest first, decoded for `viewer_id`.
    pub async fn fetch(&self, conversation_id: &str, viewer_id: &str) -> Result<Vec<MessageView>> {
        degrade("messages", self.fetch_messages(conversation_id, viewer_id).await)
    }

    async fn fetch_messages(&self, conversation_id: &str, viewer_id: &str) -> Result<Vec<MessageView>> {
        let conversation = self.load_conversation(conversation_id).await?;
        self.require_participant(&conversation.id, viewer_id).await?;

        let messages = self.store.messages(&conversation.id).await?;
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        // One profile lookup for the whole page.
        let mut sender_ids: Vec<String> = messages.iter().map(|m| m.sender_id.clone()).collect();
        sender_ids.sort();
        sender_ids.dedup();
        let profiles = self.profile_map(&sender_ids).await?;

        Ok(messages
            .into_iter()
            .map(|m| {
                let content = self.decode_body(&m);
                let sender = profiles.get(&m.sender_id).cloned();
                MessageView::new(m, content, sender)
            })
            .collect())
    }

    /// Sender-only. Deleting twice is a no-op.
    pub async fn soft_delete(&self, message_id: &str, requester_id: &str) -> Result<()> {
        let message = self.load_own_message(message_id, requester_id).await?;
        if message.is_deleted {
            return Ok(());
        }

        // Recipients first; nothing is written if they cannot be read.
        let participants = self.store.active_participants(&message.conversation_id).await?;
        self.store.soft_delete_message(&message.id).await?;

        self.notify_others(
            &participants,
            requester_id,
            ServerEvent::MessageDeleted {
                conversation_id: message.conversation_id,
                message_id: message.id,
            },
        )
        .await;
        Ok(())
    }

    /// Sender-only. Replaces body and preview and flags the message edited.
    pub async fn edit(
        &self,
        message_id: &str,
        requester_id: &str,
        content: String,
    ) -> Result<MessageView> {
        validate_message_content(&content).map_err(MessagingError::Validation)?;
        let mut message = self.load_own_message(message_id, requester_id).await?;
        if message.is_deleted {
            return Err(MessagingError::NotFound("Message"));
        }

        let participants = self.store.active_participants(&message.conversation_id).await?;
        let at = now_timestamp();
        message.encrypted_content = self.cipher.encode(&message.conversation_id, &content);
        message.preview = preview_of(&content);
        message.is_edited = true;
        message.edited_at = Some(at.clone());

        self.store
            .edit_message(&message.id, &message.encrypted_content, &message.preview, &at)
            .await?;

        self.notify_others(
            &participants,
            requester_id,
            ServerEvent::MessageEdited {
                conversation_id: message.conversation_id.clone(),
                message_id: message.id.clone(),
                preview: message.preview.clone(),
                edited_at: at,
            },
        )
        .await;

        let sender = self.sender_profile(requester_id).await;
        Ok(MessageView::new(message, Some(content), sender))
    }

    async fn load_own_message(&self, message_id: &str, requester_id: &str) -> Result<Message> {
        validate_id("messageId", message_id).map_err(MessagingError::Validation)?;
        let message = self
            .store
            .message(message_id)
            .await?
            .ok_or(MessagingError::NotFound("Message"))?;
        if message.sender_id != requester_id {
            return Err(MessagingError::Forbidden(
                "Only the sender can change this message".into(),
            ));
        }
        Ok(message)
    }

    fn decode_body(&self, message: &Message) -> Option<String> {
        match self
            .cipher
            .decode(&message.conversation_id, &message.encrypted_content)
        {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("Could not decode message {}: {}", message.id, e);
                None
            }
        }
    }

    /// Display data is decoration; a failed lookup must not fail a write
    /// that already happened.
    async fn sender_profile(&self, sender_id: &str) -> Option<Profile> {
        self.store
            .profiles(&[sender_id.to_string()])
            .await
            .ok()
            .and_then(|p| p.into_iter().next())
    }
}
