use super::Messenger;
use crate::error::{MessagingError, Result};
use crate::models::{Conversation, RequestStatus};
use crate::ws::events::ServerEvent;

impl Messenger {
    pub async fn accept(&self, conversation_id: &str, user_id: &str) -> Result<Conversation> {
        self.respond(conversation_id, user_id, RequestStatus::Accepted)
            .await
    }

    pub async fn decline(&self, conversation_id: &str, user_id: &str) -> Result<Conversation> {
        self.respond(conversation_id, user_id, RequestStatus::Declined)
            .await
    }

    /// Permanently remove a request the caller declined earlier. Active
    /// threads can never be deleted this way.
    pub async fn delete_declined(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let conversation = self.load_as_recipient(conversation_id, user_id).await?;
        if conversation.request_status != RequestStatus::Declined {
            return Err(MessagingError::Conflict(
                "Only declined requests can be deleted".into(),
            ));
        }
        self.store.delete_conversation(&conversation.id).await?;
        tracing::info!("Deleted declined conversation {}", conversation.id);
        Ok(())
    }

    async fn respond(
        &self,
        conversation_id: &str,
        user_id: &str,
        next: RequestStatus,
    ) -> Result<Conversation> {
        let mut conversation = self.load_as_recipient(conversation_id, user_id).await?;
        let current = conversation.request_status;
        if !current.can_transition_to(next) {
            return Err(MessagingError::InvalidTransition {
                from: current,
                to: next,
            });
        }

        // Concurrent answers race on the stored status; only one of them lands.
        let applied = self
            .store
            .transition_request(&conversation.id, current, next)
            .await?;
        if !applied {
            let actual = self.load_conversation(&conversation.id).await?.request_status;
            return Err(MessagingError::InvalidTransition {
                from: actual,
                to: next,
            });
        }
        conversation.request_status = next;

        if next == RequestStatus::Accepted {
            self.notifier
                .notify(
                    &conversation.created_by,
                    ServerEvent::ConversationAccepted {
                        conversation_id: conversation.id.clone(),
                        by_user_id: user_id.to_string(),
                    },
                )
                .await;
        }
        Ok(conversation)
    }

    /// The gate is answered by the direct conversation's recipient only.
    async fn load_as_recipient(&self, conversation_id: &str, user_id: &str) -> Result<Conversation> {
        let conversation = self.load_conversation(conversation_id).await?;
        if conversation.is_group {
            return Err(MessagingError::Validation(
                "Group conversations have no request to answer".into(),
            ));
        }
        self.require_participant(&conversation.id, user_id).await?;
        if conversation.created_by == user_id {
            return Err(MessagingError::Forbidden(
                "Only the recipient can answer a request".into(),
            ));
        }
        Ok(conversation)
    }
}
