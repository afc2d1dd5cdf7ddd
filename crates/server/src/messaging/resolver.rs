use agora_shared::validation::validate_id;

use super::Messenger;
use crate::error::{MessagingError, Result};
use crate::models::{NewConversation, Resolution};
use crate::ws::events::ServerEvent;

impl Messenger {
    /// Find the direct conversation between two users or open a new one in
    /// the pending state.
    pub async fn resolve_conversation(&self, self_id: &str, other_id: &str) -> Result<Resolution> {
        validate_id("userId", self_id).map_err(MessagingError::Validation)?;
        validate_id("userId", other_id).map_err(MessagingError::Validation)?;
        if self_id == other_id {
            return Err(MessagingError::Validation(
                "Cannot start a conversation with yourself".into(),
            ));
        }

        if self.store.profiles(&[other_id.to_string()]).await?.is_empty() {
            return Err(MessagingError::NotFound("User"));
        }

        self.check_follow(self_id, other_id).await;

        let new = NewConversation::direct(self_id, other_id);
        let resolution = match self.store.find_or_create_direct(new.clone()).await? {
            Some(found) => Resolution {
                conversation_id: found.conversation.id,
                created: found.created,
            },
            None => self.scan_or_create(new).await?,
        };

        if resolution.created {
            tracing::info!(
                "Opened conversation {} from {} to {}",
                resolution.conversation_id,
                self_id,
                other_id
            );
            self.notifier
                .notify(
                    other_id,
                    ServerEvent::ConversationRequest {
                        conversation_id: resolution.conversation_id.clone(),
                        from_user_id: self_id.to_string(),
                    },
                )
                .await;
        }

        Ok(resolution)
    }

    /// Fallback for stores without atomic find-or-create. Holding the pair
    /// lock across scan and insert keeps this process from creating twice.
    async fn scan_or_create(&self, new: NewConversation) -> Result<Resolution> {
        let (self_id, other_id) = (new.participant_ids[0].clone(), new.participant_ids[1].clone());
        let _guard = self.pair_locks.lock(&self_id, &other_id).await;

        if let Some(conversation_id) = self.find_direct(&self_id, &other_id).await? {
            return Ok(Resolution {
                conversation_id,
                created: false,
            });
        }

        let conversation = self.store.create_conversation(new).await?;
        Ok(Resolution {
            conversation_id: conversation.id,
            created: true,
        })
    }

    async fn find_direct(&self, self_id: &str, other_id: &str) -> Result<Option<String>> {
        let memberships = self.store.active_memberships(self_id).await?;
        if memberships.is_empty() {
            return Ok(None);
        }

        let ids: Vec<String> = memberships.into_iter().map(|p| p.conversation_id).collect();
        let direct_ids: Vec<String> = self
            .store
            .conversations(&ids)
            .await?
            .into_iter()
            .filter(|c| !c.is_group)
            .map(|c| c.id)
            .collect();

        let participants = self.store.participants_for(&direct_ids).await?;
        Ok(direct_ids.into_iter().find(|id| {
            participants
                .get(id)
                .is_some_and(|ps| ps.iter().any(|p| p.user_id == other_id))
        }))
    }

    /// Messaging does not require a follow; a missing edge is only logged.
    async fn check_follow(&self, self_id: &str, other_id: &str) {
        match self.store.is_following(self_id, other_id).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                "{} does not follow {}, opening conversation anyway",
                self_id,
                other_id
            ),
            Err(e) => tracing::warn!("Follow check failed, continuing: {}", e),
        }
    }
}
