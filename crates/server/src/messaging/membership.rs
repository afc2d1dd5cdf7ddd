use agora_shared::constants::MAX_GROUP_MEMBERS;
use agora_shared::validation::{validate_group_members, validate_group_title, validate_id};

use super::Messenger;
use crate::error::{MessagingError, Result};
use crate::models::{now_timestamp, Conversation, NewConversation};
use crate::ws::events::ServerEvent;

impl Messenger {
    /// Groups skip the request gate and are visible to every member at once.
    pub async fn create_group(
        &self,
        creator_id: &str,
        title: Option<String>,
        member_ids: Vec<String>,
    ) -> Result<Conversation> {
        validate_id("userId", creator_id).map_err(MessagingError::Validation)?;

        let mut members: Vec<String> = member_ids
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && m != creator_id)
            .collect();
        members.sort();
        members.dedup();
        validate_group_members(members.len()).map_err(MessagingError::Validation)?;

        let title = match title {
            Some(t) => {
                validate_group_title(&t).map_err(MessagingError::Validation)?;
                Some(t.trim().to_string())
            }
            None => None,
        };

        if self.store.profiles(&members).await?.len() != members.len() {
            return Err(MessagingError::NotFound("User"));
        }

        let conversation = self
            .store
            .create_conversation(NewConversation::group(creator_id, title, &members))
            .await?;

        for member in &members {
            self.notifier
                .notify(
                    member,
                    ServerEvent::ConversationAdded {
                        conversation_id: conversation.id.clone(),
                        by_user_id: creator_id.to_string(),
                    },
                )
                .await;
        }

        Ok(conversation)
    }

    pub async fn add_member(
        &self,
        conversation_id: &str,
        requester_id: &str,
        user_id: &str,
    ) -> Result<()> {
        validate_id("userId", user_id).map_err(MessagingError::Validation)?;
        let conversation = self.load_conversation(conversation_id).await?;
        if !conversation.is_group {
            return Err(MessagingError::Validation(
                "Members can only be added to group conversations".into(),
            ));
        }

        let participants = self.require_participant(&conversation.id, requester_id).await?;
        if participants.iter().any(|p| p.user_id == user_id) {
            return Err(MessagingError::Conflict("Already a member".into()));
        }
        // The creator is not counted against the member limit.
        if participants.len() > MAX_GROUP_MEMBERS {
            return Err(MessagingError::Validation("Group is full".into()));
        }
        if self.store.profiles(&[user_id.to_string()]).await?.is_empty() {
            return Err(MessagingError::NotFound("User"));
        }

        self.store
            .add_participant(&conversation.id, user_id, &now_timestamp())
            .await?;

        self.notifier
            .notify(
                user_id,
                ServerEvent::ConversationAdded {
                    conversation_id: conversation.id,
                    by_user_id: requester_id.to_string(),
                },
            )
            .await;
        Ok(())
    }

    /// Soft leave: the participant row stays with `left_at` set.
    pub async fn leave_conversation(&self, conversation_id: &str, user_id: &str) -> Result<()> {
        let conversation = self.load_conversation(conversation_id).await?;
        self.require_participant(&conversation.id, user_id).await?;
        self.store
            .mark_left(&conversation.id, user_id, &now_timestamp())
            .await?;
        Ok(())
    }

    pub async fn set_muted(&self, conversation_id: &str, user_id: &str, muted: bool) -> Result<()> {
        let conversation = self.load_conversation(conversation_id).await?;
        self.require_participant(&conversation.id, user_id).await?;
        self.store.set_muted(&conversation.id, user_id, muted).await?;
        Ok(())
    }
}
