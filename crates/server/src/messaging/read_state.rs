use agora_shared::validation::validate_id;

use super::{degrade, Listing, Messenger};
use crate::error::{MessagingError, Result};
use crate::models::now_timestamp;
use crate::ws::events::ServerEvent;

impl Messenger {
    /// Reset the caller's unread counter and stamp `last_read_at`. Other
    /// participants are untouched. Returns the new `last_read_at`.
    pub async fn mark_read(&self, conversation_id: &str, user_id: &str) -> Result<String> {
        let conversation = self.load_conversation(conversation_id).await?;
        self.require_participant(&conversation.id, user_id).await?;

        let at = now_timestamp();
        self.store.mark_read(&conversation.id, user_id, &at).await?;

        // Other sessions of the same user clear their badge.
        self.notifier
            .notify(
                user_id,
                ServerEvent::ReadState {
                    conversation_id: conversation.id,
                    last_read_at: at.clone(),
                },
            )
            .await;
        Ok(at)
    }

    /// Badge count: unread messages across the primary inbox, muted
    /// conversations excluded.
    pub async fn unread_total(&self, user_id: &str) -> Result<i64> {
        validate_id("userId", user_id).map_err(MessagingError::Validation)?;
        let listed = self.listed(user_id, Listing::Inbox).await;
        degrade(
            "unread total",
            listed.map(|entries| {
                entries
                    .iter()
                    .filter(|(_, me)| !me.is_muted)
                    .map(|(_, me)| me.unread_count)
                    .sum::<i64>()
            }),
        )
    }
}
