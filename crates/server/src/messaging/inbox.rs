use std::collections::HashMap;

use agora_shared::validation::validate_id;

use super::{degrade, Messenger};
use crate::error::{MessagingError, Result};
use crate::models::{Conversation, InboxEntry, LastMessage, Participant, Profile};

/// Which of a user's conversation lists to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    /// Active threads: groups, accepted requests and requests the user sent.
    Inbox,
    /// Pending requests the user has not answered.
    Requests,
}

impl Listing {
    fn includes(self, conversation: &Conversation, user_id: &str) -> bool {
        match self {
            Listing::Inbox => conversation.visible_in_inbox(user_id),
            Listing::Requests => conversation.is_request_for(user_id),
        }
    }
}

impl Messenger {
    pub async fn inbox(&self, user_id: &str) -> Result<Vec<InboxEntry>> {
        self.list(user_id, Listing::Inbox).await
    }

    pub async fn requests(&self, user_id: &str) -> Result<Vec<InboxEntry>> {
        self.list(user_id, Listing::Requests).await
    }

    async fn list(&self, user_id: &str, listing: Listing) -> Result<Vec<InboxEntry>> {
        validate_id("userId", user_id).map_err(MessagingError::Validation)?;
        degrade("conversations", self.build_entries(user_id, listing).await)
    }

    /// The user's memberships in `listing`, paired with their conversation.
    pub(super) async fn listed(
        &self,
        user_id: &str,
        listing: Listing,
    ) -> Result<Vec<(Conversation, Participant)>> {
        let memberships = self.store.active_memberships(user_id).await?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = memberships.iter().map(|p| p.conversation_id.clone()).collect();
        let mut mine: HashMap<String, Participant> = memberships
            .into_iter()
            .map(|p| (p.conversation_id.clone(), p))
            .collect();

        Ok(self
            .store
            .conversations(&ids)
            .await?
            .into_iter()
            .filter(|c| listing.includes(c, user_id))
            .filter_map(|c| mine.remove(&c.id).map(|p| (c, p)))
            .collect())
    }

    /// Facts first (memberships, conversations, participants, latest
    /// messages), then one batched profile read for everyone referenced.
    async fn build_entries(&self, user_id: &str, listing: Listing) -> Result<Vec<InboxEntry>> {
        let listed = self.listed(user_id, listing).await?;
        if listed.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = listed.iter().map(|(c, _)| c.id.clone()).collect();
        let participants = self.store.participants_for(&ids).await?;
        let latest = self.store.latest_messages(&ids).await?;

        let mut other_ids: Vec<String> = participants
            .values()
            .flatten()
            .filter(|p| p.user_id != user_id)
            .map(|p| p.user_id.clone())
            .collect();
        other_ids.sort();
        other_ids.dedup();
        let profiles = self.profile_map(&other_ids).await?;

        let mut entries: Vec<InboxEntry> = listed
            .into_iter()
            .map(|(conversation, me)| {
                let others: Vec<Profile> = participants
                    .get(&conversation.id)
                    .map(|ps| {
                        ps.iter()
                            .filter(|p| p.user_id != user_id)
                            .filter_map(|p| profiles.get(&p.user_id).cloned())
                            .collect()
                    })
                    .unwrap_or_default();
                let last_message = latest.get(&conversation.id).map(LastMessage::from);
                InboxEntry {
                    conversation,
                    participants: others,
                    last_message,
                    unread_count: me.unread_count,
                    is_muted: me.is_muted,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.conversation.activity_at().cmp(a.conversation.activity_at()));
        Ok(entries)
    }
}
