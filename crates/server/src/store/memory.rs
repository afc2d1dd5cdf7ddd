use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{ContentStore, StoreError, StoreResult};
use crate::models::{Conversation, Message, NewConversation, NewMessage, Participant, Profile, RequestStatus};

#[derive(Default)]
struct Tables {
    conversations: Vec<Conversation>,
    participants: Vec<Participant>,
    messages: Vec<Message>,
    profiles: HashMap<String, Profile>,
    follows: HashSet<(String, String)>,
}

/// In-process store. It has no atomic find-or-create, so the resolver's
/// scan-then-create path runs against it.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    participants_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_profile(&self, id: &str, username: &str) {
        self.tables.write().await.profiles.insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                username: username.to_string(),
                display_name: None,
                avatar_url: None,
            },
        );
    }

    pub async fn follow(&self, follower_id: &str, followee_id: &str) {
        self.tables
            .write()
            .await
            .follows
            .insert((follower_id.to_string(), followee_id.to_string()));
    }

    /// Make every call fail as if the backend were unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Fail only participant listings, leaving message reads and writes up.
    pub fn set_participants_unavailable(&self, unavailable: bool) {
        self.participants_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn participant(&self, conversation_id: &str, user_id: &str) -> Option<Participant> {
        self.tables
            .read()
            .await
            .participants
            .iter()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id)
            .cloned()
    }

    pub async fn conversation_count(&self) -> usize {
        self.tables.read().await.conversations.len()
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        Ok(())
    }
}

impl Tables {
    fn active_participant_mut(&mut self, conversation_id: &str, user_id: &str) -> StoreResult<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id && p.is_active())
            .ok_or(StoreError::NotFound)
    }

    fn conversation_mut(&mut self, id: &str) -> StoreResult<&mut Conversation> {
        self.conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(StoreError::NotFound)
    }

    fn message_mut(&mut self, id: &str) -> StoreResult<&mut Message> {
        self.messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        self.check()?;
        let mut tables = self.tables.write().await;
        if let Some(key) = new.direct_key() {
            if tables
                .conversations
                .iter()
                .any(|c| c.direct_key.as_deref() == Some(key.as_str()))
            {
                return Err(StoreError::Rejected("duplicate direct conversation".into()));
            }
        }
        for user_id in &new.participant_ids {
            tables.participants.push(Participant {
                conversation_id: new.id.clone(),
                user_id: user_id.clone(),
                joined_at: new.created_at.clone(),
                left_at: None,
                is_muted: false,
                last_read_at: None,
                unread_count: 0,
            });
        }
        let conversation = new.into_conversation();
        tables.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn conversation(&self, id: &str) -> StoreResult<Option<Conversation>> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn conversations(&self, ids: &[String]) -> StoreResult<Vec<Conversation>> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .conversations
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect())
    }

    async fn transition_request(
        &self,
        id: &str,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let conversation = tables.conversation_mut(id)?;
        if conversation.request_status != from {
            return Ok(false);
        }
        conversation.request_status = to;
        conversation.updated_at = crate::models::now_timestamp();
        Ok(true)
    }

    async fn delete_conversation(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.conversations.len();
        tables.conversations.retain(|c| c.id != id);
        if tables.conversations.len() == before {
            return Err(StoreError::NotFound);
        }
        tables.participants.retain(|p| p.conversation_id != id);
        tables.messages.retain(|m| m.conversation_id != id);
        Ok(())
    }

    async fn active_memberships(&self, user_id: &str) -> StoreResult<Vec<Participant>> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .participants
            .iter()
            .filter(|p| p.user_id == user_id && p.is_active())
            .cloned()
            .collect())
    }

    async fn active_participants(&self, conversation_id: &str) -> StoreResult<Vec<Participant>> {
        self.check()?;
        if self.participants_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("participant listing offline".into()));
        }
        Ok(self
            .tables
            .read()
            .await
            .participants
            .iter()
            .filter(|p| p.conversation_id == conversation_id && p.is_active())
            .cloned()
            .collect())
    }

    async fn participants_for(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<Participant>>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut map: HashMap<String, Vec<Participant>> = HashMap::new();
        for participant in tables
            .participants
            .iter()
            .filter(|p| p.is_active() && conversation_ids.contains(&p.conversation_id))
        {
            map.entry(participant.conversation_id.clone())
                .or_default()
                .push(participant.clone());
        }
        Ok(map)
    }

    async fn add_participant(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        match tables
            .participants
            .iter_mut()
            .find(|p| p.conversation_id == conversation_id && p.user_id == user_id)
        {
            Some(existing) => {
                existing.left_at = None;
                existing.joined_at = at.to_string();
                existing.unread_count = 0;
            }
            None => tables.participants.push(Participant {
                conversation_id: conversation_id.to_string(),
                user_id: user_id.to_string(),
                joined_at: at.to_string(),
                left_at: None,
                is_muted: false,
                last_read_at: None,
                unread_count: 0,
            }),
        }
        Ok(())
    }

    async fn mark_left(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables.active_participant_mut(conversation_id, user_id)?.left_at = Some(at.to_string());
        let conversation = tables.conversation_mut(conversation_id)?;
        if !conversation.is_group {
            conversation.direct_key = None;
        }
        Ok(())
    }

    async fn set_muted(&self, conversation_id: &str, user_id: &str, muted: bool) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        tables.active_participant_mut(conversation_id, user_id)?.is_muted = muted;
        Ok(())
    }

    async fn mark_read(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let participant = tables.active_participant_mut(conversation_id, user_id)?;
        participant.last_read_at = Some(at.to_string());
        participant.unread_count = 0;
        Ok(())
    }

    async fn append_message(&self, new: NewMessage) -> StoreResult<Message> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let conversation = tables.conversation_mut(&new.conversation_id)?;
        conversation.last_message_at = Some(new.created_at.clone());
        conversation.updated_at = new.created_at.clone();

        for participant in tables.participants.iter_mut().filter(|p| {
            p.conversation_id == new.conversation_id && p.user_id != new.sender_id && p.is_active()
        }) {
            participant.unread_count += 1;
        }

        let message = new.into_message();
        tables.messages.push(message.clone());
        Ok(message)
    }

    async fn messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        self.check()?;
        let mut messages: Vec<Message> = self
            .tables
            .read()
            .await
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && !m.is_deleted)
            .cloned()
            .collect();
        // Stable sort keeps insertion order for equal timestamps.
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn message(&self, id: &str) -> StoreResult<Option<Message>> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn latest_messages(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Message>> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut latest: HashMap<String, Message> = HashMap::new();
        for message in tables
            .messages
            .iter()
            .filter(|m| !m.is_deleted && conversation_ids.contains(&m.conversation_id))
        {
            match latest.get(&message.conversation_id) {
                Some(current) if current.created_at > message.created_at => {}
                _ => {
                    latest.insert(message.conversation_id.clone(), message.clone());
                }
            }
        }
        Ok(latest)
    }

    async fn soft_delete_message(&self, id: &str) -> StoreResult<()> {
        self.check()?;
        self.tables.write().await.message_mut(id)?.is_deleted = true;
        Ok(())
    }

    async fn edit_message(
        &self,
        id: &str,
        encrypted_content: &str,
        preview: &str,
        at: &str,
    ) -> StoreResult<()> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let message = tables.message_mut(id)?;
        if message.is_deleted {
            return Err(StoreError::NotFound);
        }
        message.encrypted_content = encrypted_content.to_string();
        message.preview = preview.to_string();
        message.is_edited = true;
        message.edited_at = Some(at.to_string());
        Ok(())
    }

    async fn profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.profiles.get(id).cloned())
            .collect())
    }

    async fn is_following(&self, follower_id: &str, followee_id: &str) -> StoreResult<bool> {
        self.check()?;
        Ok(self
            .tables
            .read()
            .await
            .follows
            .contains(&(follower_id.to_string(), followee_id.to_string())))
    }
}
