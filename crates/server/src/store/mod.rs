//! The relational collaborator that holds conversations, participants,
//! messages and profiles. The messaging core only talks to it through
//! [`ContentStore`], so tests can swap in [`MemoryStore`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::{Conversation, Message, NewConversation, NewMessage, Participant, Profile, RequestStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Missing relation: {0}")]
    MissingRelation(String),

    #[error("Rejected by store: {0}")]
    Rejected(String),

    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl StoreError {
    /// Errors that mean the collaborator itself is unusable rather than the
    /// request being wrong.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::MissingRelation(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::WorkerCrashed => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Io(io) => StoreError::Unavailable(io.to_string()),
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                if message.contains("no such table") {
                    StoreError::MissingRelation(message)
                } else if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation()
                {
                    StoreError::Rejected(message)
                } else {
                    StoreError::Database(sqlx::Error::Database(db))
                }
            }
            other => StoreError::Database(other),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an atomic find-or-create on the store side.
#[derive(Debug, Clone)]
pub struct DirectResolution {
    pub conversation: Conversation,
    pub created: bool,
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    // Conversations

    /// Insert a conversation plus one participant row per member.
    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation>;

    /// Find-or-create a direct conversation in one atomic step. `Ok(None)`
    /// means the backend cannot do this and the caller must fall back.
    async fn find_or_create_direct(
        &self,
        _new: NewConversation,
    ) -> StoreResult<Option<DirectResolution>> {
        Ok(None)
    }

    async fn conversation(&self, id: &str) -> StoreResult<Option<Conversation>>;

    async fn conversations(&self, ids: &[String]) -> StoreResult<Vec<Conversation>>;

    /// Move the request gate from `from` to `to`. Returns false when the
    /// conversation was no longer in `from`, leaving it untouched.
    async fn transition_request(
        &self,
        id: &str,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<bool>;

    async fn delete_conversation(&self, id: &str) -> StoreResult<()>;

    // Participants

    async fn active_memberships(&self, user_id: &str) -> StoreResult<Vec<Participant>>;

    async fn active_participants(&self, conversation_id: &str) -> StoreResult<Vec<Participant>>;

    /// Active participants of many conversations, keyed by conversation id.
    async fn participants_for(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<Participant>>>;

    /// Adds a member, re-activating a previously left row.
    async fn add_participant(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()>;

    async fn mark_left(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()>;

    async fn set_muted(&self, conversation_id: &str, user_id: &str, muted: bool) -> StoreResult<()>;

    async fn mark_read(&self, conversation_id: &str, user_id: &str, at: &str) -> StoreResult<()>;

    // Messages

    /// Insert the message, bump every other active participant's unread
    /// count and stamp the conversation's activity time.
    async fn append_message(&self, new: NewMessage) -> StoreResult<Message>;

    /// Non-deleted messages, oldest first.
    async fn messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>>;

    async fn message(&self, id: &str) -> StoreResult<Option<Message>>;

    /// Newest non-deleted message of each conversation.
    async fn latest_messages(
        &self,
        conversation_ids: &[String],
    ) -> StoreResult<HashMap<String, Message>>;

    async fn soft_delete_message(&self, id: &str) -> StoreResult<()>;

    async fn edit_message(
        &self,
        id: &str,
        encrypted_content: &str,
        preview: &str,
        at: &str,
    ) -> StoreResult<()>;

    // Profiles

    async fn profiles(&self, ids: &[String]) -> StoreResult<Vec<Profile>>;

    async fn is_following(&self, follower_id: &str, followee_id: &str) -> StoreResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_are_infrastructure() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(err.is_infrastructure());
        assert!(!StoreError::from(sqlx::Error::RowNotFound).is_infrastructure());
        assert!(matches!(
            StoreError::from(sqlx::Error::RowNotFound),
            StoreError::NotFound
        ));
    }
}
