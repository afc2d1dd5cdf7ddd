use serde::{Deserialize, Serialize};
use std::fmt;

use super::{LastMessage, Profile};

/// Request gate state of a direct conversation. Groups are stored as
/// `Accepted` and never leave it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
}

impl RequestStatus {
    /// Accepted and declined are terminal.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Declined)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub is_group: bool,
    pub title: Option<String>,
    pub created_by: String,
    pub request_status: RequestStatus,
    #[serde(skip)]
    pub direct_key: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub last_message_at: Option<String>,
}

impl Conversation {
    /// Whether `user_id` (an active participant) sees this conversation in
    /// their primary inbox.
    pub fn visible_in_inbox(&self, user_id: &str) -> bool {
        if self.is_group {
            return true;
        }
        match self.request_status {
            RequestStatus::Accepted => true,
            RequestStatus::Pending => self.created_by == user_id,
            RequestStatus::Declined => false,
        }
    }

    /// Whether this is a pending request awaiting `user_id`'s answer.
    pub fn is_request_for(&self, user_id: &str) -> bool {
        !self.is_group
            && self.request_status == RequestStatus::Pending
            && self.created_by != user_id
    }

    /// Key used to order inbox entries, newest activity first.
    pub fn activity_at(&self) -> &str {
        self.last_message_at.as_deref().unwrap_or(&self.created_at)
    }
}

/// Unordered pair key for a direct conversation.
pub fn direct_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}:{}", a, b)
    } else {
        format!("{}:{}", b, a)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub conversation_id: String,
    pub user_id: String,
    pub joined_at: String,
    pub left_at: Option<String>,
    pub is_muted: bool,
    pub last_read_at: Option<String>,
    pub unread_count: i64,
}

impl Participant {
    pub fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Insert payload for a conversation and its initial participant rows.
#[derive(Debug, Clone)]
pub struct NewConversation {
    pub id: String,
    pub is_group: bool,
    pub title: Option<String>,
    pub created_by: String,
    pub request_status: RequestStatus,
    pub participant_ids: Vec<String>,
    pub created_at: String,
}

impl NewConversation {
    pub fn direct(initiator: &str, recipient: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            is_group: false,
            title: None,
            created_by: initiator.to_string(),
            request_status: RequestStatus::Pending,
            participant_ids: vec![initiator.to_string(), recipient.to_string()],
            created_at: super::now_timestamp(),
        }
    }

    pub fn group(creator: &str, title: Option<String>, members: &[String]) -> Self {
        let mut participant_ids = vec![creator.to_string()];
        participant_ids.extend(members.iter().cloned());
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            is_group: true,
            title,
            created_by: creator.to_string(),
            request_status: RequestStatus::Accepted,
            participant_ids,
            created_at: super::now_timestamp(),
        }
    }

    pub fn direct_key(&self) -> Option<String> {
        match (self.is_group, self.participant_ids.as_slice()) {
            (false, [a, b]) => Some(direct_key(a, b)),
            _ => None,
        }
    }

    pub fn into_conversation(self) -> Conversation {
        let direct_key = self.direct_key();
        Conversation {
            id: self.id,
            is_group: self.is_group,
            title: self.title,
            created_by: self.created_by,
            request_status: self.request_status,
            direct_key,
            created_at: self.created_at.clone(),
            updated_at: self.created_at,
            last_message_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub conversation_id: String,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxEntry {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub participants: Vec<Profile>,
    pub last_message: Option<LastMessage>,
    pub unread_count: i64,
    pub is_muted: bool,
}
