//! The messaging core: conversation resolution, the message channel, read
//! state and the request gate. Everything goes through [`Messenger`], which
//! owns its collaborators explicitly.

pub mod cipher;
mod channel;
mod inbox;
mod membership;
mod read_state;
mod requests;
mod resolver;

pub use inbox::Listing;

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use agora_shared::validation::validate_id;

use crate::error::{MessagingError, Result};
use crate::models::{direct_key, Conversation, Participant, Profile};
use crate::notify::NotificationSink;
use crate::store::ContentStore;
use crate::ws::events::ServerEvent;
use cipher::MessageCipher;

#[derive(Clone)]
pub struct Messenger {
    store: Arc<dyn ContentStore>,
    cipher: Arc<dyn MessageCipher>,
    notifier: Arc<dyn NotificationSink>,
    pair_locks: Arc<PairLocks>,
}

impl Messenger {
    pub fn new(
        store: Arc<dyn ContentStore>,
        cipher: Arc<dyn MessageCipher>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            cipher,
            notifier,
            pair_locks: Arc::new(PairLocks::default()),
        }
    }

    async fn load_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        validate_id("conversationId", conversation_id).map_err(MessagingError::Validation)?;
        self.store
            .conversation(conversation_id)
            .await?
            .ok_or(MessagingError::NotFound("Conversation"))
    }

    /// Active participants of the conversation, provided `user_id` is one.
    async fn require_participant(
        &self,
        conversation_id: &str,
        user_id: &str,
    ) -> Result<Vec<Participant>> {
        let participants = self.store.active_participants(conversation_id).await?;
        if !participants.iter().any(|p| p.user_id == user_id) {
            return Err(MessagingError::Forbidden("Not a participant".into()));
        }
        Ok(participants)
    }

    async fn profile_map(&self, ids: &[String]) -> Result<HashMap<String, Profile>> {
        Ok(self
            .store
            .profiles(ids)
            .await?
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect())
    }

    async fn notify_others(&self, participants: &[Participant], except: &str, event: ServerEvent) {
        for participant in participants.iter().filter(|p| p.user_id != except) {
            self.notifier
                .notify(&participant.user_id, event.clone())
                .await;
        }
    }
}

/// Reads degrade to an empty result when the store is unreachable so the
/// caller shows nothing instead of failing.
fn degrade<T: Default>(what: &str, result: Result<T>) -> Result<T> {
    match result {
        Err(MessagingError::Unavailable(e)) => {
            tracing::warn!("Returning empty {}: {}", what, e);
            Ok(T::default())
        }
        other => other,
    }
}

/// Serialises conversation creation per unordered user pair for stores
/// without an atomic find-or-create.
#[derive(Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub async fn lock(&self, a: &str, b: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks.entry(direct_key(a, b)).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::notify::testing::RecordingSink;
    use crate::store::MemoryStore;
    use cipher::ReversibleEncoding;

    pub struct Harness {
        pub messenger: Messenger,
        pub store: Arc<MemoryStore>,
        pub sink: Arc<RecordingSink>,
    }

    pub async fn harness(users: &[&str]) -> Harness {
        let store = Arc::new(MemoryStore::new());
        for user in users {
            store.insert_profile(user, user).await;
        }
        let sink = Arc::new(RecordingSink::default());
        let messenger = Messenger::new(
            store.clone(),
            Arc::new(ReversibleEncoding::new("test-secret")),
            sink.clone(),
        );
        Harness {
            messenger,
            store,
            sink,
        }
    }
}
