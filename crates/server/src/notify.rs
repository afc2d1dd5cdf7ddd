//! Outbound notifications from the messaging core. The core never looks a
//! sink up on its own; one is handed to [`crate::messaging::Messenger`].

use async_trait::async_trait;

use crate::ws::events::ServerEvent;

#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Fire-and-forget delivery to every live session of `user_id`.
    async fn notify(&self, user_id: &str, event: ServerEvent);
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Drops everything.
    pub struct NullSink;

    #[async_trait]
    impl NotificationSink for NullSink {
        async fn notify(&self, _user_id: &str, _event: ServerEvent) {}
    }

    /// Keeps every notification for assertions.
    #[derive(Default)]
    pub struct RecordingSink {
        pub events: Mutex<Vec<(String, ServerEvent)>>,
    }

    impl RecordingSink {
        pub async fn for_user(&self, user_id: &str) -> Vec<ServerEvent> {
            self.events
                .lock()
                .await
                .iter()
                .filter(|(u, _)| u == user_id)
                .map(|(_, e)| e.clone())
                .collect()
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, user_id: &str, event: ServerEvent) {
            self.events.lock().await.push((user_id.to_string(), event));
        }
    }
}
