use async_trait::async_trait;

use super::{ClientId, ConnectedClient, GatewayState};
use crate::notify::NotificationSink;
use crate::ws::events::ServerEvent;

impl GatewayState {
    /// Reply to a single session, e.g. with an error for a frame it sent.
    pub async fn send_to(&self, client_id: ClientId, event: &ServerEvent) -> bool {
        self.deliver(event, |id, _| id == client_id).await > 0
    }

    /// Serializes `event` once and queues it on every session `target`
    /// selects. Returns how many queues took it; closed ones are skipped.
    async fn deliver<F>(&self, event: &ServerEvent, target: F) -> usize
    where
        F: Fn(ClientId, &ConnectedClient) -> bool,
    {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!("Failed to encode gateway event: {}", e);
                return 0;
            }
        };

        let clients = self.clients.read().await;
        clients
            .iter()
            .filter(|(id, client)| target(**id, *client))
            .filter(|(_, client)| client.tx.send(frame.clone()).is_ok())
            .count()
    }
}

#[async_trait]
impl NotificationSink for GatewayState {
    async fn notify(&self, user_id: &str, event: ServerEvent) {
        let delivered = self.deliver(&event, |_, client| client.user_id == user_id).await;
        if delivered == 0 {
            tracing::debug!("No live session for {}, event dropped", user_id);
        }
    }
}
