mod broadcast;

use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

pub type ClientId = u64;

pub struct ConnectedClient {
    pub user_id: String,
    pub tx: mpsc::UnboundedSender<String>,
}

/// Registry of live WebSocket sessions. A user may hold several.
pub struct GatewayState {
    next_id: RwLock<u64>,
    pub clients: RwLock<HashMap<ClientId, ConnectedClient>>,
}

impl Default for GatewayState {
    fn default() -> Self {
        Self::new()
    }
}

impl GatewayState {
    pub fn new() -> Self {
        Self {
            next_id: RwLock::new(1),
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub async fn next_client_id(&self) -> ClientId {
        let mut id = self.next_id.write().await;
        let current = *id;
        *id += 1;
        current
    }

    pub async fn register(
        &self,
        client_id: ClientId,
        user_id: String,
        tx: mpsc::UnboundedSender<String>,
    ) {
        self.clients
            .write()
            .await
            .insert(client_id, ConnectedClient { user_id, tx });
    }

    pub async fn unregister(&self, client_id: ClientId) -> Option<ConnectedClient> {
        self.clients.write().await.remove(&client_id)
    }

    pub async fn session_count(&self, user_id: &str) -> usize {
        self.clients
            .read()
            .await
            .values()
            .filter(|c| c.user_id == user_id)
            .count()
    }
}
