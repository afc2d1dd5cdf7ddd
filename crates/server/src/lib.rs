pub mod config;
pub mod db;
pub mod error;
pub mod messaging;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod routes;
pub mod store;
pub mod ws;

use config::Config;
use messaging::cipher::ReversibleEncoding;
use messaging::Messenger;
use std::sync::Arc;
use store::SqliteStore;
use ws::gateway::GatewayState;

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub gateway: Arc<GatewayState>,
    pub messenger: Messenger,
}

impl AppState {
    /// Wire the messaging core onto the pool, with live sessions as the
    /// notification sink.
    pub fn new(db: sqlx::SqlitePool, config: Config) -> Self {
        let gateway = Arc::new(GatewayState::new());
        let messenger = Messenger::new(
            Arc::new(SqliteStore::new(db.clone())),
            Arc::new(ReversibleEncoding::new(&config.cipher_secret)),
            gateway.clone(),
        );
        Self {
            db,
            config,
            gateway,
            messenger,
        }
    }
}
