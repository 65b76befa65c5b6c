//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the configuration, the file store, the Open5e client and the
//! player-view relay. All fields are `Arc`-wrapped or cheaply cloneable.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::monsters::Open5eClient;
use crate::relay::Relay;
use crate::store::Store;

/// Clone is required by Axum.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<Store>,
    pub monsters: Arc<Open5eClient>,
    pub relay: Relay,
}

impl AppState {
    #[must_use]
    pub fn new(config: ServerConfig, store: Store, monsters: Open5eClient) -> Self {
        let relay = Relay::new(config.viewer_channel_capacity);
        Self { config: Arc::new(config), store: Arc::new(store), monsters: Arc::new(monsters), relay }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// App state over a fresh temp data directory. The Open5e client points
    /// at a closed port.
    pub async fn test_app_state() -> AppState {
        let dir = std::env::temp_dir().join(format!("battlemap-test-{}", uuid::Uuid::new_v4()));
        let config = ServerConfig { data_dir: dir.clone(), max_map_dimension: 64, ..ServerConfig::default() };
        let store = Store::open(dir, config.max_map_dimension).await.expect("store should open");
        let monsters = Open5eClient::new("http://127.0.0.1:9").expect("client should build");
        AppState::new(config, store, monsters)
    }
}
