use crate::config::ServerConfig;
use crate::storage::ArtifactStore;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub store: Arc<dyn ArtifactStore>,
    /// One permit per conversion allowed to run at the same time.
    pub conversions: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: ServerConfig, store: Arc<dyn ArtifactStore>) -> Self {
        let permits = config.max_concurrent_conversions.max(1);
        Self {
            config: Arc::new(config),
            store,
            conversions: Arc::new(Semaphore::new(permits)),
        }
    }
}
