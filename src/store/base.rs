use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{file_store::FileStore, memory_store::MemoryStore};
use crate::config::StoreConfig;

/// Durable string key-value slots. Each call is atomic from the caller's view.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, String>;
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;
    /// Removing an absent key succeeds.
    async fn remove(&self, key: &str) -> Result<(), String>;
    fn is_durable(&self) -> bool {
        // Real stores survive a restart; the memory store overrides this
        // so we can write better debug messages
        true
    }
}

/// Creates a concrete store implementation based on the StoreConfig.
pub fn create_store(config: &StoreConfig) -> Arc<dyn Store> {
    match config {
        StoreConfig::File(file_config) => {
            let path = file_config.resolved_path();
            info!("Using file token store at '{}'", path.display());
            Arc::new(FileStore::new(path))
        }
        StoreConfig::Memory => {
            info!("Using in-memory token store; the session will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
    }
}
