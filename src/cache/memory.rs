use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStore, CachedResponse};
use crate::error::Result;

/// Process-local namespace, used when no durable root is wanted.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CachedResponse>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), response);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn purge(&self) -> Result<bool> {
        let mut guard = self.entries.write().await;
        let existed = !guard.is_empty();
        guard.clear();
        Ok(existed)
    }
}
