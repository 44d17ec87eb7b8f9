//! Durable key/value transport under one fixed cache namespace.
//!
//! Keys are arbitrary strings: the well-known index key, snapshot keys
//! derived from a location id, and media source URLs used verbatim.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

mod disk;
mod memory;

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// The single namespace every offline entry lives under.
pub const CACHE_NAME: &str = "cavetour-offline-v1";

/// Well-known key of the global spot-id → location-id index.
pub const INDEX_KEY: &str = "/offline/index.json";

/// Prefix of per-location snapshot keys.
pub const SNAPSHOT_PREFIX: &str = "/offline/location/";

pub fn snapshot_key(location_id: &str) -> String {
    format!("{SNAPSHOT_PREFIX}{location_id}")
}

/// A stored response: raw body plus the little metadata the transport keeps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl CachedResponse {
    pub fn new(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            url: url.into(),
            status: 200,
            content_type: None,
            body,
        }
    }

    /// Build a JSON entry for metadata keys (index, snapshots).
    pub fn json<T: Serialize>(key: &str, value: &T) -> Result<Self> {
        Ok(Self {
            url: key.to_string(),
            status: 200,
            content_type: Some("application/json".into()),
            body: serde_json::to_vec(value)?,
        })
    }

    pub fn parse_json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Storage backend for one cache namespace.
///
/// Implementations must make `put` a whole-entry replace: a reader sees
/// either the previous entry or the new one, never a mix.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>>;

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()>;

    /// All keys currently stored in the namespace.
    async fn keys(&self) -> Result<Vec<String>>;

    /// Delete the whole namespace. Returns whether anything existed.
    async fn purge(&self) -> Result<bool>;
}
