//! Offline content cache: per-location snapshots, the global spot index and
//! media blobs, all inside one cache namespace.
//!
//! A save writes the index first and the snapshot second. A crash between
//! the two leaves index entries without a snapshot; the resolver treats
//! those as plain misses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{snapshot_key, CacheStore, CachedResponse, INDEX_KEY, SNAPSHOT_PREFIX};
use crate::error::Result;
use crate::media::MediaFetcher;
use crate::model::{Location, OfflineSnapshot, Spot};
use crate::report::ErrorReporter;
use crate::util::now_millis;

/// Global spot-id → location-id lookup table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OfflineIndex(pub BTreeMap<String, String>);

impl OfflineIndex {
    /// Point every given spot at `location_id`, keeping all other entries.
    pub fn merge_location(&mut self, location_id: &str, spots: &[Spot]) {
        for spot in spots {
            self.0.insert(spot.id.clone(), location_id.to_string());
        }
    }

    pub fn location_for(&self, spot_id: &str) -> Option<&str> {
        self.0.get(spot_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Read the index entry; `None` when it has never been written.
pub(crate) async fn read_index(store: &dyn CacheStore) -> Result<Option<OfflineIndex>> {
    match store.get(INDEX_KEY).await? {
        Some(entry) => Ok(Some(entry.parse_json()?)),
        None => Ok(None),
    }
}

pub(crate) async fn read_snapshot(
    store: &dyn CacheStore,
    location_id: &str,
) -> Result<Option<OfflineSnapshot>> {
    match store.get(&snapshot_key(location_id)).await? {
        Some(entry) => Ok(Some(entry.parse_json()?)),
        None => Ok(None),
    }
}

/// Outcome of one media caching pass. Logged, never shown as partial success.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MediaReport {
    pub cached: usize,
    pub failed: Vec<String>,
    /// Fetched after a clear and therefore not stored.
    pub discarded: usize,
}

/// Returned once a location's metadata is durable. Media keeps caching in
/// the background; await `media` to wait for it, or drop the receipt.
pub struct SaveReceipt {
    pub location_id: String,
    pub spot_count: usize,
    pub media: JoinHandle<MediaReport>,
}

/// Listing row for a cached location.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineLocationSummary {
    pub id: String,
    pub name: String,
    pub spot_count: usize,
    pub timestamp: u64,
}

pub struct OfflineCache {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn MediaFetcher>,
    reporter: Arc<dyn ErrorReporter>,
    // Serializes every write. Holds the cache generation, bumped by each
    // clear; media fetched under an older generation is dropped.
    writer: Arc<Mutex<u64>>,
}

impl OfflineCache {
    pub fn new(
        store: Arc<dyn CacheStore>,
        fetcher: Arc<dyn MediaFetcher>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> Self {
        Self {
            store,
            fetcher,
            reporter,
            writer: Arc::new(Mutex::new(0)),
        }
    }

    pub fn store(&self) -> Arc<dyn CacheStore> {
        self.store.clone()
    }

    pub fn reporter(&self) -> Arc<dyn ErrorReporter> {
        self.reporter.clone()
    }

    /// Persist `location` and its complete spot list for offline use.
    ///
    /// The caller fetches both fresh from the content store first. Any
    /// previous snapshot of the location is replaced, never merged.
    pub async fn save_location_for_offline(
        &self,
        location: &Location,
        spots: &[Spot],
    ) -> Result<SaveReceipt> {
        let generation = {
            let guard = self.writer.lock().await;

            let mut index = read_index(self.store.as_ref()).await?.unwrap_or_default();
            index.merge_location(&location.id, spots);
            self.store
                .put(INDEX_KEY, CachedResponse::json(INDEX_KEY, &index)?)
                .await?;

            let key = snapshot_key(&location.id);
            let snapshot = OfflineSnapshot {
                location: location.clone(),
                spots: spots.to_vec(),
                timestamp: now_millis(),
            };
            self.store
                .put(&key, CachedResponse::json(&key, &snapshot)?)
                .await?;
            *guard
        };

        info!(
            location_id = %location.id,
            spots = spots.len(),
            "location saved for offline use"
        );

        let urls = media_urls(location, spots);
        let store = self.store.clone();
        let fetcher = self.fetcher.clone();
        let reporter = self.reporter.clone();
        let writer = self.writer.clone();
        let media = tokio::spawn(async move {
            cache_media(
                store.as_ref(),
                fetcher.as_ref(),
                reporter.as_ref(),
                (writer.as_ref(), generation),
                urls,
            )
            .await
        });

        Ok(SaveReceipt {
            location_id: location.id.clone(),
            spot_count: spots.len(),
            media,
        })
    }

    /// Fetch and store every URL. One failing URL never stops the others.
    pub async fn cache_media_files(&self, urls: Vec<String>) -> MediaReport {
        let generation = *self.writer.lock().await;
        cache_media(
            self.store.as_ref(),
            self.fetcher.as_ref(),
            self.reporter.as_ref(),
            (self.writer.as_ref(), generation),
            urls,
        )
        .await
    }

    /// The stored snapshot, or `None` when absent or unreadable.
    pub async fn get_offline_location_data(&self, location_id: &str) -> Option<OfflineSnapshot> {
        match read_snapshot(self.store.as_ref(), location_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.reporter.report("get_offline_location_data", &e);
                None
            }
        }
    }

    pub async fn is_location_available_offline(&self, location_id: &str) -> bool {
        match self.store.get(&snapshot_key(location_id)).await {
            Ok(entry) => entry.is_some(),
            Err(e) => {
                self.reporter.report("is_location_available_offline", &e);
                false
            }
        }
    }

    /// Delete snapshots, index and media in one go. There is no per-location
    /// eviction. Media still being fetched by earlier saves is not stored.
    pub async fn clear_offline_cache(&self) -> Result<()> {
        let mut generation = self.writer.lock().await;
        *generation += 1;
        let existed = self.store.purge().await?;
        info!(existed, "offline cache cleared");
        Ok(())
    }

    /// Low-level lookup of any cached entry by its exact URL.
    pub async fn get_cached_asset(&self, url: impl AsRef<str>) -> Option<CachedResponse> {
        match self.store.get(url.as_ref()).await {
            Ok(entry) => entry,
            Err(e) => {
                self.reporter.report("get_cached_asset", &e);
                None
            }
        }
    }

    /// Every cached location, sorted by name.
    pub async fn offline_locations(&self) -> Vec<OfflineLocationSummary> {
        let keys = match self.store.keys().await {
            Ok(keys) => keys,
            Err(e) => {
                self.reporter.report("offline_locations", &e);
                return Vec::new();
            }
        };

        let mut summaries = Vec::new();
        for key in keys {
            let Some(location_id) = key.strip_prefix(SNAPSHOT_PREFIX) else {
                continue;
            };
            if let Some(snapshot) = self.get_offline_location_data(location_id).await {
                summaries.push(OfflineLocationSummary {
                    id: snapshot.location.id,
                    name: snapshot.location.name,
                    spot_count: snapshot.spots.len(),
                    timestamp: snapshot.timestamp,
                });
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        summaries
    }
}

/// Non-blank cover and spot image URLs, deduplicated and kept verbatim:
/// the exact source string is the cache key. Audio is not pre-fetched.
pub fn media_urls(location: &Location, spots: &[Spot]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    std::iter::once(location.cover_image.as_str())
        .chain(spots.iter().map(|s| s.image_url.as_str()))
        .filter(|url| !url.trim().is_empty())
        .filter(|url| seen.insert(url.to_string()))
        .map(str::to_string)
        .collect()
}

enum Stored {
    Cached,
    Discarded,
}

async fn cache_media(
    store: &dyn CacheStore,
    fetcher: &dyn MediaFetcher,
    reporter: &dyn ErrorReporter,
    (writer, generation): (&Mutex<u64>, u64),
    urls: Vec<String>,
) -> MediaReport {
    let results = join_all(urls.into_iter().map(|url| async move {
        let outcome = match fetcher.fetch(&url).await {
            Ok(response) => {
                let current = writer.lock().await;
                if *current == generation {
                    store.put(&url, response).await.map(|()| Stored::Cached)
                } else {
                    Ok(Stored::Discarded)
                }
            }
            Err(e) => Err(e),
        };
        (url, outcome)
    }))
    .await;

    let mut report = MediaReport::default();
    for (url, outcome) in results {
        match outcome {
            Ok(Stored::Cached) => report.cached += 1,
            Ok(Stored::Discarded) => report.discarded += 1,
            Err(e) => {
                reporter.report(&format!("cache_media_files: {url}"), &e);
                report.failed.push(url);
            }
        }
    }
    debug!(
        cached = report.cached,
        failed = report.failed.len(),
        discarded = report.discarded,
        "media caching finished"
    );
    report
}
