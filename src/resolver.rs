//! Spot lookup without the network, and the online-first lookup that
//! falls back to it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::CacheStore;
use crate::content::ContentStore;
use crate::error::Result;
use crate::model::{sort_by_order, PlaylistEntry, Spot};
use crate::offline::{read_index, read_snapshot};
use crate::report::ErrorReporter;

/// Used when a playlist entry carries a zero duration.
pub const DEFAULT_SPOT_SECONDS: u64 = 10;

/// A spot plus its siblings in traversal order. `spot` is `None` and
/// `spots` empty on a miss.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OfflineSpot {
    pub spot: Option<Spot>,
    pub spots: Vec<Spot>,
}

impl OfflineSpot {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn is_miss(&self) -> bool {
        self.spot.is_none() && self.spots.is_empty()
    }
}

/// Reads spots purely from the offline cache. Never writes, never fails.
pub struct OfflineResolver {
    store: Arc<dyn CacheStore>,
    reporter: Arc<dyn ErrorReporter>,
}

impl OfflineResolver {
    pub fn new(store: Arc<dyn CacheStore>, reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { store, reporter }
    }

    pub async fn find_spot_offline(&self, spot_id: &str) -> OfflineSpot {
        match self.lookup(spot_id).await {
            Ok(found) => found,
            Err(e) => {
                self.reporter.report("find_spot_offline", &e);
                OfflineSpot::miss()
            }
        }
    }

    async fn lookup(&self, spot_id: &str) -> Result<OfflineSpot> {
        let Some(index) = read_index(self.store.as_ref()).await? else {
            return Ok(OfflineSpot::miss());
        };
        let Some(location_id) = index.location_for(spot_id) else {
            return Ok(OfflineSpot::miss());
        };
        // An index entry without its snapshot is a full miss, not a partial hit.
        let Some(snapshot) = read_snapshot(self.store.as_ref(), location_id).await? else {
            debug!(spot_id, location_id, "index entry has no snapshot");
            return Ok(OfflineSpot::miss());
        };

        let mut spots = snapshot.spots;
        // Stale entry: the snapshot was re-saved without this spot.
        let Some(spot) = spots.iter().find(|s| s.id == spot_id).cloned() else {
            debug!(spot_id, location_id, "snapshot no longer holds indexed spot");
            return Ok(OfflineSpot::miss());
        };
        sort_by_order(&mut spots);
        Ok(OfflineSpot {
            spot: Some(spot),
            spots,
        })
    }
}

/// A playlist entry materialised into its spot.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaylistItem {
    pub spot: Spot,
    pub duration: Duration,
}

/// Online-first spot lookup with an offline fallback.
pub struct SpotResolver {
    content: Option<Arc<dyn ContentStore>>,
    offline: OfflineResolver,
}

impl SpotResolver {
    /// `content` is `None` when running fully disconnected.
    pub fn new(content: Option<Arc<dyn ContentStore>>, offline: OfflineResolver) -> Self {
        Self { content, offline }
    }

    pub fn offline(&self) -> &OfflineResolver {
        &self.offline
    }

    pub async fn resolve_spot(&self, spot_id: &str) -> OfflineSpot {
        if let Some(content) = &self.content {
            match fetch_online(content.as_ref(), spot_id).await {
                Ok(Some(found)) => return found,
                Ok(None) => debug!(spot_id, "spot not found online, trying offline cache"),
                Err(e) => debug!(spot_id, %e, "content store unavailable, trying offline cache"),
            }
        }
        self.offline.find_spot_offline(spot_id).await
    }

    /// Resolve every entry in order. Entries that cannot be found either
    /// way are skipped.
    pub async fn resolve_playlist(&self, entries: &[PlaylistEntry]) -> Vec<PlaylistItem> {
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.resolve_spot(&entry.spot_id).await.spot {
                Some(spot) => {
                    let seconds = if entry.duration_seconds == 0 {
                        DEFAULT_SPOT_SECONDS
                    } else {
                        entry.duration_seconds
                    };
                    items.push(PlaylistItem {
                        spot,
                        duration: Duration::from_secs(seconds),
                    });
                }
                None => warn!(spot_id = %entry.spot_id, "playlist spot unavailable, skipping"),
            }
        }
        items
    }
}

async fn fetch_online(content: &dyn ContentStore, spot_id: &str) -> Result<Option<OfflineSpot>> {
    let Some(spot) = content.fetch_spot(spot_id).await? else {
        return Ok(None);
    };
    let mut spots = content.fetch_spots(&spot.location_id).await?;
    sort_by_order(&mut spots);
    Ok(Some(OfflineSpot {
        spot: Some(spot),
        spots,
    }))
}
