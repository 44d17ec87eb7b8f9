//! Handlers behind each `cavetour` subcommand.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::cache::{CacheStore, DiskCache, CACHE_NAME};
use crate::config::{self, TourConfig};
use crate::content::{ContentStore, HttpContentStore};
use crate::media::HttpMediaFetcher;
use crate::offline::OfflineCache;
use crate::report::{ErrorReporter, TracingReporter};
use crate::resolver::{OfflineResolver, SpotResolver};

pub mod asset;
pub mod clear;
pub mod find;
pub mod init;
pub mod kiosk;
pub mod save;
pub mod status;

/// Everything a command needs, built from one config snapshot.
pub struct Context {
    pub config: TourConfig,
    pub client: reqwest::Client,
    pub cache: OfflineCache,
    pub content: Option<Arc<dyn ContentStore>>,
}

impl Context {
    pub fn load(config_path: &Path) -> anyhow::Result<Self> {
        let config = config::load_config(config_path).unwrap_or_default();
        let root = config
            .cache_root()
            .context("Cannot determine a cache directory; set cacheDir in the config")?;

        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;

        let store: Arc<dyn CacheStore> = Arc::new(DiskCache::open(&root, CACHE_NAME));
        let reporter: Arc<dyn ErrorReporter> = Arc::new(TracingReporter);
        let cache = OfflineCache::new(
            store,
            Arc::new(HttpMediaFetcher::new(client.clone())),
            reporter,
        );
        let content = config.content_url.as_deref().map(|url| {
            Arc::new(HttpContentStore::new(client.clone(), url)) as Arc<dyn ContentStore>
        });

        tracing::debug!(cache = %root.display(), online = content.is_some(), "context loaded");
        Ok(Self {
            config,
            client,
            cache,
            content,
        })
    }

    pub fn content(&self) -> anyhow::Result<Arc<dyn ContentStore>> {
        self.content
            .clone()
            .context("No contentUrl configured; this command needs the content store")
    }

    pub fn resolver(&self, online: bool) -> SpotResolver {
        let offline = OfflineResolver::new(self.cache.store(), self.cache.reporter());
        let content = if online { self.content.clone() } else { None };
        SpotResolver::new(content, offline)
    }
}

/// `--config`, then the default location.
pub fn config_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(PathBuf::from(crate::util::expand_tilde(&path.to_string_lossy()))),
        None => config::default_config_path().context("Cannot find home directory"),
    }
}
