use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TourError};
use crate::kiosk::heartbeat::DEFAULT_HEARTBEAT_INTERVAL;
use crate::model::{KioskMode, PlaylistEntry};
use crate::util::expand_tilde;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TourConfig {
    pub version: u32,
    /// Base URL of the content store API. Without it everything runs
    /// from the offline cache.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kiosk: Option<KioskConfig>,
}

impl Default for TourConfig {
    fn default() -> Self {
        Self {
            version: 1,
            content_url: None,
            cache_dir: None,
            kiosk: None,
        }
    }
}

impl TourConfig {
    /// Directory holding the cache namespaces. `cacheDir` wins over the
    /// platform cache directory.
    pub fn cache_root(&self) -> Option<PathBuf> {
        match &self.cache_dir {
            Some(dir) => Some(PathBuf::from(expand_tilde(dir))),
            None => dirs::cache_dir().map(|c| c.join("cavetour")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KioskConfig {
    pub kiosk_id: String,
    pub location_id: String,
    #[serde(default)]
    pub mode: KioskMode,
    #[serde(default)]
    pub playlist: Vec<PlaylistEntry>,
    /// e.g. `127.0.0.1:7878`. No listener when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_addr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heartbeat_interval_secs: Option<u64>,
    /// External player for narration, e.g. `mpv --no-video`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_command: Option<String>,
}

impl KioskConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        match self.heartbeat_interval_secs {
            Some(secs) if secs > 0 => Duration::from_secs(secs),
            _ => DEFAULT_HEARTBEAT_INTERVAL,
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".cavetour").join("config.json"))
}

/// Where analytics logs live.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("cavetour"))
}

/// A missing or unreadable file means "use defaults".
pub fn load_config(path: &Path) -> Option<TourConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), %e, "ignoring invalid config file");
            None
        }
    }
}

pub fn save_config(path: &Path, config: &TourConfig) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| TourError::Custom(e.to_string()))?;
    std::fs::write(path, json)?;
    Ok(())
}
