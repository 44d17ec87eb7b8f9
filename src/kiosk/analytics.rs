use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Result, TourError};
use crate::util::{now_millis, now_unix};

const MAX_ROTATED_LOGS: usize = 10;

/// Fire-and-forget viewing events.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsEvent {
    #[serde(rename_all = "camelCase")]
    SpotView {
        kiosk_id: String,
        location_id: String,
        spot_id: String,
        timestamp: u64,
    },
    #[serde(rename_all = "camelCase")]
    SpotEdge {
        kiosk_id: String,
        location_id: String,
        from_spot_id: String,
        to_spot_id: String,
        timestamp: u64,
    },
}

impl AnalyticsEvent {
    pub fn spot_view(kiosk_id: &str, location_id: &str, spot_id: &str) -> Self {
        Self::SpotView {
            kiosk_id: kiosk_id.to_string(),
            location_id: location_id.to_string(),
            spot_id: spot_id.to_string(),
            timestamp: now_millis(),
        }
    }

    pub fn spot_edge(kiosk_id: &str, location_id: &str, from: &str, to: &str) -> Self {
        Self::SpotEdge {
            kiosk_id: kiosk_id.to_string(),
            location_id: location_id.to_string(),
            from_spot_id: from.to_string(),
            to_spot_id: to.to_string(),
            timestamp: now_millis(),
        }
    }
}

/// External event sink. Callers never wait on it for playback.
#[async_trait]
pub trait AnalyticsSink: Send + Sync {
    async fn record(&self, event: AnalyticsEvent) -> Result<()>;
}

/// Appends events as JSON lines to `<dir>/analytics.jsonl`.
///
/// `record` only pushes onto a channel; a background task does the disk
/// writes, so a slow disk never stalls the player.
pub struct EventLog {
    tx: mpsc::UnboundedSender<String>,
}

impl EventLog {
    /// - Creates `dir` if needed
    /// - Rotates `analytics.jsonl` → `analytics-{unix}.jsonl`
    /// - Keeps at most 10 rotated files
    ///
    /// The returned writer task finishes once the log is dropped and every
    /// queued event is on disk.
    pub async fn open(dir: &Path) -> Result<(Self, JoinHandle<()>)> {
        tokio::fs::create_dir_all(dir).await?;

        let latest = dir.join("analytics.jsonl");
        if tokio::fs::try_exists(&latest).await.unwrap_or(false) {
            let rotated = dir.join(format!("analytics-{}.jsonl", now_unix()));
            let _ = tokio::fs::rename(&latest, &rotated).await;
        }
        cleanup_rotated(dir).await;

        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&latest)
            .await?;

        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer = tokio::spawn(writer_task(file, rx));

        Ok((Self { tx }, writer))
    }
}

#[async_trait]
impl AnalyticsSink for EventLog {
    async fn record(&self, event: AnalyticsEvent) -> Result<()> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        self.tx
            .send(line)
            .map_err(|_| TourError::Custom("analytics writer has stopped".into()))
    }
}

async fn writer_task(file: tokio::fs::File, mut rx: mpsc::UnboundedReceiver<String>) {
    use tokio::io::AsyncWriteExt;
    let mut writer = tokio::io::BufWriter::new(file);

    while let Some(line) = rx.recv().await {
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(%e, "failed to write analytics event");
            continue;
        }
        let _ = writer.flush().await;
    }
    let _ = writer.flush().await;
}

async fn cleanup_rotated(dir: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(_) => return,
    };

    let mut rotated: Vec<PathBuf> = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("analytics-") && name.ends_with(".jsonl") {
            rotated.push(entry.path());
        }
    }

    // Timestamp is embedded, so lexicographic = chronological.
    rotated.sort();
    while rotated.len() > MAX_ROTATED_LOGS {
        let oldest = rotated.remove(0);
        let _ = tokio::fs::remove_file(oldest).await;
    }
}
