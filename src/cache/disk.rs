use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncBufReadExt;

use super::{CacheStore, CachedResponse};
use crate::error::{Result, TourError};

const ENTRY_EXT: &str = "entry";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// First line of every entry file; the raw body follows the newline.
#[derive(Serialize, Deserialize)]
struct EntryHeader {
    key: String,
    response: CachedResponse,
}

/// Filesystem-backed namespace: `<root>/<namespace>/<sha256(key)>.entry`.
///
/// Each entry is written to a temp file and renamed into place, so a put
/// replaces the whole entry at once.
#[derive(Clone, Debug)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn open(root: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            dir: root.as_ref().join(namespace),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir.join(format!("{}.{ENTRY_EXT}", hex::encode(digest)))
    }
}

fn encode_entry(key: &str, response: CachedResponse) -> Result<Vec<u8>> {
    let header = EntryHeader {
        key: key.to_string(),
        response,
    };
    let mut bytes = serde_json::to_vec(&header)?;
    bytes.push(b'\n');
    bytes.extend_from_slice(&header.response.body);
    Ok(bytes)
}

/// Read just the header line, leaving the body on disk.
async fn read_header(path: &Path) -> Result<EntryHeader> {
    let file = tokio::fs::File::open(path).await?;
    let mut line = Vec::new();
    tokio::io::BufReader::new(file)
        .read_until(b'\n', &mut line)
        .await?;
    if line.pop() != Some(b'\n') {
        return Err(TourError::Cache("entry is missing its header line".into()));
    }
    Ok(serde_json::from_slice(&line)?)
}

fn decode_entry(bytes: Vec<u8>) -> Result<(String, CachedResponse)> {
    let split = bytes
        .iter()
        .position(|b| *b == b'\n')
        .ok_or_else(|| TourError::Cache("entry is missing its header line".into()))?;
    let header: EntryHeader = serde_json::from_slice(&bytes[..split])?;
    let mut response = header.response;
    response.body = bytes[split + 1..].to_vec();
    Ok((header.key, response))
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        let bytes = match tokio::fs::read(self.entry_path(key)).await {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let (stored_key, response) = decode_entry(bytes)?;
        if stored_key != key {
            return Err(TourError::Cache(format!(
                "entry for '{key}' holds '{stored_key}'"
            )));
        }
        Ok(Some(response))
    }

    async fn put(&self, key: &str, response: CachedResponse) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let target = self.entry_path(key);
        let tmp = target.with_extension(format!(
            "{}.tmp",
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, encode_entry(key, response)?).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            // Entries deleted or half-written under us are skipped.
            if let Ok(header) = read_header(&path).await {
                keys.push(header.key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn purge(&self) -> Result<bool> {
        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
