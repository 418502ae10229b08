//! Local filesystem storage implementation.
//!
//! The states file is written atomically: the serialized array goes to a
//! sibling `<file>.tmp` first and is renamed over the target afterwards.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Region;
use crate::storage::{LoadOutcome, StateStorage};

/// JSON file storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    /// Create a LocalStorage for the given states file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.tmp_path();
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Read bytes, returning None if the file doesn't exist.
    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::storage(&self.path, e)),
        }
    }
}

/// Decode array entries one by one, skipping the ones that are not regions.
fn decode_entries(path: &Path, entries: Vec<serde_json::Value>) -> LoadOutcome {
    let total = entries.len();
    let mut regions = Vec::with_capacity(total);

    for (position, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<Region>(entry) {
            Ok(region) => regions.push(region),
            Err(e) => log::warn!(
                "Skipping entry {} in {}: {}",
                position,
                path.display(),
                e
            ),
        }
    }

    if total > 0 && regions.is_empty() {
        return LoadOutcome::Invalid(format!("none of {} entries is a region", total));
    }
    LoadOutcome::Loaded(regions)
}

#[async_trait]
impl StateStorage for LocalStorage {
    async fn load_regions(&self) -> Result<LoadOutcome> {
        let Some(bytes) = self.read_bytes().await? else {
            return Ok(LoadOutcome::Missing);
        };

        let entries = match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
            Ok(entries) => entries,
            Err(e) => return Ok(LoadOutcome::Invalid(e.to_string())),
        };
        Ok(decode_entries(&self.path, entries))
    }

    async fn save_regions(&self, regions: &[Region]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(regions)?;
        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::storage(&self.path, e))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
