use async_trait::async_trait;
use portal_core::model::ProgressState;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::envelope::{decode_state, encode_state};
use crate::repository::{ProgressRepository, StorageError};

/// Keeps the progress entry as a JSON document on the local filesystem.
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// crash mid-write leaves the previous entry intact. Clones share one write
/// lock, so two saves never interleave on the temp file.
#[derive(Debug, Clone)]
pub struct JsonFileProgressRepository {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileProgressRepository {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            path: dir.into().join(format!("{key}.json")),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("json.tmp")
    }
}

#[async_trait]
impl ProgressRepository for JsonFileProgressRepository {
    async fn load(&self) -> Result<Option<ProgressState>, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        decode_state(&raw).map(Some)
    }

    async fn save(&self, state: &ProgressState) -> Result<(), StorageError> {
        let raw = encode_state(state)?;
        let _write = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::debug!(path = %self.path.display(), "progress written");
        Ok(())
    }
}
