use async_trait::async_trait;
use portal_core::model::ProgressState;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::json_file::JsonFileProgressRepository;

/// Name of the durable entry that holds the progress store.
pub const DEFAULT_PROGRESS_KEY: &str = "progress-storage";

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence adapter for the progress store.
///
/// The whole state is read once at startup and written back in full after
/// every mutation.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Read the persisted state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry exists but cannot be read or
    /// decoded. A missing entry is `Ok(None)`.
    async fn load(&self) -> Result<Option<ProgressState>, StorageError>;

    /// Replace the persisted state.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the state cannot be written.
    async fn save(&self, state: &ProgressState) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryProgressRepository {
    state: Arc<Mutex<Option<ProgressState>>>,
    saves: Arc<Mutex<usize>>,
}

impl InMemoryProgressRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted state.
    #[must_use]
    pub fn with_state(state: ProgressState) -> Self {
        Self {
            state: Arc::new(Mutex::new(Some(state))),
            saves: Arc::new(Mutex::new(0)),
        }
    }

    /// Number of successful `save` calls so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.lock().map_or(0, |guard| *guard)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryProgressRepository {
    async fn load(&self) -> Result<Option<ProgressState>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save(&self, state: &ProgressState) -> Result<(), StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(state.clone());
        let mut saves = self
            .saves
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *saves += 1;
        Ok(())
    }
}

/// Holds the progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            progress: Arc::new(InMemoryProgressRepository::new()),
        }
    }

    /// Keep the progress entry as a JSON file named `<key>.json` in `dir`.
    #[must_use]
    pub fn json_file(dir: impl Into<PathBuf>, key: &str) -> Self {
        Self {
            progress: Arc::new(JsonFileProgressRepository::new(dir, key)),
        }
    }
}
