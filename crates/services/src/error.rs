//! Shared error types for the services crate.

use thiserror::Error;

use portal_core::model::ProgressError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error("progress could not be persisted: {0}")]
    Storage(#[from] StorageError),
}

impl ProgressServiceError {
    /// True when the change was applied in memory but not written out.
    #[must_use]
    pub fn is_persistence_failure(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}

/// Errors emitted by API clients.
///
/// Non-2xx statuses are not errors; they come back as responses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors emitted while reading `PortalConfig`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unknown run mode: {0} (expected development or production)")]
    InvalidRunMode(String),
    #[error("invalid API base URL {raw}: {reason}")]
    InvalidBaseUrl { raw: String, reason: String },
    #[error("production mode requires PORTAL_API_BASE_URL")]
    MissingBaseUrl,
    #[error("invalid mock delay setting: {0} (expected on or off)")]
    InvalidMockDelay(String),
    #[error("store location cannot be empty")]
    EmptyStore,
    #[error("store key cannot be empty")]
    EmptyStoreKey,
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
