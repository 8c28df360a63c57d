use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::api::{ApiClient, HttpApiClient, MockApi, MockApiConfig};
use crate::config::{PortalConfig, RunMode, StoreLocation};
use crate::error::{AppServicesError, ConfigError};
use crate::progress_service::ProgressService;

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    run_mode: RunMode,
    progress: Arc<ProgressService>,
    api: Arc<dyn ApiClient>,
}

impl AppServices {
    /// Build the progress store over the configured backend and pick the API
    /// client for the run mode.
    ///
    /// An unreadable progress entry is logged and replaced by an empty store.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the configuration is inconsistent or
    /// the `SQLite` store cannot be opened.
    pub async fn new(config: &PortalConfig, clock: Clock) -> Result<Self, AppServicesError> {
        config.validate()?;

        let storage = match &config.store {
            StoreLocation::Memory => Storage::in_memory(),
            StoreLocation::Sqlite(url) => Storage::sqlite(url, &config.store_key).await?,
            StoreLocation::JsonDir(dir) => Storage::json_file(dir.clone(), &config.store_key),
        };
        let progress = Arc::new(ProgressService::open_or_empty(clock, storage.progress).await);

        let api: Arc<dyn ApiClient> = match config.run_mode {
            RunMode::Development => {
                let mock = if config.mock_delay {
                    MockApiConfig::default()
                } else {
                    MockApiConfig::instant()
                };
                Arc::new(MockApi::new(mock))
            }
            RunMode::Production => {
                let base_url = config
                    .api_base_url
                    .clone()
                    .ok_or(ConfigError::MissingBaseUrl)?;
                Arc::new(HttpApiClient::new(base_url))
            }
        };

        tracing::debug!(mode = %config.run_mode, store = ?config.store, "services ready");
        Ok(Self {
            run_mode: config.run_mode,
            progress,
            api,
        })
    }

    #[must_use]
    pub fn run_mode(&self) -> RunMode {
        self.run_mode
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn api(&self) -> Arc<dyn ApiClient> {
        Arc::clone(&self.api)
    }
}
