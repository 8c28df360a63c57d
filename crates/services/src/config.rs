use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use storage::repository::DEFAULT_PROGRESS_KEY;
use url::Url;

use crate::error::ConfigError;

/// Which backend answers API calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Requests are answered in-process by `MockApi`.
    #[default]
    Development,
    /// Requests go to the real backend over HTTP.
    Production,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(ConfigError::InvalidRunMode(s.to_string())),
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Development => f.write_str("development"),
            RunMode::Production => f.write_str("production"),
        }
    }
}

/// Where the progress entry lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    /// Nothing survives the process.
    Memory,
    /// `SQLite` database URL.
    Sqlite(String),
    /// Directory holding one JSON file per entry.
    JsonDir(PathBuf),
}

impl FromStr for StoreLocation {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConfigError::EmptyStore);
        }
        if s.eq_ignore_ascii_case("memory") {
            return Ok(Self::Memory);
        }
        if s.starts_with("sqlite:") {
            return Ok(Self::Sqlite(s.to_string()));
        }
        Ok(Self::JsonDir(PathBuf::from(s)))
    }
}

impl Default for StoreLocation {
    fn default() -> Self {
        Self::JsonDir(PathBuf::from(".portal"))
    }
}

/// Runtime configuration for the portal services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalConfig {
    pub run_mode: RunMode,
    pub api_base_url: Option<Url>,
    pub store: StoreLocation,
    pub store_key: String,
    pub mock_delay: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            run_mode: RunMode::default(),
            api_base_url: None,
            store: StoreLocation::default(),
            store_key: DEFAULT_PROGRESS_KEY.to_string(),
            mock_delay: true,
        }
    }
}

impl PortalConfig {
    /// Read `PORTAL_*` environment variables on top of the defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any variable holds an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("PORTAL_RUN_MODE") {
            config.run_mode = raw.parse()?;
        }
        if let Some(raw) = lookup("PORTAL_API_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.api_base_url = Some(parse_base_url(&raw)?);
        }
        if let Some(raw) = lookup("PORTAL_STORE") {
            config.store = raw.parse()?;
        }
        if let Some(raw) = lookup("PORTAL_STORE_KEY") {
            let key = raw.trim();
            if key.is_empty() {
                return Err(ConfigError::EmptyStoreKey);
            }
            config.store_key = key.to_string();
        }
        if let Some(raw) = lookup("PORTAL_MOCK_DELAY") {
            config.mock_delay = parse_switch(&raw)?;
        }

        Ok(config)
    }

    /// Check that the settings make sense together.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingBaseUrl` in production without a base URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_mode == RunMode::Production && self.api_base_url.is_none() {
            return Err(ConfigError::MissingBaseUrl);
        }
        if self.store_key.trim().is_empty() {
            return Err(ConfigError::EmptyStoreKey);
        }
        Ok(())
    }
}

/// Parse and validate a backend base URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidBaseUrl` if `raw` is not an http(s) URL.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        raw: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {}", url.scheme())));
    }
    Ok(url)
}

fn parse_switch(raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidMockDelay(raw.to_string())),
    }
}
