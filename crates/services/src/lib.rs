#![forbid(unsafe_code)]

pub mod api;
pub mod app_services;
pub mod config;
pub mod error;
pub mod progress_service;

pub use portal_core::Clock;

pub use api::{ApiClient, ApiRequest, ApiResponse, HttpApiClient, Method, MockApi, MockApiConfig};
pub use app_services::AppServices;
pub use config::{PortalConfig, RunMode, StoreLocation};
pub use error::{ApiError, AppServicesError, ConfigError, ProgressServiceError};
pub use progress_service::ProgressService;
