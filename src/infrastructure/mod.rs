//! Infrastructure layer with external service adapters.

/// Desktop alerts.
pub mod alerts;
/// Marketplace REST API client.
pub mod api;
/// Broadcast service client.
pub mod broadcast;
/// Application configuration.
pub mod config;

pub use alerts::DesktopAlertService;
pub use api::HttpNotificationApi;
pub use broadcast::{BroadcastClient, BroadcastClientConfig};
pub use config::{AppConfig, CliArgs, ConfigError, LogLevel, StorageManager};
