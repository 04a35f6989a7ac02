//! Application configuration.

/// Config file model.
pub mod app_config;
/// Command line arguments.
pub mod args;
/// Config file location and persistence.
pub mod storage;

pub use app_config::{
    AlertsConfig, ApiConfig, AppConfig, BroadcastConfig, FeedOverride, FeedsConfig, LogLevel,
    UiConfig,
};
pub use args::CliArgs;
pub use storage::{ConfigError, StorageManager};
