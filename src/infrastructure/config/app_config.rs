//! Application configuration.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::args::CliArgs;
use crate::domain::entities::{FeedConfig, FeedKind};
use crate::infrastructure::broadcast::socket_url;

const APP_NAME: &str = "marquee";
const APP_QUALIFIER: &str = "com";
const APP_ORGANIZATION: &str = "marquee";

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Application configuration, from file and CLI.
#[derive(Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Configuration file path.
    #[serde(skip)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[serde(skip)]
    pub log_path: Option<PathBuf>,

    /// API bearer token. Never written to the config file.
    #[serde(skip)]
    pub token: Option<String>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Feed shown by the binary.
    #[serde(default)]
    pub feed: FeedKind,

    /// Id of the signed-in user, substituted into channel names.
    #[serde(default)]
    pub user_id: Option<String>,

    /// REST API configuration.
    #[serde(default)]
    pub api: ApiConfig,

    /// Broadcast service configuration.
    #[serde(default)]
    pub broadcast: BroadcastConfig,

    /// Per-feed endpoint and channel overrides.
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Alert configuration.
    #[serde(default)]
    pub alerts: AlertsConfig,

    /// Output configuration.
    #[serde(default)]
    pub ui: UiConfig,
}

/// REST API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL, e.g. `https://api.example.com`.
    #[serde(default = "default_api_url")]
    pub base_url: String,

    /// Path of the private channel authorisation endpoint.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Request timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            auth_path: default_auth_path(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Broadcast service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Socket host, e.g. `wss://ws.example.com`.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Application key of the broadcast service.
    #[serde(default = "default_app_key")]
    pub app_key: String,

    /// Reconnect after the connection drops.
    #[serde(default)]
    pub auto_reconnect: bool,

    /// Reconnection attempts before giving up.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            app_key: default_app_key(),
            auto_reconnect: false,
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

/// Overrides for one feed. Unset fields keep the built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedOverride {
    /// Replaces the list path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_path: Option<String>,
    /// Replaces the mark-all-read path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_all_read_path: Option<String>,
    /// Replaces the single mark-read path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mark_read_path: Option<String>,
    /// Replaces the delete path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_path: Option<String>,
    /// Replaces the push channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Replaces the accepted event names.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<String>>,
}

impl FeedOverride {
    fn apply(&self, mut feed: FeedConfig) -> FeedConfig {
        if let Some(path) = &self.list_path {
            feed.list_path.clone_from(path);
        }
        if let Some(path) = &self.mark_all_read_path {
            feed.mark_all_read_path.clone_from(path);
        }
        if let Some(path) = &self.mark_read_path {
            feed.mark_read_path.clone_from(path);
        }
        if let Some(path) = &self.delete_path {
            feed.delete_path.clone_from(path);
        }
        if let Some(channel) = &self.channel {
            feed.channel.clone_from(channel);
        }
        if let Some(events) = &self.events {
            feed.events.clone_from(events);
        }
        feed
    }
}

/// Per-feed overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Booking feed.
    #[serde(default)]
    pub booking: FeedOverride,
    /// Chat feed.
    #[serde(default)]
    pub chat: FeedOverride,
    /// Admin feed.
    #[serde(default)]
    pub admin: FeedOverride,
}

impl FeedsConfig {
    const fn get(&self, kind: FeedKind) -> &FeedOverride {
        match kind {
            FeedKind::Booking => &self.booking,
            FeedKind::Chat => &self.chat,
            FeedKind::Admin => &self.admin,
        }
    }
}

/// Alert configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Show a desktop notification for each new push.
    #[serde(default = "default_true")]
    pub desktop: bool,

    /// How long a transient message stays current, in seconds.
    #[serde(default = "default_toast_duration")]
    pub toast_duration_secs: u64,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            toast_duration_secs: default_toast_duration(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Timestamp format string (chrono format).
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            timestamp_format: default_timestamp_format(),
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_auth_path() -> String {
    "/broadcasting/auth".to_string()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_ws_url() -> String {
    "ws://localhost:6001".to_string()
}

fn default_app_key() -> String {
    "marquee".to_string()
}

const fn default_max_reconnect_attempts() -> u32 {
    10
}

const fn default_toast_duration() -> u64 {
    5
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M".to_string()
}

const fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Merges CLI arguments into the configuration.
    pub fn merge_with_args(&mut self, args: &CliArgs) {
        if let Some(config_path) = &args.config {
            self.config = Some(config_path.clone());
        }
        if let Some(log_path) = &args.log_path {
            self.log_path = Some(log_path.clone());
        }
        if let Some(log_level) = args.log_level {
            self.log_level = log_level;
        }
        if let Some(feed) = args.feed {
            self.feed = feed;
        }
        if let Some(api_url) = &args.api_url {
            self.api.base_url.clone_from(api_url);
        }
        if let Some(ws_url) = &args.ws_url {
            self.broadcast.ws_url.clone_from(ws_url);
        }
        if let Some(app_key) = &args.app_key {
            self.broadcast.app_key.clone_from(app_key);
        }
        if let Some(user_id) = &args.user_id {
            self.user_id = Some(user_id.clone());
        }
        if let Some(token) = &args.token {
            self.token = Some(token.clone());
        }
        if let Some(desktop_alerts) = args.desktop_alerts {
            self.alerts.desktop = desktop_alerts;
        }
        if let Some(auto_reconnect) = args.auto_reconnect {
            self.broadcast.auto_reconnect = auto_reconnect;
        }
    }

    /// Resolves the endpoints and channel of a feed.
    #[must_use]
    pub fn feed_config(&self, kind: FeedKind) -> FeedConfig {
        self.feeds
            .get(kind)
            .apply(FeedConfig::defaults(kind))
            .with_user(self.user_id.as_deref())
    }

    /// Full socket URL for the configured host and app key.
    #[must_use]
    pub fn socket_url(&self) -> String {
        socket_url(&self.broadcast.ws_url, &self.broadcast.app_key)
    }

    /// How long toasts stay visible.
    #[must_use]
    pub const fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.alerts.toast_duration_secs)
    }

    /// Returns default config directory.
    #[must_use]
    pub fn default_config_dir() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Returns default config file path.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Returns default log file path.
    #[must_use]
    pub fn default_log_path() -> Option<PathBuf> {
        ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
            .map(|dirs| dirs.data_dir().join("marquee.log"))
    }

    /// Returns effective config path.
    #[must_use]
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config.clone().or_else(Self::default_config_path)
    }

    /// Returns effective log path.
    #[must_use]
    pub fn effective_log_path(&self) -> Option<PathBuf> {
        self.log_path.clone().or_else(Self::default_log_path)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config: None,
            log_path: None,
            token: None,
            log_level: LogLevel::Info,
            feed: FeedKind::default(),
            user_id: None,
            api: ApiConfig::default(),
            broadcast: BroadcastConfig::default(),
            feeds: FeedsConfig::default(),
            alerts: AlertsConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_parse_config_with_sections() {
        let toml_content = r#"
            user_id = "42"
            feed = "chat"

            [api]
            base_url = "https://api.example.test"

            [broadcast]
            app_key = "abc"
            auto_reconnect = true

            [feeds.chat]
            list_path = "/api/v2/chat/notifications"
            events = ["MessageSent", "MessageEdited"]

            [alerts]
            desktop = false
        "#;

        let config: AppConfig = toml::from_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.feed, FeedKind::Chat);
        assert_eq!(config.api.base_url, "https://api.example.test");
        assert_eq!(config.api.timeout_secs, 30);
        assert!(config.broadcast.auto_reconnect);
        assert!(!config.alerts.desktop);

        let feed = config.feed_config(FeedKind::Chat);
        assert_eq!(feed.list_path, "/api/v2/chat/notifications");
        assert_eq!(feed.channel, "private-chat.42");
        assert_eq!(feed.events.len(), 2);
        assert_eq!(feed.delete_path, FeedConfig::defaults(FeedKind::Chat).delete_path);
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.feed, FeedKind::Booking);
        assert!(config.alerts.desktop);
        assert!(!config.broadcast.auto_reconnect);
        assert!(config.token.is_none());
        assert_eq!(config.toast_duration(), Duration::from_secs(5));
    }

    #[test]
    fn test_token_is_never_serialised() {
        let config = AppConfig {
            token: Some("secret-token-value".to_string()),
            ..AppConfig::default()
        };
        let content = toml::to_string_pretty(&config).unwrap();
        assert!(!content.contains("secret-token-value"));
    }

    #[test]
    fn test_merge_with_args() {
        let args = CliArgs::parse_from([
            "marquee",
            "--feed",
            "admin",
            "--api-url",
            "https://api.other.test",
            "--user-id",
            "7",
            "--desktop-alerts",
            "false",
            "--log-level",
            "debug",
        ]);
        let mut config = AppConfig::default();
        config.merge_with_args(&args);

        assert_eq!(config.feed, FeedKind::Admin);
        assert_eq!(config.api.base_url, "https://api.other.test");
        assert_eq!(config.user_id.as_deref(), Some("7"));
        assert!(!config.alerts.desktop);
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.feed_config(FeedKind::Booking).channel, "private-bookings.7");
    }

    #[test]
    fn test_socket_url_uses_app_key() {
        let mut config = AppConfig::default();
        config.broadcast.ws_url = "wss://ws.example.test".to_string();
        config.broadcast.app_key = "key1".to_string();
        assert!(config.socket_url().starts_with("wss://ws.example.test/app/key1?"));
    }
}
