use super::app_config::LogLevel;
use crate::domain::entities::FeedKind;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "marquee",
    version,
    about = "Live notification feed for the talent-booking marketplace",
    long_about = None
)]
/// Command line arguments, merged over the config file.
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH")]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Feed to follow.
    #[arg(short, long, value_enum)]
    pub feed: Option<FeedKind>,

    /// REST API base URL.
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Broadcast service host.
    #[arg(long, value_name = "URL")]
    pub ws_url: Option<String>,

    /// Broadcast application key.
    #[arg(long)]
    pub app_key: Option<String>,

    /// Id of the signed-in user.
    #[arg(long)]
    pub user_id: Option<String>,

    /// API bearer token.
    #[arg(long, env = "MARQUEE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Show desktop notifications for new pushes.
    #[arg(long)]
    pub desktop_alerts: Option<bool>,

    /// Reconnect when the broadcast connection drops.
    #[arg(long)]
    pub auto_reconnect: Option<bool>,

    /// Mark every notification read after loading.
    #[arg(long)]
    pub mark_all_read: bool,

    /// Delete a notification after loading.
    #[arg(long, value_name = "ID")]
    pub delete: Vec<String>,
}
