use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use marquee::application::{ConnectionManager, NotificationAggregator};
use marquee::domain::entities::{AuthToken, DeleteOutcome, MergeOutcome, NotificationId};
use marquee::infrastructure::{
    AppConfig, BroadcastClient, BroadcastClientConfig, CliArgs, DesktopAlertService,
    HttpNotificationApi, StorageManager,
};
use marquee::presentation::ConsoleView;

fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()));

    if let Some(log_path) = config.effective_log_path() {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry().with(filter).init();
    }

    Ok(())
}

fn load_config(args: &CliArgs) -> Result<AppConfig> {
    let storage = StorageManager::new()?;
    let mut config = storage.load_config(args.config.as_deref())?;
    config.merge_with_args(args);
    Ok(config)
}

fn build_aggregator(config: &AppConfig) -> Result<(NotificationAggregator, ConnectionManager)> {
    let token = config.token.as_deref().and_then(AuthToken::new);
    if token.is_none() {
        warn!("No usable API token configured, requests are sent unauthenticated");
    }

    let api = Arc::new(
        HttpNotificationApi::new(&config.api.base_url, token, config.api.timeout())?
            .with_auth_path(config.api.auth_path.clone()),
    );

    let broadcast = BroadcastClient::new(
        BroadcastClientConfig::new(config.socket_url())
            .with_auto_reconnect(config.broadcast.auto_reconnect)
            .with_max_reconnect_attempts(config.broadcast.max_reconnect_attempts),
    )
    .with_authorizer(api.clone());
    let connections = ConnectionManager::new(Arc::new(broadcast));

    let mut aggregator = NotificationAggregator::new(
        config.feed_config(config.feed),
        api,
        connections.clone(),
    )
    .with_toast_duration(config.toast_duration());

    if config.alerts.desktop {
        aggregator = aggregator.with_alert(Arc::new(DesktopAlertService::new(true)));
    }

    Ok((aggregator, connections))
}

fn flush_toasts(aggregator: &mut NotificationAggregator) {
    for toast in aggregator.toasts_mut().drain() {
        eprintln!("{}", ConsoleView::format_toast(&toast));
    }
}

fn print_summary(aggregator: &NotificationAggregator, connections: &ConnectionManager) {
    println!(
        "{} [{}]",
        ConsoleView::format_summary(aggregator.feed().kind, aggregator.len(), aggregator.unread_count()),
        ConsoleView::format_status(connections.status())
    );
}

async fn apply_startup_actions(aggregator: &mut NotificationAggregator, args: &CliArgs) {
    for raw_id in &args.delete {
        let id = NotificationId::from(raw_id.as_str());
        match aggregator.delete(&id).await {
            Ok(DeleteOutcome::Removed { .. }) => info!(id = %id, "Deleted notification"),
            Ok(DeleteOutcome::NotPresent) => eprintln!("[warning] notification {id} is not in the feed"),
            Err(e) => warn!(id = %id, error = %e, "Delete failed"),
        }
    }

    if args.mark_all_read && aggregator.mark_all_read().await.is_ok() {
        info!("Marked all notifications read");
    }
}

async fn run(
    aggregator: &mut NotificationAggregator,
    connections: &ConnectionManager,
    view: &ConsoleView,
    args: &CliArgs,
) -> Result<()> {
    if aggregator.load().await.is_ok() {
        for record in aggregator.records() {
            println!("{}", view.format_record(record));
        }
    }

    apply_startup_actions(aggregator, args).await;
    flush_toasts(aggregator);

    if let Err(e) = aggregator.subscribe() {
        eprintln!("[error] Live updates unavailable: {e}");
        print_summary(aggregator, connections);
        return Ok(());
    }
    print_summary(aggregator, connections);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to listen for Ctrl-C");
                }
                info!("Shutting down");
                break;
            }

            outcome = aggregator.next_event() => match outcome {
                Some(MergeOutcome::Inserted) => {
                    if let Some(record) = aggregator.latest() {
                        println!("{}", view.format_record(record));
                    }
                    print_summary(aggregator, connections);
                }
                Some(MergeOutcome::Duplicate | MergeOutcome::Rejected) => {}
                None => {
                    flush_toasts(aggregator);
                    break;
                }
            },
        }
        flush_toasts(aggregator);
    }

    aggregator.unsubscribe();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = dotenvy::dotenv();

    let args = CliArgs::parse();
    let config = load_config(&args)?;
    init_logging(&config)?;

    info!(version = marquee::VERSION, feed = %config.feed, "Starting Marquee");

    let (mut aggregator, connections) = build_aggregator(&config)?;
    let view = ConsoleView::new(config.ui.timestamp_format.clone());

    run(&mut aggregator, &connections, &view, &args).await
}
