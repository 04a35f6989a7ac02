use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::connection::{
    BroadcastCommand, BroadcastTransport, ConnectionHandler, WebSocketTransport,
};
use super::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_DELAY_BASE, RECONNECT_DELAY_MAX, RECONNECT_IMMEDIATE_DELAY,
    RECONNECT_JITTER_MAX,
};
use super::error::ReconnectPolicy;
use super::state::ChannelRegistry;
use crate::domain::errors::{BroadcastError, BroadcastResult};
use crate::domain::ports::{BroadcastEvent, BroadcastPort, ChannelAuthPort};

/// Builds a fresh transport for every connection attempt.
pub type TransportFactory = Arc<dyn Fn() -> Box<dyn BroadcastTransport> + Send + Sync>;

/// Connection settings for [`BroadcastClient`].
#[derive(Debug, Clone)]
pub struct BroadcastClientConfig {
    /// Full socket URL including app key and protocol.
    pub url: String,
    /// Reconnect after recoverable failures. Off by default.
    pub auto_reconnect: bool,
    /// Consecutive reconnects tried before giving up.
    pub max_reconnect_attempts: u32,
}

impl BroadcastClientConfig {
    /// Settings for `url` with reconnects disabled.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auto_reconnect: false,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }

    /// Enables or disables automatic reconnects.
    #[must_use]
    pub const fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Caps consecutive reconnect attempts.
    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

struct Session {
    running: Arc<AtomicBool>,
    commands: mpsc::UnboundedSender<BroadcastCommand>,
}

/// Pusher-protocol client implementing [`BroadcastPort`].
///
/// Each `connect` starts an independent background session; `disconnect`
/// ends it, so a later `connect` never revives the old loop.
pub struct BroadcastClient {
    config: BroadcastClientConfig,
    authorizer: Option<Arc<dyn ChannelAuthPort>>,
    transport_factory: TransportFactory,
    session: Mutex<Option<Session>>,
}

impl BroadcastClient {
    /// Creates a client that connects over WebSocket.
    #[must_use]
    pub fn new(config: BroadcastClientConfig) -> Self {
        Self {
            config,
            authorizer: None,
            transport_factory: Arc::new(websocket_transport),
            session: Mutex::new(None),
        }
    }

    /// Signs private channel subscriptions with `authorizer`.
    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn ChannelAuthPort>) -> Self {
        self.authorizer = Some(authorizer);
        self
    }

    #[cfg(test)]
    #[must_use]
    pub fn with_transport_factory(mut self, factory: TransportFactory) -> Self {
        self.transport_factory = factory;
        self
    }

    fn send_command(&self, command: BroadcastCommand) {
        let session = self.session.lock();
        match session.as_ref() {
            Some(session) if session.commands.send(command.clone()).is_ok() => {}
            _ => debug!(command = ?command, "No active broadcast session"),
        }
    }
}

impl BroadcastPort for BroadcastClient {
    fn connect(&self) -> BroadcastResult<mpsc::UnboundedReceiver<BroadcastEvent>> {
        let mut slot = self.session.lock();
        if slot
            .as_ref()
            .is_some_and(|session| session.running.load(Ordering::SeqCst))
        {
            return Err(BroadcastError::AlreadyConnected);
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));

        let loop_config = LoopConfig {
            url: self.config.url.clone(),
            auto_reconnect: self.config.auto_reconnect,
            max_attempts: self.config.max_reconnect_attempts,
            authorizer: self.authorizer.clone(),
            transport_factory: self.transport_factory.clone(),
        };
        let task_running = running.clone();

        tokio::spawn(async move {
            let result = std::panic::AssertUnwindSafe(run_broadcast_loop(
                loop_config,
                event_tx.clone(),
                command_rx,
                task_running.clone(),
            ));

            if let Err(panic_info) = result.catch_unwind().await {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };

                error!(panic = %panic_msg, "Broadcast task panicked");
                task_running.store(false, Ordering::SeqCst);
                let _ = event_tx.send(BroadcastEvent::Error {
                    message: format!("Broadcast task panicked: {panic_msg}"),
                    recoverable: false,
                });
            }
        });

        *slot = Some(Session {
            running,
            commands: command_tx,
        });
        Ok(event_rx)
    }

    fn join(&self, channel: &str) {
        self.send_command(BroadcastCommand::Join(channel.to_string()));
    }

    fn leave(&self, channel: &str) {
        self.send_command(BroadcastCommand::Leave(channel.to_string()));
    }

    fn disconnect(&self) {
        if let Some(session) = self.session.lock().take() {
            session.running.store(false, Ordering::SeqCst);
            debug!("Broadcast session released");
        }
    }

    fn is_connected(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .is_some_and(|session| session.running.load(Ordering::SeqCst))
    }
}

impl Drop for BroadcastClient {
    fn drop(&mut self) {
        if let Some(session) = self.session.get_mut().take() {
            session.running.store(false, Ordering::SeqCst);
        }
    }
}

fn websocket_transport() -> Box<dyn BroadcastTransport> {
    Box::new(WebSocketTransport::new())
}

struct LoopConfig {
    url: String,
    auto_reconnect: bool,
    max_attempts: u32,
    authorizer: Option<Arc<dyn ChannelAuthPort>>,
    transport_factory: TransportFactory,
}

async fn run_broadcast_loop(
    config: LoopConfig,
    event_tx: mpsc::UnboundedSender<BroadcastEvent>,
    mut commands: mpsc::UnboundedReceiver<BroadcastCommand>,
    running: Arc<AtomicBool>,
) {
    let mut channels = ChannelRegistry::new();
    let mut reconnect_attempts: u32 = 0;

    while running.load(Ordering::SeqCst) {
        let mut handler = ConnectionHandler::new(
            (config.transport_factory)(),
            config.authorizer.clone(),
            event_tx.clone(),
        );

        let result = match handler.connect(&config.url).await {
            Ok(()) => {
                reconnect_attempts = 0;
                handler.run(&mut channels, &mut commands).await
            }
            Err(e) => Err(e),
        };

        let error = match result {
            Ok(()) => break,
            Err(e) => e,
        };

        let policy = ReconnectPolicy::for_error(&error);
        let will_reconnect =
            config.auto_reconnect && policy.should_reconnect() && running.load(Ordering::SeqCst);
        warn!(
            error = %error,
            socket_id = handler.socket_id().unwrap_or("-"),
            state = %handler.state(),
            will_reconnect = will_reconnect,
            "Broadcast connection lost"
        );

        let _ = event_tx.send(BroadcastEvent::Disconnected {
            reason: error.to_string(),
            will_reconnect,
        });

        if !will_reconnect {
            break;
        }

        reconnect_attempts += 1;
        if reconnect_attempts > config.max_attempts {
            error!(
                attempts = reconnect_attempts - 1,
                "Max reconnection attempts exceeded"
            );
            let _ = event_tx.send(BroadcastEvent::Error {
                message: BroadcastError::ReconnectionLimitExceeded {
                    attempts: config.max_attempts,
                }
                .to_string(),
                recoverable: false,
            });
            break;
        }

        let delay = match policy {
            ReconnectPolicy::Immediately => RECONNECT_IMMEDIATE_DELAY,
            _ => calculate_backoff_delay(reconnect_attempts - 1),
        };
        info!(
            attempt = reconnect_attempts,
            delay_ms = delay.as_millis(),
            "Reconnecting to broadcast service"
        );
        let _ = event_tx.send(BroadcastEvent::Reconnecting {
            attempt: reconnect_attempts,
        });

        if !wait_for_retry(delay, &mut channels, &mut commands).await {
            break;
        }
    }

    running.store(false, Ordering::SeqCst);
    info!("Broadcast loop terminated");
}

/// Sleeps before a retry while still tracking channel changes.
///
/// Returns false if the session was released in the meantime.
async fn wait_for_retry(
    delay: Duration,
    channels: &mut ChannelRegistry,
    commands: &mut mpsc::UnboundedReceiver<BroadcastCommand>,
) -> bool {
    let retry = sleep(delay);
    tokio::pin!(retry);

    loop {
        tokio::select! {
            () = &mut retry => return true,
            command = commands.recv() => match command {
                Some(BroadcastCommand::Join(channel)) => {
                    channels.insert(&channel);
                }
                Some(BroadcastCommand::Leave(channel)) => {
                    channels.remove(&channel);
                }
                None => return false,
            },
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn calculate_backoff_delay(attempt: u32) -> Duration {
    let base_delay = RECONNECT_DELAY_BASE.as_millis() as u64;
    let max_delay = RECONNECT_DELAY_MAX.as_millis() as u64;
    let jitter_max = RECONNECT_JITTER_MAX.as_millis() as u64;

    let exponential_delay = base_delay.saturating_mul(2_u64.saturating_pow(attempt.min(6)));
    let capped_delay = exponential_delay.min(max_delay);

    Duration::from_millis(capped_delay.saturating_add(rand_jitter(jitter_max)))
}

fn rand_jitter(max: u64) -> u64 {
    use std::time::SystemTime;

    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0);

    nanos % max.max(1)
}
