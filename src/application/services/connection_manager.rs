//! Reference-counted access to the shared broadcast connection.
//!
//! The connection opens when the first subscriber attaches and closes when
//! the last one detaches. Channels are joined and left the same way, per
//! channel. Every [`Subscription`] detaches exactly once, when dropped.

use std::collections::HashMap;
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::ConnectionStatus;
use crate::domain::errors::BroadcastResult;
use crate::domain::ports::{BroadcastEvent, BroadcastPort, PushEvent};

/// Identifies one attached subscriber for its lifetime.
pub type SubscriberId = u64;

struct SubscriberEntry {
    id: SubscriberId,
    events: Vec<String>,
    tx: Option<mpsc::UnboundedSender<PushEvent>>,
}

#[derive(Default)]
struct ManagerState {
    next_id: SubscriberId,
    channels: HashMap<String, Vec<SubscriberEntry>>,
    router: Option<JoinHandle<()>>,
    status: ConnectionStatus,
    stream_ended: bool,
}

impl ManagerState {
    fn subscriber_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }
}

struct Shared {
    port: Arc<dyn BroadcastPort>,
    state: Mutex<ManagerState>,
}

impl Shared {
    fn open_connection(self: &Arc<Self>, state: &mut ManagerState) -> BroadcastResult<()> {
        let event_rx = self.port.connect()?;
        if let Some(old) = state.router.take() {
            old.abort();
        }
        state.router = Some(tokio::spawn(route_events(Arc::downgrade(self), event_rx)));
        state.status = ConnectionStatus::Connecting;
        state.stream_ended = false;

        for channel in state.channels.keys() {
            self.port.join(channel);
        }

        info!("Broadcast connection opened");
        Ok(())
    }

    fn detach(&self, id: SubscriberId, channel: &str) {
        let mut state = self.state.lock();

        let Some(subscribers) = state.channels.get_mut(channel) else {
            return;
        };
        let before = subscribers.len();
        subscribers.retain(|entry| entry.id != id);
        if subscribers.len() == before {
            return;
        }

        debug!(subscriber = id, channel = channel, "Subscriber detached");

        if subscribers.is_empty() {
            state.channels.remove(channel);
            self.port.leave(channel);
            debug!(channel = channel, "Left channel");
        }

        if state.channels.is_empty() {
            self.port.disconnect();
            if let Some(router) = state.router.take() {
                router.abort();
            }
            state.status = ConnectionStatus::Disconnected;
            info!("Last subscriber detached, broadcast connection closed");
        }
    }

    fn dispatch(&self, event: &PushEvent) {
        let state = self.state.lock();

        let Some(subscribers) = state.channels.get(&event.channel) else {
            debug!(channel = %event.channel, event = %event.event, "Push event for unknown channel");
            return;
        };

        let mut delivered = 0_usize;
        for entry in subscribers.iter().filter(|entry| event.matches(&entry.events)) {
            if let Some(tx) = &entry.tx
                && tx.send(event.clone()).is_ok()
            {
                delivered += 1;
            }
        }

        debug!(
            channel = %event.channel,
            event = %event.event,
            delivered = delivered,
            "Routed push event"
        );
    }

    fn end_streams(&self) {
        let mut state = self.state.lock();
        for entry in state.channels.values_mut().flatten() {
            entry.tx = None;
        }
        state.stream_ended = true;
        state.status = ConnectionStatus::Disconnected;
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.state.lock().status = status;
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(router) = state.router.take() {
            router.abort();
        }
        if !state.channels.is_empty() {
            self.port.disconnect();
        }
    }
}

async fn route_events(shared: Weak<Shared>, mut events: mpsc::UnboundedReceiver<BroadcastEvent>) {
    while let Some(event) = events.recv().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };

        match event {
            BroadcastEvent::Push(push) => shared.dispatch(&push),
            BroadcastEvent::Connected { socket_id } => {
                info!(socket_id = %socket_id, "Broadcast connection established");
                shared.set_status(ConnectionStatus::Connected);
            }
            BroadcastEvent::Subscribed { channel } => {
                debug!(channel = %channel, "Channel subscription confirmed");
            }
            BroadcastEvent::Reconnecting { attempt } => {
                info!(attempt = attempt, "Broadcast connection reconnecting");
                shared.set_status(ConnectionStatus::Reconnecting);
            }
            BroadcastEvent::Disconnected {
                reason,
                will_reconnect,
            } => {
                warn!(reason = %reason, will_reconnect = will_reconnect, "Broadcast connection lost");
                shared.set_status(if will_reconnect {
                    ConnectionStatus::Reconnecting
                } else {
                    ConnectionStatus::Disconnected
                });
            }
            BroadcastEvent::Error {
                message,
                recoverable,
            } => {
                warn!(error = %message, recoverable = recoverable, "Broadcast error");
                if !recoverable {
                    shared.set_status(ConnectionStatus::Error);
                }
            }
        }
    }

    if let Some(shared) = shared.upgrade() {
        shared.end_streams();
    }
    debug!("Broadcast event stream ended");
}

/// Cloneable handle to the process-wide broadcast connection.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// Creates a manager over `port`. Nothing connects until the first subscriber.
    #[must_use]
    pub fn new(port: Arc<dyn BroadcastPort>) -> Self {
        Self {
            shared: Arc::new(Shared {
                port,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Attaches a subscriber to `channel`, receiving only the named events
    /// (all events if `events` is empty).
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError` if the connection cannot be opened.
    pub fn subscribe(
        &self,
        channel: impl Into<String>,
        events: Vec<String>,
    ) -> BroadcastResult<Subscription> {
        let channel = channel.into();
        let mut state = self.shared.state.lock();

        if state.channels.is_empty() || state.stream_ended {
            self.shared.open_connection(&mut state)?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        state.next_id += 1;
        let id = state.next_id;

        let subscribers = state.channels.entry(channel.clone()).or_default();
        let first_on_channel = subscribers.is_empty();
        subscribers.push(SubscriberEntry {
            id,
            events,
            tx: Some(tx),
        });

        if first_on_channel {
            self.shared.port.join(&channel);
            debug!(channel = %channel, "Joined channel");
        }

        debug!(subscriber = id, channel = %channel, "Subscriber attached");

        Ok(Subscription {
            id,
            channel,
            events: rx,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Total attached subscribers across all channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscriber_count()
    }

    /// Subscribers attached to `channel`.
    #[must_use]
    pub fn channel_subscribers(&self, channel: &str) -> usize {
        self.shared
            .state
            .lock()
            .channels
            .get(channel)
            .map_or(0, Vec::len)
    }

    /// Last status reported by the connection.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.shared.state.lock().status
    }

    /// Whether the underlying port has a live session.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.shared.port.is_connected()
    }
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("ConnectionManager")
            .field("status", &state.status)
            .field("channels", &state.channels.len())
            .field("subscribers", &state.subscriber_count())
            .finish()
    }
}

/// A lazy, infinite, non-restartable stream of push events for one channel.
///
/// Ends only if the underlying connection ends for good.
pub struct Subscription {
    id: SubscriberId,
    channel: String,
    events: mpsc::UnboundedReceiver<PushEvent>,
    shared: Weak<Shared>,
}

impl Subscription {
    /// Id assigned when the subscriber attached.
    #[must_use]
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Channel this subscription listens on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Waits for the next event. `None` means the stream is over.
    pub async fn next_event(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }
}

impl Stream for Subscription {
    type Item = PushEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().events.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.detach(self.id, &self.channel);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}
