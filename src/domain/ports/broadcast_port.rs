use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::errors::BroadcastResult;

/// An application event delivered on a broadcast channel.
#[derive(Debug, Clone, PartialEq)]
pub struct PushEvent {
    /// Channel the event arrived on.
    pub channel: String,
    /// Event name as sent, possibly namespaced.
    pub event: String,
    /// Decoded event payload.
    pub data: Value,
}

impl PushEvent {
    /// Creates an event.
    #[must_use]
    pub fn new(channel: impl Into<String>, event: impl Into<String>, data: Value) -> Self {
        Self {
            channel: channel.into(),
            event: event.into(),
            data,
        }
    }

    /// Event name without namespace or leading dot.
    ///
    /// `App\Events\BookingCreated` and `.BookingCreated` both become
    /// `BookingCreated`.
    #[must_use]
    pub fn short_name(&self) -> &str {
        let name = self.event.trim_start_matches('.');
        name.rsplit(['\\', '.']).next().unwrap_or(name)
    }

    /// Returns whether the event passes a name filter. An empty filter
    /// accepts everything.
    #[must_use]
    pub fn matches(&self, filter: &[String]) -> bool {
        filter.is_empty()
            || filter
                .iter()
                .any(|name| name == &self.event || name == self.short_name())
    }
}

/// Lifecycle and data events emitted by a broadcast connection.
#[derive(Debug, Clone)]
#[allow(missing_docs)]
pub enum BroadcastEvent {
    /// Handshake completed.
    Connected { socket_id: String },
    /// The server confirmed a channel subscription.
    Subscribed { channel: String },
    /// Application event on a joined channel.
    Push(PushEvent),
    /// A reconnect attempt is scheduled.
    Reconnecting { attempt: u32 },
    /// The session ended.
    Disconnected { reason: String, will_reconnect: bool },
    /// A failure that did or did not end the session.
    Error { message: String, recoverable: bool },
}

/// Port for a single shared real-time connection.
///
/// `connect` hands out the event stream; channel membership is controlled
/// with `join`/`leave` while the connection is up.
pub trait BroadcastPort: Send + Sync {
    /// Opens the connection in the background.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::AlreadyConnected` if a connection is active.
    fn connect(&self) -> BroadcastResult<mpsc::UnboundedReceiver<BroadcastEvent>>;

    /// Subscribes to `channel`, now or as soon as the connection is up.
    fn join(&self, channel: &str);

    /// Unsubscribes from `channel`.
    fn leave(&self, channel: &str);

    /// Ends the session; its event stream then closes.
    fn disconnect(&self);

    /// Whether a session is running.
    fn is_connected(&self) -> bool;
}
