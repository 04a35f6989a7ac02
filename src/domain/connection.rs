/// State of the shared broadcast connection as seen by subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No session, or the session ended.
    #[default]
    Disconnected,
    /// Socket opening or waiting for the handshake.
    Connecting,
    /// Handshake done; events flow.
    Connected,
    /// Waiting before a reconnect attempt.
    Reconnecting,
    /// Session failed without a reconnect.
    Error,
}

impl ConnectionStatus {
    /// Whether events can currently arrive.
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}
