//! Broadcast channel error types.

use thiserror::Error;

pub type BroadcastResult<T> = Result<T, BroadcastError>;

/// Failures of the real-time broadcast connection.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum BroadcastError {
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("connection closed with code {code}: {reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("websocket error: {message}")]
    WebSocket { message: String },

    #[error("channel authorization failed for {channel}: {message}")]
    AuthorizationFailed { channel: String, message: String },

    #[error("serialization error: {message}")]
    SerializationError { message: String },

    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    #[error("timeout waiting for {operation}")]
    Timeout { operation: String },

    #[error("reconnection limit exceeded after {attempts} attempts")]
    ReconnectionLimitExceeded { attempts: u32 },

    #[error("not connected to broadcast service")]
    NotConnected,

    #[error("already connecting or connected")]
    AlreadyConnected,
}

impl BroadcastError {
    #[must_use]
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::WebSocket {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn authorization(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AuthorizationFailed {
            channel: channel.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::ProtocolError {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    #[must_use]
    pub const fn close_code(&self) -> Option<u16> {
        if let Self::ConnectionClosed { code, .. } = self {
            Some(*code)
        } else {
            None
        }
    }
}
