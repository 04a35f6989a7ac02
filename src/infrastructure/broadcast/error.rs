use crate::domain::errors::BroadcastError;

/// Close and error codes sent by a Pusher-compatible server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PusherErrorCode {
    SslRequired = 4000,
    ApplicationMissing = 4001,
    ApplicationDisabled = 4003,
    OverConnectionQuota = 4004,
    PathNotFound = 4005,
    InvalidVersion = 4006,
    UnsupportedProtocol = 4007,
    NoProtocol = 4008,
    Unauthorized = 4009,
    OverCapacity = 4100,
    GenericReconnect = 4200,
    PongNotReceived = 4201,
    ClosedForInactivity = 4202,
}

impl PusherErrorCode {
    #[must_use]
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            4000 => Some(Self::SslRequired),
            4001 => Some(Self::ApplicationMissing),
            4003 => Some(Self::ApplicationDisabled),
            4004 => Some(Self::OverConnectionQuota),
            4005 => Some(Self::PathNotFound),
            4006 => Some(Self::InvalidVersion),
            4007 => Some(Self::UnsupportedProtocol),
            4008 => Some(Self::NoProtocol),
            4009 => Some(Self::Unauthorized),
            4100 => Some(Self::OverCapacity),
            4200 => Some(Self::GenericReconnect),
            4201 => Some(Self::PongNotReceived),
            4202 => Some(Self::ClosedForInactivity),
            _ => None,
        }
    }
}

impl From<PusherErrorCode> for u16 {
    fn from(code: PusherErrorCode) -> Self {
        code as Self
    }
}

/// What to do after a connection ends with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    Stop,
    AfterBackoff,
    Immediately,
}

impl ReconnectPolicy {
    /// Classifies a close or error code by its range.
    ///
    /// 4000-4099 must not reconnect, 4100-4199 reconnect after backing off,
    /// 4200-4299 reconnect right away. Other codes are treated as transport
    /// failures.
    #[must_use]
    pub const fn for_code(code: u16) -> Self {
        match code {
            4000..=4099 => Self::Stop,
            4200..=4299 => Self::Immediately,
            _ => Self::AfterBackoff,
        }
    }

    #[must_use]
    pub fn for_error(error: &BroadcastError) -> Self {
        if let Some(code) = error.close_code() {
            return Self::for_code(code);
        }

        match error {
            BroadcastError::ConnectionFailed { .. }
            | BroadcastError::WebSocket { .. }
            | BroadcastError::Timeout { .. } => Self::AfterBackoff,

            BroadcastError::AuthorizationFailed { .. }
            | BroadcastError::SerializationError { .. }
            | BroadcastError::ProtocolError { .. }
            | BroadcastError::ReconnectionLimitExceeded { .. }
            | BroadcastError::NotConnected
            | BroadcastError::AlreadyConnected
            | BroadcastError::ConnectionClosed { .. } => Self::Stop,
        }
    }

    #[must_use]
    pub const fn should_reconnect(self) -> bool {
        !matches!(self, Self::Stop)
    }
}
