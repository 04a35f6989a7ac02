use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::constants::{
    EVENT_CONNECTION_ESTABLISHED, EVENT_ERROR, EVENT_PING, EVENT_PONG, EVENT_SUBSCRIPTION_ERROR,
    EVENT_SUBSCRIPTION_SUCCEEDED, INTERNAL_PREFIXES,
};
use super::payloads::{
    ConnectionEstablishedPayload, ErrorPayload, InboundFrame, SubscriptionErrorPayload,
};
use crate::domain::errors::{BroadcastError, BroadcastResult};
use crate::domain::ports::PushEvent;

/// A decoded socket frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastFrame {
    ConnectionEstablished {
        socket_id: String,
        activity_timeout: Option<Duration>,
    },
    SubscriptionSucceeded {
        channel: String,
    },
    SubscriptionError {
        channel: String,
        status: Option<u16>,
        message: String,
    },
    Error {
        code: Option<u16>,
        message: String,
    },
    Ping,
    Pong,
    Event(PushEvent),
    /// Protocol frames this client has no use for.
    Ignored {
        event: String,
    },
}

pub struct FrameParser;

impl FrameParser {
    /// Decodes one text frame.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::SerializationError` for non-JSON input and
    /// `ProtocolError` for protocol frames missing required fields.
    pub fn parse(text: &str) -> BroadcastResult<BroadcastFrame> {
        let frame: InboundFrame =
            serde_json::from_str(text).map_err(|e| BroadcastError::serialization(e.to_string()))?;
        Self::decode(frame)
    }

    fn decode(frame: InboundFrame) -> BroadcastResult<BroadcastFrame> {
        let data = decode_data(frame.data);

        match frame.event.as_str() {
            EVENT_CONNECTION_ESTABLISHED => {
                let payload: ConnectionEstablishedPayload = Self::payload(data)?;
                Ok(BroadcastFrame::ConnectionEstablished {
                    socket_id: payload.socket_id,
                    activity_timeout: payload.activity_timeout.map(Duration::from_secs),
                })
            }
            EVENT_SUBSCRIPTION_SUCCEEDED => Ok(BroadcastFrame::SubscriptionSucceeded {
                channel: Self::channel(frame.channel)?,
            }),
            EVENT_SUBSCRIPTION_ERROR => {
                let payload: SubscriptionErrorPayload = Self::payload(data).unwrap_or_default();
                let message = payload
                    .error
                    .or(payload.kind)
                    .unwrap_or_else(|| "subscription refused".to_string());
                Ok(BroadcastFrame::SubscriptionError {
                    channel: Self::channel(frame.channel)?,
                    status: payload.status,
                    message,
                })
            }
            EVENT_ERROR => {
                let payload: ErrorPayload = Self::payload(data).unwrap_or_default();
                Ok(BroadcastFrame::Error {
                    code: payload.code,
                    message: payload
                        .message
                        .unwrap_or_else(|| "unspecified error".to_string()),
                })
            }
            EVENT_PING => Ok(BroadcastFrame::Ping),
            EVENT_PONG => Ok(BroadcastFrame::Pong),
            event if INTERNAL_PREFIXES.iter().any(|p| event.starts_with(p)) => {
                Ok(BroadcastFrame::Ignored {
                    event: frame.event,
                })
            }
            _ => match frame.channel {
                Some(channel) => Ok(BroadcastFrame::Event(PushEvent::new(
                    channel,
                    frame.event,
                    data,
                ))),
                None => Ok(BroadcastFrame::Ignored {
                    event: frame.event,
                }),
            },
        }
    }

    fn payload<T: DeserializeOwned>(data: Value) -> BroadcastResult<T> {
        serde_json::from_value(data).map_err(|e| BroadcastError::protocol(e.to_string()))
    }

    fn channel(channel: Option<String>) -> BroadcastResult<String> {
        channel.ok_or_else(|| BroadcastError::protocol("frame is missing its channel"))
    }
}

/// Unwraps string-encoded JSON data. Non-JSON strings are kept as strings.
fn decode_data(data: Option<Value>) -> Value {
    match data {
        Some(Value::String(text)) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        Some(value) => value,
        None => Value::Null,
    }
}
