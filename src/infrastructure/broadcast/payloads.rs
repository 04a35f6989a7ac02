use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::constants::{EVENT_PING, EVENT_PONG, EVENT_SUBSCRIBE, EVENT_UNSUBSCRIBE};

/// Frame as received from the socket. `data` is often a JSON string.
#[derive(Debug, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Frame sent to the socket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundFrame {
    pub event: String,
    pub data: Value,
}

impl OutboundFrame {
    #[must_use]
    pub fn ping() -> Self {
        Self {
            event: EVENT_PING.to_string(),
            data: json!({}),
        }
    }

    #[must_use]
    pub fn pong() -> Self {
        Self {
            event: EVENT_PONG.to_string(),
            data: json!({}),
        }
    }

    #[must_use]
    pub fn subscribe(channel: &str, auth: Option<&str>) -> Self {
        let data = match auth {
            Some(auth) => json!({"channel": channel, "auth": auth}),
            None => json!({"channel": channel}),
        };
        Self {
            event: EVENT_SUBSCRIBE.to_string(),
            data,
        }
    }

    #[must_use]
    pub fn unsubscribe(channel: &str) -> Self {
        Self {
            event: EVENT_UNSUBSCRIBE.to_string(),
            data: json!({"channel": channel}),
        }
    }

    /// Channel named in the frame data, if any.
    #[must_use]
    pub fn channel(&self) -> Option<&str> {
        self.data.get("channel").and_then(Value::as_str)
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectionEstablishedPayload {
    pub socket_id: String,
    #[serde(default)]
    pub activity_timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionErrorPayload {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
}
