use std::time::Duration;

pub const PROTOCOL_VERSION: u8 = 7;
pub const CLIENT_NAME: &str = "marquee";

pub const DEFAULT_ACTIVITY_TIMEOUT: Duration = Duration::from_secs(120);
pub const PONG_TIMEOUT: Duration = Duration::from_secs(30);

pub const RECONNECT_DELAY_BASE: Duration = Duration::from_secs(1);
pub const RECONNECT_DELAY_MAX: Duration = Duration::from_secs(60);
pub const RECONNECT_JITTER_MAX: Duration = Duration::from_millis(500);
pub const RECONNECT_IMMEDIATE_DELAY: Duration = Duration::from_millis(100);
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub const EVENT_CONNECTION_ESTABLISHED: &str = "pusher:connection_established";
pub const EVENT_ERROR: &str = "pusher:error";
pub const EVENT_PING: &str = "pusher:ping";
pub const EVENT_PONG: &str = "pusher:pong";
pub const EVENT_SUBSCRIBE: &str = "pusher:subscribe";
pub const EVENT_UNSUBSCRIBE: &str = "pusher:unsubscribe";
pub const EVENT_SUBSCRIPTION_ERROR: &str = "pusher:subscription_error";
pub const EVENT_SUBSCRIPTION_SUCCEEDED: &str = "pusher_internal:subscription_succeeded";

pub const INTERNAL_PREFIXES: [&str; 2] = ["pusher:", "pusher_internal:"];
pub const PRIVATE_PREFIXES: [&str; 2] = ["private-", "presence-"];

/// Builds the socket URL for an app key on a host such as `wss://ws.example.com`.
#[must_use]
pub fn socket_url(host: &str, app_key: &str) -> String {
    format!(
        "{}/app/{app_key}?protocol={PROTOCOL_VERSION}&client={CLIENT_NAME}&version={}&flash=false",
        host.trim_end_matches('/'),
        env!("CARGO_PKG_VERSION"),
    )
}

/// Returns whether subscribing to `channel` needs a signature from the API.
#[must_use]
pub fn is_private_channel(channel: &str) -> bool {
    PRIVATE_PREFIXES
        .iter()
        .any(|prefix| channel.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_url() {
        let url = socket_url("wss://ws.example.test/", "key123");
        assert!(url.starts_with("wss://ws.example.test/app/key123?protocol=7&client=marquee"));
        assert!(url.ends_with("&flash=false"));
    }

    #[test]
    fn test_private_channels() {
        assert!(is_private_channel("private-bookings.4"));
        assert!(is_private_channel("presence-room.1"));
        assert!(!is_private_channel("announcements"));
    }
}
