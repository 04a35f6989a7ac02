use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    AwaitingHandshake,
    Connected,
    ShuttingDown,
}

impl ConnectionState {
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::AwaitingHandshake | Self::Connected
        )
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::AwaitingHandshake => write!(f, "Awaiting handshake"),
            Self::Connected => write!(f, "Connected"),
            Self::ShuttingDown => write!(f, "Shutting down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Pending,
    Requested,
    Subscribed,
    Failed,
}

/// Channels the client should be subscribed to, kept across reconnects.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: BTreeMap<String, ChannelStatus>,
}

impl ChannelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the channel was already wanted.
    pub fn insert(&mut self, channel: &str) -> bool {
        if self.channels.contains_key(channel) {
            return false;
        }
        self.channels
            .insert(channel.to_string(), ChannelStatus::Pending);
        true
    }

    /// Returns false if the channel was not wanted.
    pub fn remove(&mut self, channel: &str) -> bool {
        self.channels.remove(channel).is_some()
    }

    pub fn set_status(&mut self, channel: &str, status: ChannelStatus) {
        if let Some(current) = self.channels.get_mut(channel) {
            *current = status;
        }
    }

    /// Marks every channel pending again, as after a reconnect.
    pub fn reset(&mut self) {
        for status in self.channels.values_mut() {
            *status = ChannelStatus::Pending;
        }
    }

    #[must_use]
    pub fn status(&self, channel: &str) -> Option<ChannelStatus> {
        self.channels.get(channel).copied()
    }

    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.channels
            .iter()
            .filter(|(_, status)| **status == ChannelStatus::Pending)
            .map(|(channel, _)| channel.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_activity() {
        assert!(ConnectionState::AwaitingHandshake.is_active());
        assert!(!ConnectionState::ShuttingDown.is_active());
        assert!(ConnectionState::Connected.is_connected());
    }

    #[test]
    fn test_registry_tracks_membership() {
        let mut registry = ChannelRegistry::new();
        assert!(registry.insert("a"));
        assert!(!registry.insert("a"));
        assert!(registry.insert("b"));

        registry.set_status("a", ChannelStatus::Subscribed);
        assert_eq!(registry.pending(), vec!["b".to_string()]);

        registry.reset();
        assert_eq!(registry.pending().len(), 2);

        assert!(registry.remove("a"));
        assert!(!registry.remove("a"));
        assert_eq!(registry.status("a"), None);
        assert_eq!(registry.len(), 1);
    }
}
