//! Notification record entity.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-assigned notification identifier.
///
/// The API sends ids either as strings or integers; both normalise to the
/// same textual form so fetched and pushed copies compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    /// Creates an id from its textual form.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NotificationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NotificationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for NotificationId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lightweight reference to whoever triggered a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    /// Sender's user id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Avatar URL, if any.
    pub avatar: Option<String>,
}

impl Sender {
    /// Creates a sender reference.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, avatar: Option<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar,
        }
    }
}

/// A single notification as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    id: NotificationId,
    message: String,
    created_at: DateTime<Utc>,
    is_read: bool,
    sender: Option<Sender>,
}

impl NotificationRecord {
    /// Creates an unread record.
    #[must_use]
    pub fn new(
        id: impl Into<NotificationId>,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
            created_at,
            is_read: false,
            sender: None,
        }
    }

    /// Sets the read flag as reported by the server.
    #[must_use]
    pub const fn with_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read;
        self
    }

    /// Attaches sender display data.
    #[must_use]
    pub fn with_sender(mut self, sender: Sender) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Unique id within a feed.
    #[must_use]
    pub const fn id(&self) -> &NotificationId {
        &self.id
    }

    /// Display text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creation time as reported by the server.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Whether the record has been read.
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.is_read
    }

    /// Who triggered the notification, if known.
    #[must_use]
    pub const fn sender(&self) -> Option<&Sender> {
        self.sender.as_ref()
    }

    /// Moves the record from unread to read.
    ///
    /// Returns `true` if the record was unread before the call.
    pub const fn mark_read(&mut self) -> bool {
        let was_unread = !self.is_read;
        self.is_read = true;
        was_unread
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_unread() {
        let record = NotificationRecord::new("1", "Booking confirmed", Utc::now());
        assert!(!record.is_read());
        assert!(record.sender().is_none());
    }

    #[test]
    fn test_mark_read_is_one_way() {
        let mut record = NotificationRecord::new("1", "Booking confirmed", Utc::now());
        assert!(record.mark_read());
        assert!(record.is_read());
        assert!(!record.mark_read());
        assert!(record.is_read());
    }

    #[test]
    fn test_numeric_and_string_ids_compare_equal() {
        assert_eq!(NotificationId::from(42_u64), NotificationId::from("42"));
    }
}
