//! Plain-text rendering of the feed for the terminal.

use chrono::Local;

use crate::domain::entities::{FeedKind, NotificationRecord};
use crate::domain::{ConnectionStatus, Toast, ToastLevel};

const UNREAD_MARKER: char = '●';
const READ_MARKER: char = ' ';

/// Formats feed state as terminal lines.
#[derive(Debug, Clone)]
pub struct ConsoleView {
    timestamp_format: String,
}

impl ConsoleView {
    /// Creates a view using a chrono `timestamp_format` for record times.
    #[must_use]
    pub fn new(timestamp_format: impl Into<String>) -> Self {
        Self {
            timestamp_format: timestamp_format.into(),
        }
    }

    /// One line per record: marker, local time, sender, message and id.
    #[must_use]
    pub fn format_record(&self, record: &NotificationRecord) -> String {
        let marker = if record.is_read() {
            READ_MARKER
        } else {
            UNREAD_MARKER
        };
        let time = record
            .created_at()
            .with_timezone(&Local)
            .format(&self.timestamp_format);

        match record.sender() {
            Some(sender) if !record.message().starts_with(&sender.name) => format!(
                "{marker} {time}  {}: {}  #{}",
                sender.name,
                record.message(),
                record.id()
            ),
            _ => format!("{marker} {time}  {}  #{}", record.message(), record.id()),
        }
    }

    /// Feed headline with total and unread counts.
    #[must_use]
    pub fn format_summary(feed: FeedKind, total: usize, unread: usize) -> String {
        match (total, unread) {
            (0, _) => format!("{feed}: no notifications"),
            (_, 0) => format!("{feed}: {total} notifications, all read"),
            _ => format!("{feed}: {total} notifications, {unread} unread"),
        }
    }

    /// One line for a toast, prefixed with its level.
    #[must_use]
    pub fn format_toast(toast: &Toast) -> String {
        let level = match toast.level {
            ToastLevel::Info => "info",
            ToastLevel::Warn => "warning",
            ToastLevel::Error => "error",
        };
        if toast.message.is_empty() {
            format!("[{level}] {}", toast.title)
        } else {
            format!("[{level}] {}: {}", toast.title, toast.message)
        }
    }

    /// Short label for the connection status.
    #[must_use]
    pub const fn format_status(status: ConnectionStatus) -> &'static str {
        match status {
            ConnectionStatus::Disconnected => "offline",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "live",
            ConnectionStatus::Reconnecting => "reconnecting",
            ConnectionStatus::Error => "error",
        }
    }
}

impl Default for ConsoleView {
    fn default() -> Self {
        Self::new("%Y-%m-%d %H:%M")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Sender;
    use chrono::{TimeZone, Utc};

    fn record() -> NotificationRecord {
        NotificationRecord::new(12_u64, "Booking confirmed", Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
    }

    #[test]
    fn test_unread_record_line() {
        let view = ConsoleView::new("%Y");
        let line = view.format_record(&record());
        assert_eq!(line, "● 2024  Booking confirmed  #12");
    }

    #[test]
    fn test_sender_is_prefixed_once() {
        let view = ConsoleView::new("%Y");
        let with_sender = record().with_sender(Sender::new("3", "Ana", None));
        assert_eq!(view.format_record(&with_sender), "● 2024  Ana: Booking confirmed  #12");

        let already_named = NotificationRecord::new(1_u64, "Ana: hi", Utc::now())
            .with_read(true)
            .with_sender(Sender::new("3", "Ana", None));
        assert!(view.format_record(&already_named).starts_with("  "));
        assert!(view.format_record(&already_named).contains("  Ana: hi  #1"));
    }

    #[test]
    fn test_summary() {
        assert_eq!(ConsoleView::format_summary(FeedKind::Chat, 0, 0), "chat: no notifications");
        assert_eq!(
            ConsoleView::format_summary(FeedKind::Booking, 3, 1),
            "booking: 3 notifications, 1 unread"
        );
        assert_eq!(
            ConsoleView::format_summary(FeedKind::Admin, 2, 0),
            "admin: 2 notifications, all read"
        );
    }

    #[test]
    fn test_toast_line() {
        let toast = Toast::new(ToastLevel::Error, "Could not load notifications", "network down");
        assert_eq!(
            ConsoleView::format_toast(&toast),
            "[error] Could not load notifications: network down"
        );
    }
}
