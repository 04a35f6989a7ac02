//! Notification feed definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::NotificationId;

const USER_PLACEHOLDER: &str = "{user_id}";
const ID_PLACEHOLDER: &str = "{id}";

/// Which notification view a feed backs.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Booking requests and status changes.
    #[default]
    Booking,
    /// Chat message notifications.
    Chat,
    /// Platform administration notices.
    Admin,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Booking => write!(f, "booking"),
            Self::Chat => write!(f, "chat"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// Endpoints and push channel for one feed.
///
/// Paths are relative to the API base URL. `{id}` in item paths is replaced
/// by the notification id, `{user_id}` in the channel by the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Which view this feed backs.
    pub kind: FeedKind,
    /// `GET` path returning the notification list.
    pub list_path: String,
    /// `POST` path marking every notification read.
    pub mark_all_read_path: String,
    /// `POST` path marking one notification read.
    pub mark_read_path: String,
    /// `DELETE` path for one notification.
    pub delete_path: String,
    /// Broadcast channel carrying new notifications.
    pub channel: String,
    /// Event names carrying notifications. Empty accepts every event.
    pub events: Vec<String>,
}

impl FeedConfig {
    /// Returns the stock endpoints for a feed.
    #[must_use]
    pub fn defaults(kind: FeedKind) -> Self {
        match kind {
            FeedKind::Booking => Self {
                kind,
                list_path: "/api/notifications".to_string(),
                mark_all_read_path: "/api/notifications/mark-all-read".to_string(),
                mark_read_path: "/api/notifications/{id}/read".to_string(),
                delete_path: "/api/notifications/{id}".to_string(),
                channel: "private-bookings.{user_id}".to_string(),
                events: vec![
                    "BookingCreated".to_string(),
                    "BookingStatusUpdated".to_string(),
                ],
            },
            FeedKind::Chat => Self {
                kind,
                list_path: "/api/chat/notifications".to_string(),
                mark_all_read_path: "/api/chat/notifications/mark-all-read".to_string(),
                mark_read_path: "/api/chat/notifications/{id}/read".to_string(),
                delete_path: "/api/chat/notifications/{id}".to_string(),
                channel: "private-chat.{user_id}".to_string(),
                events: vec!["MessageSent".to_string()],
            },
            FeedKind::Admin => Self {
                kind,
                list_path: "/api/admin/notifications".to_string(),
                mark_all_read_path: "/api/admin/notifications/mark-all-read".to_string(),
                mark_read_path: "/api/admin/notifications/{id}/read".to_string(),
                delete_path: "/api/admin/notifications/{id}".to_string(),
                channel: "private-admin.notifications".to_string(),
                events: vec!["AdminNotification".to_string()],
            },
        }
    }

    /// Fills the `{user_id}` placeholder of the channel name.
    #[must_use]
    pub fn with_user(mut self, user_id: Option<&str>) -> Self {
        if let Some(user_id) = user_id {
            self.channel = self.channel.replace(USER_PLACEHOLDER, user_id);
        }
        self
    }

    /// Returns whether the channel still needs a user id.
    #[must_use]
    pub fn needs_user(&self) -> bool {
        self.channel.contains(USER_PLACEHOLDER)
    }

    /// Mark-read path with `{id}` filled in.
    #[must_use]
    pub fn mark_read_path_for(&self, id: &NotificationId) -> String {
        self.mark_read_path.replace(ID_PLACEHOLDER, id.as_str())
    }

    /// Delete path with `{id}` filled in.
    #[must_use]
    pub fn delete_path_for(&self, id: &NotificationId) -> String {
        self.delete_path.replace(ID_PLACEHOLDER, id.as_str())
    }
}
