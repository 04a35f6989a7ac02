//! Notification REST API port.

use async_trait::async_trait;

use crate::domain::entities::{FeedConfig, NotificationId, NotificationRecord};
use crate::domain::errors::ApiError;

/// Port for the notification endpoints of the marketplace API.
#[async_trait]
pub trait NotificationApiPort: Send + Sync {
    /// Fetches the current notifications of a feed, newest first.
    async fn fetch_notifications(
        &self,
        feed: &FeedConfig,
    ) -> Result<Vec<NotificationRecord>, ApiError>;

    /// Marks every notification of a feed read on the server.
    async fn mark_all_read(&self, feed: &FeedConfig) -> Result<(), ApiError>;

    /// Marks one notification read on the server.
    async fn mark_read(&self, feed: &FeedConfig, id: &NotificationId) -> Result<(), ApiError>;

    /// Deletes one notification on the server.
    async fn delete_notification(
        &self,
        feed: &FeedConfig,
        id: &NotificationId,
    ) -> Result<(), ApiError>;
}

/// Port for authorising subscriptions to private broadcast channels.
#[async_trait]
pub trait ChannelAuthPort: Send + Sync {
    /// Returns the signature the broadcast service expects for this socket.
    async fn authorize_channel(&self, socket_id: &str, channel: &str) -> Result<String, ApiError>;
}
