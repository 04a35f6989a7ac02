//! Application layer: payload parsing and the feed services.

/// Data transfer objects.
pub mod dto;
/// Feed, connection and toast services.
pub mod services;

pub use dto::parse_notification;
pub use services::{ConnectionManager, NotificationAggregator, Subscription, ToastQueue};
