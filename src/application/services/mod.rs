mod connection_manager;
mod notification_aggregator;
mod toast_queue;

pub use connection_manager::{ConnectionManager, SubscriberId, Subscription};
pub use notification_aggregator::NotificationAggregator;
pub use toast_queue::ToastQueue;
