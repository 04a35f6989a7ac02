//! Domain entity definitions.

mod collection;
mod feed;
mod notification;
mod token;

pub use collection::{DeleteOutcome, MergeOutcome, NotificationCollection};
pub use feed::{FeedConfig, FeedKind};
pub use notification::{NotificationId, NotificationRecord, Sender};
pub use token::AuthToken;
