//! Domain layer with core entities, errors, and port definitions.

/// Connection status definitions.
pub mod connection;
/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;
/// Transient status messages.
pub mod toast;

pub use connection::ConnectionStatus;
pub use entities::{
    AuthToken, FeedConfig, FeedKind, MergeOutcome, NotificationCollection, NotificationId,
    NotificationRecord,
};
pub use errors::{ApiError, BroadcastError, PayloadError};
pub use toast::{Toast, ToastLevel};
