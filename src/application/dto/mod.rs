//! Wire payloads and their conversion into domain records.

mod notification_dto;

pub use notification_dto::{NotificationPayload, SenderPayload, parse_notification};
