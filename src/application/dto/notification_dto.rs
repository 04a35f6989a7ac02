//! Boundary parsing of notification payloads.
//!
//! The list endpoint and the broadcast channel both send loosely shaped JSON.
//! Everything is coerced into a [`NotificationRecord`] here so the rest of
//! the crate never touches raw fields.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::domain::entities::{NotificationRecord, Sender};
use crate::domain::errors::PayloadError;
use crate::domain::serde_utils::{flexible_id, flexible_timestamp};

const ENVELOPE_KEYS: [&str; 2] = ["notification", "payload"];
const TEXT_KEYS: [&str; 4] = ["text", "content", "body", "message"];

/// Sender object embedded in a payload.
#[derive(Debug, Default, Deserialize)]
#[allow(missing_docs)]
pub struct SenderPayload {
    #[serde(default, deserialize_with = "flexible_id::option::deserialize")]
    pub id: Option<String>,
    #[serde(default, alias = "username", alias = "display_name")]
    pub name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default, alias = "avatar_url", alias = "profile_picture")]
    pub avatar: Option<String>,
}

impl SenderPayload {
    fn display_name(&self) -> Option<String> {
        if let Some(name) = non_empty(self.name.as_deref()) {
            return Some(name.to_string());
        }

        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .filter_map(non_empty)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }

    fn into_sender(self) -> Option<Sender> {
        let name = self.display_name()?;
        Some(Sender::new(self.id.unwrap_or_default(), name, self.avatar))
    }
}

/// Wire shape of a notification as sent by the API or the broadcast service.
#[derive(Debug, Deserialize)]
pub struct NotificationPayload {
    /// Numeric or string id. Required.
    #[serde(default, deserialize_with = "flexible_id::option::deserialize")]
    pub id: Option<String>,
    /// Either display text or a nested object carrying it.
    #[serde(default)]
    pub message: Option<Value>,
    /// Fallback text when `message` is absent.
    #[serde(default)]
    pub title: Option<String>,
    /// Fallback text when `message` and `title` are absent.
    #[serde(default, alias = "body", alias = "content")]
    pub text: Option<String>,
    /// Creation time; defaults to the time of parsing.
    #[serde(
        default,
        alias = "createdAt",
        alias = "timestamp",
        deserialize_with = "flexible_timestamp::option"
    )]
    pub created_at: Option<DateTime<Utc>>,
    /// Read flag as bool, number or string.
    #[serde(default, alias = "isRead", alias = "read")]
    pub is_read: Option<Value>,
    /// Any non-null value marks the record read.
    #[serde(default, alias = "readAt")]
    pub read_at: Option<Value>,
    /// Embedded sender object.
    #[serde(default, alias = "user", alias = "from")]
    pub sender: Option<SenderPayload>,
    /// Flat sender id, used when no sender object is present.
    #[serde(default, deserialize_with = "flexible_id::option::deserialize")]
    pub sender_id: Option<String>,
    /// Flat sender name.
    #[serde(default)]
    pub sender_name: Option<String>,
    /// Flat sender avatar url.
    #[serde(default)]
    pub sender_avatar: Option<String>,
    /// Nested `data` object; its `message` is used when the top level has none.
    #[serde(default)]
    pub data: Option<Value>,
}

impl NotificationPayload {
    fn sender(&mut self) -> Option<Sender> {
        if let Some(sender) = self.sender.take().and_then(SenderPayload::into_sender) {
            return Some(sender);
        }

        SenderPayload {
            id: self.sender_id.take(),
            name: self.sender_name.take(),
            avatar: self.sender_avatar.take(),
            ..SenderPayload::default()
        }
        .into_sender()
    }

    fn compose_message(&self, sender: Option<&Sender>) -> Option<String> {
        if let Some(message) = self.message.as_ref().and_then(text_of) {
            return Some(message);
        }

        if let Some(message) = self
            .data
            .as_ref()
            .and_then(|data| data.get("message"))
            .and_then(text_of)
        {
            return Some(message);
        }

        let title = non_empty(self.title.as_deref());
        let text = non_empty(self.text.as_deref());

        match (title, text, sender) {
            (Some(title), Some(text), _) => Some(format!("{title}: {text}")),
            (None, Some(text), Some(sender)) => Some(format!("{}: {text}", sender.name)),
            (None, Some(text), None) => Some(text.to_string()),
            (Some(title), None, _) => Some(title.to_string()),
            (None, None, _) => None,
        }
    }

    fn is_read(&self) -> bool {
        let flagged = self.is_read.as_ref().is_some_and(truthy);
        let has_read_at = self.read_at.as_ref().is_some_and(|value| !value.is_null());
        flagged || has_read_at
    }

    /// Converts into a record, stamping `now` when no timestamp was sent.
    ///
    /// # Errors
    ///
    /// Returns `PayloadError` if the id or every message part is missing.
    pub fn into_record(mut self, now: DateTime<Utc>) -> Result<NotificationRecord, PayloadError> {
        let id = self.id.take().ok_or(PayloadError::MissingId)?;
        let sender = self.sender();
        let message = self
            .compose_message(sender.as_ref())
            .ok_or(PayloadError::MissingMessage)?;
        let is_read = self.is_read();

        let mut record = NotificationRecord::new(id, message, self.created_at.unwrap_or(now))
            .with_read(is_read);
        if let Some(sender) = sender {
            record = record.with_sender(sender);
        }
        Ok(record)
    }
}

/// Parses one JSON notification into a record.
///
/// Accepts the bare object or one wrapped in a `notification`/`payload` key.
///
/// # Errors
///
/// Returns `PayloadError` when the value cannot describe a notification.
pub fn parse_notification(value: Value) -> Result<NotificationRecord, PayloadError> {
    let Value::Object(mut object) = value else {
        return Err(PayloadError::NotAnObject);
    };

    if let Some(key) = ENVELOPE_KEYS
        .iter()
        .find(|key| object.get(**key).is_some_and(Value::is_object))
        && let Some(inner) = object.remove(*key)
    {
        return parse_notification(inner);
    }

    let payload: NotificationPayload = serde_json::from_value(Value::Object(object))
        .map_err(|e| PayloadError::malformed(e.to_string()))?;
    payload.into_record(Utc::now())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(Some(text.as_str())).map(ToString::to_string),
        Value::Object(object) => TEXT_KEYS
            .iter()
            .filter_map(|key| object.get(*key))
            .find_map(|inner| match inner {
                Value::String(text) => non_empty(Some(text.as_str())).map(ToString::to_string),
                _ => None,
            }),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => matches!(text.trim(), "1" | "true" | "yes"),
        _ => false,
    }
}
