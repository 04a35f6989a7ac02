//! HTTP adapter for the notification endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, header};
use serde_json::Value;
use tracing::{debug, warn};

use super::dto::{ChannelAuthRequest, ChannelAuthResponse, ErrorResponse};
use crate::application::dto::parse_notification;
use crate::domain::entities::{AuthToken, FeedConfig, NotificationId, NotificationRecord};
use crate::domain::errors::ApiError;
use crate::domain::ports::{ChannelAuthPort, NotificationApiPort};

const USER_AGENT: &str = concat!("marquee/", env!("CARGO_PKG_VERSION"));
const DEFAULT_AUTH_PATH: &str = "/broadcasting/auth";
const DEFAULT_RETRY_AFTER_MS: u64 = 5000;
const LIST_KEYS: [&str; 3] = ["data", "notifications", "items"];

/// Notification API client authenticated with a bearer token.
pub struct HttpNotificationApi {
    client: Client,
    base_url: String,
    auth_path: String,
    token: Option<AuthToken>,
}

impl HttpNotificationApi {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns error if HTTP client creation fails.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<AuthToken>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::unexpected(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            token,
        })
    }

    /// Overrides the channel authorisation path.
    #[must_use]
    pub fn with_auth_path(mut self, path: impl Into<String>) -> Self {
        self.auth_path = path.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header(header::ACCEPT, "application/json");
        match &self.token {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, resource: &str) -> Result<Response, ApiError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            warn!(error = %e, resource = resource, "Request to notification API failed");
            if e.is_timeout() {
                ApiError::network("request timed out")
            } else if e.is_connect() {
                ApiError::network("failed to connect to API")
            } else {
                ApiError::network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        let message = response
            .json::<ErrorResponse>()
            .await
            .ok()
            .map(|error| error.message);

        let error = map_status(status, resource, message, retry_after);
        debug!(status = %status, error = %error, "API returned an error status");
        Err(error)
    }
}

/// Maps a non-success status to an `ApiError`.
///
/// `retry_after_secs` is the parsed `Retry-After` header, if any.
#[must_use]
pub fn map_status(
    status: StatusCode,
    resource: &str,
    message: Option<String>,
    retry_after_secs: Option<u64>,
) -> ApiError {
    let detail = message.unwrap_or_else(|| format!("HTTP {status}"));

    match status {
        StatusCode::UNAUTHORIZED => ApiError::rejected("invalid or expired token"),
        StatusCode::FORBIDDEN => ApiError::rejected(format!("access denied: {detail}")),
        StatusCode::NOT_FOUND => ApiError::not_found(resource),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            retry_after_ms: retry_after_secs
                .map_or(DEFAULT_RETRY_AFTER_MS, |secs| secs.saturating_mul(1000)),
        },
        s if s.is_server_error() => ApiError::unavailable(detail),
        _ => ApiError::unexpected(format!("unexpected response: {status} - {detail}")),
    }
}

/// Pulls the list of raw notifications out of a list response.
///
/// Accepts a bare array or an object wrapping it under a common key.
fn list_items(body: Value) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => LIST_KEYS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                Some(Value::Object(inner)) => list_items(Value::Object(inner)).ok(),
                _ => None,
            })
            .ok_or_else(|| ApiError::invalid_response("no notification list in response")),
        _ => Err(ApiError::invalid_response("expected a list of notifications")),
    }
}

fn parse_records(items: Vec<Value>) -> Vec<NotificationRecord> {
    let total = items.len();
    let records: Vec<NotificationRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            parse_notification(item)
                .inspect_err(|e| warn!(index = index, error = %e, "Skipping malformed notification"))
                .ok()
        })
        .collect();

    if records.len() < total {
        debug!(kept = records.len(), total = total, "Dropped malformed list entries");
    }
    records
}

#[async_trait]
impl NotificationApiPort for HttpNotificationApi {
    async fn fetch_notifications(
        &self,
        feed: &FeedConfig,
    ) -> Result<Vec<NotificationRecord>, ApiError> {
        let url = self.url(&feed.list_path);
        debug!(feed = %feed.kind, url = %url, "Fetching notifications");

        let response = self.send(self.client.get(&url), &feed.list_path).await?;
        let body: Value = response.json().await.map_err(|e| {
            warn!(error = %e, "Failed to parse notification list");
            ApiError::invalid_response(format!("failed to parse response: {e}"))
        })?;

        Ok(parse_records(list_items(body)?))
    }

    async fn mark_all_read(&self, feed: &FeedConfig) -> Result<(), ApiError> {
        let url = self.url(&feed.mark_all_read_path);
        debug!(feed = %feed.kind, "Marking all notifications read");

        self.send(self.client.post(&url), &feed.mark_all_read_path)
            .await
            .map(drop)
    }

    async fn mark_read(&self, feed: &FeedConfig, id: &NotificationId) -> Result<(), ApiError> {
        let path = feed.mark_read_path_for(id);
        debug!(feed = %feed.kind, id = %id, "Marking notification read");

        self.send(self.client.post(self.url(&path)), &format!("notification {id}"))
            .await
            .map(drop)
    }

    async fn delete_notification(
        &self,
        feed: &FeedConfig,
        id: &NotificationId,
    ) -> Result<(), ApiError> {
        let path = feed.delete_path_for(id);
        debug!(feed = %feed.kind, id = %id, "Deleting notification");

        self.send(self.client.delete(self.url(&path)), &format!("notification {id}"))
            .await
            .map(drop)
    }
}

#[async_trait]
impl ChannelAuthPort for HttpNotificationApi {
    async fn authorize_channel(&self, socket_id: &str, channel: &str) -> Result<String, ApiError> {
        let body = ChannelAuthRequest {
            socket_id,
            channel_name: channel,
        };
        debug!(channel = channel, "Authorising broadcast channel");

        let request = self.client.post(self.url(&self.auth_path)).json(&body);
        let response = self.send(request, channel).await?;
        let auth: ChannelAuthResponse = response
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("bad channel auth response: {e}")))?;

        Ok(auth.auth)
    }
}
