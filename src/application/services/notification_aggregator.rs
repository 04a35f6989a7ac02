//! Live notification feed for one view.
//!
//! Combines an initial fetch with the feed's push channel into a
//! duplicate-free collection and keeps the unread count in step with
//! read/delete mutations. Unread state only changes through explicit
//! mark-read, delete, or newly pushed records; loading never resets it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::connection_manager::{ConnectionManager, Subscription};
use super::toast_queue::ToastQueue;
use crate::application::dto::parse_notification;
use crate::domain::entities::{
    DeleteOutcome, FeedConfig, MergeOutcome, NotificationCollection, NotificationId,
    NotificationRecord,
};
use crate::domain::errors::{ApiError, BroadcastResult};
use crate::domain::ports::{AlertPort, NotificationApiPort, PushEvent};

/// Notification list, unread count and push subscription for one feed view.
///
/// Owned by a single task. Failures of server calls are queued as toasts
/// as well as returned.
pub struct NotificationAggregator {
    feed: FeedConfig,
    api: Arc<dyn NotificationApiPort>,
    connections: ConnectionManager,
    alert: Option<Arc<dyn AlertPort>>,
    collection: NotificationCollection,
    subscription: Option<Subscription>,
    toasts: ToastQueue,
    loading: bool,
}

impl NotificationAggregator {
    /// Creates an empty, unsubscribed aggregator for `feed`.
    #[must_use]
    pub fn new(
        feed: FeedConfig,
        api: Arc<dyn NotificationApiPort>,
        connections: ConnectionManager,
    ) -> Self {
        Self {
            feed,
            api,
            connections,
            alert: None,
            collection: NotificationCollection::new(),
            subscription: None,
            toasts: ToastQueue::default(),
            loading: false,
        }
    }

    /// Fires `alert` for every newly inserted push notification.
    #[must_use]
    pub fn with_alert(mut self, alert: Arc<dyn AlertPort>) -> Self {
        self.alert = Some(alert);
        self
    }

    /// Sets how long queued toasts stay visible.
    #[must_use]
    pub fn with_toast_duration(mut self, duration: Duration) -> Self {
        self.toasts = ToastQueue::new(duration);
        self
    }

    /// Replaces the collection with the server's current list.
    ///
    /// On failure the collection is left as it was and an error toast is
    /// queued.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the failed fetch.
    pub async fn load(&mut self) -> Result<usize, ApiError> {
        self.loading = true;
        debug!(feed = %self.feed.kind, "Loading notifications");

        let result = self.api.fetch_notifications(&self.feed).await;
        self.loading = false;

        match result {
            Ok(records) => {
                self.collection.replace(records);
                info!(
                    feed = %self.feed.kind,
                    count = self.collection.len(),
                    unread = self.collection.unread_count(),
                    "Notifications loaded"
                );
                Ok(self.collection.len())
            }
            Err(e) => {
                warn!(feed = %self.feed.kind, error = %e, "Failed to load notifications");
                self.toasts
                    .error("Could not load notifications", e.to_string());
                Err(e)
            }
        }
    }

    /// Opens the feed's push subscription, releasing any previous one first.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError` if the shared connection cannot be opened.
    pub fn subscribe(&mut self) -> BroadcastResult<()> {
        self.unsubscribe();

        if self.feed.needs_user() {
            warn!(channel = %self.feed.channel, "Channel name still has an unfilled user placeholder");
        }

        let subscription = self
            .connections
            .subscribe(self.feed.channel.clone(), self.feed.events.clone())?;
        debug!(
            feed = %self.feed.kind,
            channel = %subscription.channel(),
            subscriber = subscription.id(),
            "Subscribed to push channel"
        );
        self.subscription = Some(subscription);
        Ok(())
    }

    /// Releases the push subscription, if any.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            debug!(
                feed = %self.feed.kind,
                subscriber = subscription.id(),
                "Releasing push subscription"
            );
        }
    }

    /// Waits for the next push event and merges it.
    ///
    /// Returns `None` when not subscribed or when the stream has ended.
    pub async fn next_event(&mut self) -> Option<MergeOutcome> {
        let event = self.subscription.as_mut()?.next_event().await;

        match event {
            Some(event) => Some(self.apply_event(event)),
            None => {
                warn!(feed = %self.feed.kind, "Push stream ended");
                self.subscription = None;
                self.toasts
                    .warn("Live updates stopped", "Reopen the feed to reconnect");
                None
            }
        }
    }

    /// Merges one push event. Malformed payloads are dropped.
    pub fn apply_event(&mut self, event: PushEvent) -> MergeOutcome {
        let record = match parse_notification(event.data) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    feed = %self.feed.kind,
                    event = %event.event,
                    error = %e,
                    "Ignoring malformed push payload"
                );
                return MergeOutcome::Rejected;
            }
        };

        let outcome = self.collection.merge(record);
        match outcome {
            MergeOutcome::Inserted => {
                debug!(
                    feed = %self.feed.kind,
                    unread = self.collection.unread_count(),
                    "Merged pushed notification"
                );
                if let (Some(alert), Some(latest)) = (&self.alert, self.collection.latest()) {
                    alert.send(&alert_title(latest), latest.message());
                }
            }
            MergeOutcome::Duplicate => {
                debug!(feed = %self.feed.kind, event = %event.event, "Dropped duplicate push");
            }
            MergeOutcome::Rejected => {}
        }
        outcome
    }

    /// Marks everything read locally, then on the server.
    ///
    /// Local state stays read even if the server call fails.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the server call.
    pub async fn mark_all_read(&mut self) -> Result<(), ApiError> {
        let cleared = self.collection.mark_all_read();
        debug!(feed = %self.feed.kind, cleared = cleared, "Marked all notifications read");

        self.api.mark_all_read(&self.feed).await.map_err(|e| {
            warn!(feed = %self.feed.kind, error = %e, "Server rejected mark-all-read");
            self.toasts
                .error("Could not mark notifications read", e.to_string());
            e
        })
    }

    /// Marks one notification read. Unknown or already read ids are a no-op.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the server call.
    pub async fn mark_read(&mut self, id: &NotificationId) -> Result<bool, ApiError> {
        if !self.collection.mark_read(id) {
            return Ok(false);
        }

        self.api.mark_read(&self.feed, id).await.map_err(|e| {
            warn!(feed = %self.feed.kind, id = %id, error = %e, "Server rejected mark-read");
            self.toasts
                .error("Could not mark notification read", e.to_string());
            e
        })?;
        Ok(true)
    }

    /// Removes a notification locally and on the server.
    ///
    /// A server-side "not found" counts as success. Other failures are
    /// reported but the local removal stands.
    ///
    /// # Errors
    ///
    /// Returns the `ApiError` of the server call.
    pub async fn delete(&mut self, id: &NotificationId) -> Result<DeleteOutcome, ApiError> {
        let outcome = self.collection.remove(id);
        debug!(feed = %self.feed.kind, id = %id, outcome = ?outcome, "Removed notification");

        match self.api.delete_notification(&self.feed, id).await {
            Ok(()) => Ok(outcome),
            Err(e) if e.is_not_found() => {
                debug!(feed = %self.feed.kind, id = %id, "Notification already gone on server");
                Ok(outcome)
            }
            Err(e) => {
                warn!(feed = %self.feed.kind, id = %id, error = %e, "Server rejected delete");
                self.toasts
                    .error("Could not delete notification", e.to_string());
                Err(e)
            }
        }
    }

    /// Endpoints and channel of this view.
    #[must_use]
    pub const fn feed(&self) -> &FeedConfig {
        &self.feed
    }

    /// Records, newest first.
    pub fn records(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.collection.iter()
    }

    /// Looks up a record by id.
    #[must_use]
    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.collection.get(id)
    }

    /// Most recently inserted or first loaded record.
    #[must_use]
    pub fn latest(&self) -> Option<&NotificationRecord> {
        self.collection.latest()
    }

    /// Number of unread records.
    #[must_use]
    pub const fn unread_count(&self) -> usize {
        self.collection.unread_count()
    }

    /// Number of records in the list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.len()
    }

    /// Whether the list holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.is_empty()
    }

    /// Whether a `load` is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Whether a push subscription is open.
    #[must_use]
    pub const fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    /// Messages reported by failed operations.
    #[must_use]
    pub const fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    /// Mutable access for draining or ticking toasts.
    pub fn toasts_mut(&mut self) -> &mut ToastQueue {
        &mut self.toasts
    }
}

fn alert_title(record: &NotificationRecord) -> String {
    record
        .sender()
        .map_or_else(|| "New notification".to_string(), |sender| sender.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::FeedKind;
    use crate::domain::ports::BroadcastPort;
    use crate::domain::ports::mocks::{
        DeleteBehavior, MockAlertPort, MockBroadcastPort, MockNotificationApi,
    };
    use chrono::Utc;
    use serde_json::{Value, json};

    const CHANNEL: &str = "private-bookings.7";

    struct Harness {
        api: Arc<MockNotificationApi>,
        port: Arc<MockBroadcastPort>,
        connections: ConnectionManager,
    }

    impl Harness {
        fn new(records: Vec<NotificationRecord>) -> Self {
            let port = Arc::new(MockBroadcastPort::new());
            Self {
                api: Arc::new(MockNotificationApi::new(records)),
                connections: ConnectionManager::new(port.clone()),
                port,
            }
        }

        fn aggregator(&self) -> NotificationAggregator {
            let feed = FeedConfig::defaults(FeedKind::Booking).with_user(Some("7"));
            NotificationAggregator::new(feed, self.api.clone(), self.connections.clone())
        }

        fn push(&self, data: Value) {
            assert!(self.port.emit(PushEvent::new(CHANNEL, "BookingCreated", data)));
        }
    }

    fn record(id: u64, is_read: bool) -> NotificationRecord {
        NotificationRecord::new(id, format!("notification {id}"), Utc::now()).with_read(is_read)
    }

    fn payload(id: u64) -> Value {
        json!({"id": id, "message": format!("push {id}"), "created_at": "2024-05-01T10:00:00Z"})
    }

    fn id(value: u64) -> NotificationId {
        NotificationId::from(value)
    }

    #[tokio::test]
    async fn test_documented_scenario() {
        let harness = Harness::new(vec![record(1, false), record(2, true)]);
        let mut aggregator = harness.aggregator();

        aggregator.load().await.unwrap();
        assert_eq!(aggregator.unread_count(), 1);

        aggregator.subscribe().unwrap();
        harness.push(payload(3));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Inserted));
        assert_eq!(aggregator.len(), 3);
        assert_eq!(aggregator.unread_count(), 2);

        harness.push(payload(3));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Duplicate));
        assert_eq!(aggregator.len(), 3);
        assert_eq!(aggregator.unread_count(), 2);

        aggregator.delete(&id(1)).await.unwrap();
        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.unread_count(), 1);

        aggregator.delete(&id(2)).await.unwrap();
        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.unread_count(), 1);

        aggregator.mark_all_read().await.unwrap();
        assert_eq!(aggregator.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_unique_pushes_add_up() {
        let initial = vec![record(1, false), record(2, true), record(3, false)];
        let harness = Harness::new(initial);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();
        aggregator.subscribe().unwrap();

        for n in 10..15 {
            harness.push(payload(n));
        }
        for _ in 10..15 {
            assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Inserted));
        }

        assert_eq!(aggregator.len(), 3 + 5);
        assert_eq!(aggregator.unread_count(), 2 + 5);
        assert_eq!(aggregator.latest().unwrap().id(), &id(14));
    }

    #[tokio::test]
    async fn test_push_matching_loaded_record_is_duplicate() {
        let harness = Harness::new(vec![record(1, true)]);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        let outcome =
            aggregator.apply_event(PushEvent::new(CHANNEL, "BookingCreated", payload(1)));

        assert_eq!(outcome, MergeOutcome::Duplicate);
        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_deletes_never_go_negative() {
        let harness = Harness::new(vec![record(1, true), record(2, false)]);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        let outcome = aggregator.delete(&id(1)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed { was_unread: false });
        assert_eq!(aggregator.unread_count(), 1);

        aggregator.delete(&id(2)).await.unwrap();
        assert_eq!(aggregator.unread_count(), 0);

        let outcome = aggregator.delete(&id(2)).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::NotPresent);
        aggregator.delete(&id(99)).await.unwrap();
        assert_eq!(aggregator.unread_count(), 0);
        assert!(aggregator.is_empty());
    }

    #[tokio::test]
    async fn test_delete_not_found_on_server_is_success() {
        let harness = Harness::new(vec![record(1, false)]);
        harness.api.set_delete_behavior(DeleteBehavior::NotFound);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        let outcome = aggregator.delete(&id(1)).await.unwrap();

        assert_eq!(outcome, DeleteOutcome::Removed { was_unread: true });
        assert_eq!(aggregator.unread_count(), 0);
        assert!(aggregator.toasts().is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_push_after_delete_stays_deleted() {
        let harness = Harness::new(vec![]);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();
        aggregator.subscribe().unwrap();

        harness.push(payload(3));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Inserted));
        aggregator.delete(&id(3)).await.unwrap();

        harness.push(payload(3));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Duplicate));
        assert!(aggregator.is_empty());
        assert_eq!(aggregator.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_failure_is_surfaced_without_rollback() {
        let harness = Harness::new(vec![record(1, false), record(2, false)]);
        harness.api.set_delete_behavior(DeleteBehavior::Fail);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        assert!(aggregator.delete(&id(1)).await.is_err());

        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.unread_count(), 1);
        assert_eq!(aggregator.toasts().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_read_from_any_state() {
        let harness = Harness::new(vec![record(1, false), record(2, true), record(3, false)]);
        harness.api.set_fail_mutations(true);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        assert!(aggregator.mark_all_read().await.is_err());

        assert_eq!(aggregator.unread_count(), 0);
        assert!(aggregator.records().all(NotificationRecord::is_read));
        assert_eq!(aggregator.toasts().len(), 1);

        aggregator.mark_all_read().await.unwrap_err();
        assert_eq!(aggregator.unread_count(), 0);
    }

    #[tokio::test]
    async fn test_mark_read_single() {
        let harness = Harness::new(vec![record(1, false), record(2, false)]);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        assert!(aggregator.mark_read(&id(1)).await.unwrap());
        assert!(!aggregator.mark_read(&id(1)).await.unwrap());
        assert!(!aggregator.mark_read(&id(42)).await.unwrap());

        assert_eq!(aggregator.unread_count(), 1);
        assert_eq!(harness.api.call_count("mark_read"), 1);
    }

    #[tokio::test]
    async fn test_failed_first_load_leaves_empty_collection() {
        let harness = Harness::new(vec![record(1, false)]);
        harness.api.set_fail_fetch(true);
        let mut aggregator = harness.aggregator();

        assert!(aggregator.load().await.is_err());
        assert!(aggregator.is_empty());
        assert!(!aggregator.is_loading());

        let toast = aggregator.toasts().current().unwrap();
        assert_eq!(toast.level, crate::domain::ToastLevel::Error);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_previous_state() {
        let harness = Harness::new(vec![record(1, false), record(2, false)]);
        let mut aggregator = harness.aggregator();
        aggregator.load().await.unwrap();

        harness.api.set_records(vec![]);
        harness.api.set_fail_fetch(true);
        assert!(aggregator.load().await.is_err());

        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.unread_count(), 2);

        harness.api.set_fail_fetch(false);
        aggregator.load().await.unwrap();
        assert!(aggregator.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_push_does_not_break_stream() {
        let harness = Harness::new(vec![]);
        let mut aggregator = harness.aggregator();
        aggregator.subscribe().unwrap();

        harness.push(json!({"message": "no id"}));
        harness.push(json!("not an object"));
        harness.push(payload(5));

        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Rejected));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Rejected));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Inserted));
        assert_eq!(aggregator.unread_count(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_counts_event_once() {
        let harness = Harness::new(vec![]);
        let mut aggregator = harness.aggregator();

        aggregator.subscribe().unwrap();
        aggregator.unsubscribe();
        aggregator.subscribe().unwrap();
        aggregator.subscribe().unwrap();

        assert_eq!(harness.connections.subscriber_count(), 1);
        assert_eq!(harness.connections.channel_subscribers(CHANNEL), 1);

        harness.push(payload(8));
        assert_eq!(aggregator.next_event().await, Some(MergeOutcome::Inserted));
        assert_eq!(aggregator.unread_count(), 1);

        let extra =
            tokio::time::timeout(Duration::from_millis(50), aggregator.next_event()).await;
        assert!(extra.is_err(), "event was delivered twice");
        assert_eq!(aggregator.len(), 1);
    }

    #[tokio::test]
    async fn test_two_views_share_one_connection() {
        let harness = Harness::new(vec![]);
        let mut first = harness.aggregator();
        let mut second = harness.aggregator();

        first.subscribe().unwrap();
        second.subscribe().unwrap();
        assert_eq!(harness.port.connect_count(), 1);

        harness.push(payload(1));
        assert_eq!(first.next_event().await, Some(MergeOutcome::Inserted));
        assert_eq!(second.next_event().await, Some(MergeOutcome::Inserted));

        drop(first);
        assert_eq!(harness.port.disconnect_count(), 0);
        drop(second);
        assert_eq!(harness.port.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_alert_fires_only_on_insert() {
        let harness = Harness::new(vec![]);
        let alert = Arc::new(MockAlertPort::new());
        let mut aggregator = harness.aggregator().with_alert(alert.clone());

        let event = PushEvent::new(
            CHANNEL,
            "BookingCreated",
            json!({"id": 1, "message": "New request", "sender": {"id": 2, "name": "Ana"}}),
        );
        aggregator.apply_event(event.clone());
        aggregator.apply_event(event);

        assert_eq!(alert.count(), 1);
        let alerts = alert.alerts.lock().unwrap();
        assert_eq!(alerts[0], ("Ana".to_string(), "New request".to_string()));
    }

    #[tokio::test]
    async fn test_next_event_without_subscription() {
        let harness = Harness::new(vec![]);
        let mut aggregator = harness.aggregator();
        assert!(aggregator.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_end_clears_subscription() {
        let harness = Harness::new(vec![]);
        let mut aggregator = harness.aggregator();
        aggregator.subscribe().unwrap();

        harness.port.disconnect();

        assert!(aggregator.next_event().await.is_none());
        assert!(!aggregator.is_subscribed());
        assert_eq!(harness.connections.subscriber_count(), 0);
    }
}
