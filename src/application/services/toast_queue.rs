use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::{Toast, ToastLevel};

/// FIFO of transient status messages; only the front one is shown.
#[derive(Debug)]
pub struct ToastQueue {
    queue: VecDeque<Toast>,
    default_duration: Duration,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl ToastQueue {
    /// Creates an empty queue whose toasts last `default_duration`.
    #[must_use]
    pub fn new(default_duration: Duration) -> Self {
        Self {
            queue: VecDeque::new(),
            default_duration,
        }
    }

    /// Queues a toast at `level`.
    pub fn notify(&mut self, level: ToastLevel, title: impl Into<String>, message: impl Into<String>) {
        let toast = Toast::new(level, title, message).with_duration(self.default_duration);
        self.queue.push_back(toast);
    }

    /// Queues an informational toast.
    pub fn info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(ToastLevel::Info, title, message);
    }

    /// Queues a warning toast.
    pub fn warn(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(ToastLevel::Warn, title, message);
    }

    /// Queues an error toast.
    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.notify(ToastLevel::Error, title, message);
    }

    /// Expires the front toast once its duration has passed.
    pub fn tick(&mut self) {
        if let Some(front) = self.queue.front_mut() {
            front.mark_displayed();
            if front.is_expired() {
                self.queue.pop_front();
                if let Some(next) = self.queue.front_mut() {
                    next.mark_displayed();
                }
            }
        }
    }

    /// Toast currently on display.
    #[must_use]
    pub fn current(&self) -> Option<&Toast> {
        self.queue.front()
    }

    /// Removes and returns every queued toast, oldest first.
    pub fn drain(&mut self) -> impl Iterator<Item = Toast> + '_ {
        self.queue.drain(..)
    }

    /// Whether anything is queued.
    #[must_use]
    pub fn has_toasts(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Number of queued toasts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_toast_flow() {
        let mut queue = ToastQueue::default();

        queue.info("Info", "Test message");
        assert!(queue.current().is_some());

        queue.tick();
        assert!(queue.current().is_some());
    }

    #[test]
    fn test_queueing() {
        let mut queue = ToastQueue::default();
        queue.warn("1", "First");
        queue.error("2", "Second");

        assert_eq!(queue.current().unwrap().title, "1");

        queue.tick();

        queue.queue.front_mut().unwrap().displayed_at =
            Some(Instant::now().checked_sub(Duration::from_secs(10)).unwrap());

        queue.tick();

        let second = queue.current().unwrap();
        assert_eq!(second.title, "2");
        assert_eq!(second.level, ToastLevel::Error);
        assert!(second.displayed_at.unwrap().elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_drain_empties_queue() {
        let mut queue = ToastQueue::new(Duration::from_secs(1));
        queue.info("a", "1");
        queue.info("b", "2");

        let titles: Vec<String> = queue.drain().map(|t| t.title).collect();
        assert_eq!(titles, vec!["a", "b"]);
        assert!(queue.is_empty());
    }
}
