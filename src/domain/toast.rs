use std::time::{Duration, Instant};

/// Severity of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Informational.
    Info,
    /// Something degraded but kept working.
    Warn,
    /// An operation failed.
    Error,
}

/// A short-lived status message, e.g. "could not load notifications".
#[derive(Debug, Clone)]
pub struct Toast {
    /// Severity.
    pub level: ToastLevel,
    /// Short headline.
    pub title: String,
    /// Detail text, usually the error.
    pub message: String,
    /// When the toast was queued.
    pub created_at: Instant,
    /// When the toast first reached the front of the queue.
    pub displayed_at: Option<Instant>,
    /// How long it stays visible once displayed.
    pub duration: Duration,
}

impl Toast {
    /// Creates a toast with the default five second duration.
    #[must_use]
    pub fn new(level: ToastLevel, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            message: message.into(),
            created_at: Instant::now(),
            displayed_at: None,
            duration: Duration::from_secs(5),
        }
    }

    /// Overrides the display duration.
    #[must_use]
    pub const fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Whether the toast has been displayed for longer than its duration.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.displayed_at
            .is_some_and(|start| start.elapsed() > self.duration)
    }

    /// Starts the display clock. Later calls keep the first start time.
    pub fn mark_displayed(&mut self) {
        if self.displayed_at.is_none() {
            self.displayed_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toast_creation() {
        let toast = Toast::new(ToastLevel::Error, "Load failed", "network down");
        assert_eq!(toast.level, ToastLevel::Error);
        assert_eq!(toast.title, "Load failed");
        assert_eq!(toast.duration, Duration::from_secs(5));
        assert!(!toast.is_expired());
    }

    #[test]
    fn test_toast_expiry() {
        let mut toast =
            Toast::new(ToastLevel::Info, "Title", "Message").with_duration(Duration::from_nanos(1));
        toast.mark_displayed();
        std::thread::sleep(Duration::from_millis(1));
        assert!(toast.is_expired());
    }
}
