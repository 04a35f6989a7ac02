//! Desktop alerts with conditional compilation.

use crate::domain::ports::AlertPort;

#[cfg(feature = "notify")]
mod notify_impl {
    use super::*;
    use notify_rust::Notification;

    /// Shows a desktop notification for each newly pushed record.
    #[derive(Debug, Clone, Default)]
    pub struct DesktopAlertService {
        enabled: bool,
    }

    impl DesktopAlertService {
        /// Creates the service; a disabled one ignores every alert.
        #[must_use]
        pub const fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        /// Whether alerts are actually shown.
        #[must_use]
        pub const fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    impl AlertPort for DesktopAlertService {
        fn send(&self, title: &str, body: &str) {
            if !self.enabled {
                return;
            }

            let title = title.to_string();
            let body = body.to_string();

            tokio::task::spawn_blocking(move || {
                if let Err(e) = Notification::new()
                    .summary(&title)
                    .body(&body)
                    .appname("Marquee")
                    .show()
                {
                    tracing::warn!(error = %e, "Failed to show desktop alert");
                }
            });
        }
    }
}

#[cfg(not(feature = "notify"))]
mod stub_impl {
    use super::*;

    /// Shows a desktop notification for each newly pushed record.
    #[derive(Debug, Clone, Default)]
    pub struct DesktopAlertService;

    impl DesktopAlertService {
        /// Creates the service; a disabled one ignores every alert.
        #[must_use]
        pub const fn new(_enabled: bool) -> Self {
            Self
        }

        /// Whether alerts are actually shown.
        #[must_use]
        pub const fn is_enabled(&self) -> bool {
            false
        }
    }

    impl AlertPort for DesktopAlertService {
        fn send(&self, title: &str, _body: &str) {
            tracing::debug!(title = title, "Desktop alerts not compiled in");
        }
    }
}

#[cfg(feature = "notify")]
pub use notify_impl::DesktopAlertService;
#[cfg(not(feature = "notify"))]
pub use stub_impl::DesktopAlertService;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_service_is_silent() {
        let service = DesktopAlertService::new(false);
        assert!(!service.is_enabled());
        service.send("New booking", "Jazz trio on Friday");
    }
}
