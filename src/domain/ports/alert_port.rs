/// Port for user-facing alerts when a new notification arrives.
pub trait AlertPort: Send + Sync {
    /// Shows an alert.
    fn send(&self, title: &str, body: &str);
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    pub struct MockAlertPort {
        pub alerts: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl MockAlertPort {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    impl AlertPort for MockAlertPort {
        fn send(&self, title: &str, body: &str) {
            self.alerts
                .lock()
                .unwrap()
                .push((title.to_string(), body.to_string()));
        }
    }
}
