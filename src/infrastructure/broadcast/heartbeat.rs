use std::time::Duration;

use tokio::time::Instant;

use super::constants::{DEFAULT_ACTIVITY_TIMEOUT, PONG_TIMEOUT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    Wait,
    SendPing,
    Expired,
}

/// Client side of the protocol keepalive.
///
/// After `activity_timeout` without any inbound frame a ping is sent; if
/// nothing arrives within `pong_timeout` after that, the connection is dead.
#[derive(Debug)]
pub struct Keepalive {
    activity_timeout: Duration,
    pong_timeout: Duration,
    last_activity: Instant,
    ping_sent_at: Option<Instant>,
}

impl Keepalive {
    #[must_use]
    pub fn new(now: Instant) -> Self {
        Self {
            activity_timeout: DEFAULT_ACTIVITY_TIMEOUT,
            pong_timeout: PONG_TIMEOUT,
            last_activity: now,
            ping_sent_at: None,
        }
    }

    /// Adopts the server's timeout when it asks for a shorter one.
    pub fn set_activity_timeout(&mut self, timeout: Duration) {
        if !timeout.is_zero() {
            self.activity_timeout = self.activity_timeout.min(timeout);
        }
    }

    #[must_use]
    pub const fn activity_timeout(&self) -> Duration {
        self.activity_timeout
    }

    pub fn record_activity(&mut self, now: Instant) {
        self.last_activity = now;
        self.ping_sent_at = None;
    }

    pub fn record_ping_sent(&mut self, now: Instant) {
        self.ping_sent_at = Some(now);
    }

    #[must_use]
    pub fn deadline(&self) -> Instant {
        match self.ping_sent_at {
            Some(sent) => sent + self.pong_timeout,
            None => self.last_activity + self.activity_timeout,
        }
    }

    #[must_use]
    pub fn poll(&self, now: Instant) -> KeepaliveAction {
        if now < self.deadline() {
            KeepaliveAction::Wait
        } else if self.ping_sent_at.is_some() {
            KeepaliveAction::Expired
        } else {
            KeepaliveAction::SendPing
        }
    }
}
