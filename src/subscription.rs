//! Subscription liveness tracking
//!
//! Consoles push updates only while a subscription is renewed inside their
//! timeout. The monitor records when anything last arrived and decides when
//! the link is considered lost or recovered. It does no I/O; the renewal
//! task in `mixer` drives it with the current instant.

use std::time::Duration;
use tokio::time::Instant;

/// Where the subscription currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No subscription
    Idle,
    /// Subscription request sent, not yet confirmed
    Subscribing,
    /// Messages arrive inside the liveness window
    Active,
    /// Silent for longer than the liveness window
    Degraded,
}

/// Edge reported by [`LivenessMonitor::evaluate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Lost,
    Recovered,
}

#[derive(Debug)]
pub struct LivenessMonitor {
    state: LinkState,
    window: Duration,
    last_message_at: Option<Instant>,
}

impl LivenessMonitor {
    pub fn new(window: Duration) -> Self {
        Self {
            state: LinkState::Idle,
            window,
            last_message_at: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn last_message_at(&self) -> Option<Instant> {
        self.last_message_at
    }

    /// Any inbound message counts, mapped or not
    pub fn observe(&mut self, now: Instant) {
        self.last_message_at = Some(now);
    }

    pub fn begin_subscribe(&mut self) {
        self.state = LinkState::Subscribing;
    }

    /// Subscription request went out; start the window from now
    pub fn subscribed(&mut self, now: Instant) {
        self.state = LinkState::Active;
        self.last_message_at = Some(now);
    }

    /// Whether the last message is recent enough
    pub fn is_connected(&self, now: Instant) -> bool {
        self.last_message_at
            .is_some_and(|at| now.saturating_duration_since(at) <= self.window)
    }

    /// Re-check liveness. Returns the edge, if the state flipped.
    ///
    /// Only `Active` and `Degraded` take part; `Idle` and `Subscribing`
    /// never transition here.
    pub fn evaluate(&mut self, now: Instant) -> Option<Transition> {
        let connected = self.is_connected(now);
        match (self.state, connected) {
            (LinkState::Active, false) => {
                self.state = LinkState::Degraded;
                Some(Transition::Lost)
            },
            (LinkState::Degraded, true) => {
                self.state = LinkState::Active;
                Some(Transition::Recovered)
            },
            _ => None,
        }
    }

    /// Back to `Idle`. The last message time is kept for diagnostics.
    pub fn reset(&mut self) {
        self.state = LinkState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(15);

    #[test]
    fn test_idle_until_subscribed() {
        let now = Instant::now();
        let mut monitor = LivenessMonitor::new(WINDOW);
        assert_eq!(monitor.state(), LinkState::Idle);
        assert!(!monitor.is_connected(now));
        assert_eq!(monitor.evaluate(now), None);

        monitor.begin_subscribe();
        assert_eq!(monitor.state(), LinkState::Subscribing);
        assert_eq!(monitor.evaluate(now + WINDOW * 2), None);

        monitor.subscribed(now);
        assert_eq!(monitor.state(), LinkState::Active);
        assert!(monitor.is_connected(now));
    }

    #[test]
    fn test_lost_then_recovered() {
        let start = Instant::now();
        let mut monitor = LivenessMonitor::new(WINDOW);
        monitor.subscribed(start);

        // Exactly at the window edge still counts as connected
        assert_eq!(monitor.evaluate(start + WINDOW), None);

        let late = start + WINDOW + Duration::from_millis(1);
        assert_eq!(monitor.evaluate(late), Some(Transition::Lost));
        assert_eq!(monitor.state(), LinkState::Degraded);
        // Reported once
        assert_eq!(monitor.evaluate(late), None);

        monitor.observe(late);
        assert_eq!(monitor.evaluate(late), Some(Transition::Recovered));
        assert_eq!(monitor.state(), LinkState::Active);
        assert_eq!(monitor.evaluate(late), None);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let now = Instant::now();
        let mut monitor = LivenessMonitor::new(WINDOW);
        monitor.subscribed(now);
        monitor.reset();
        assert_eq!(monitor.state(), LinkState::Idle);
        assert_eq!(monitor.last_message_at(), Some(now));
        assert_eq!(monitor.evaluate(now + WINDOW * 2), None);
    }
}
