//! Per-event-type rate limiting for emergency notifications.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Enforces a minimum re-notify interval per event type.
///
/// The timestamp is updated when the check passes, before the send is
/// attempted, so two concurrent callers cannot both pass the check for the
/// same event type.
#[derive(Debug)]
pub struct EmergencyRateLimiter {
    min_interval: Duration,
    last_passed: Mutex<HashMap<String, Instant>>,
}

impl EmergencyRateLimiter {
    /// Create a limiter with the given minimum interval.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_passed: Mutex::new(HashMap::new()),
        }
    }

    /// Whether a notification for `event_type` may be sent now.
    ///
    /// Passing consumes the slot: the stored timestamp is advanced
    /// immediately, not after the send completes.
    pub fn should_send(&self, event_type: &str) -> bool {
        let now = Instant::now();
        let mut last_passed = self
            .last_passed
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        match last_passed.get(event_type) {
            Some(last) if now.duration_since(*last) < self.min_interval => false,
            _ => {
                last_passed.insert(event_type.to_string(), now);
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_send_within_interval_blocked() {
        let limiter = EmergencyRateLimiter::new(Duration::from_secs(60));
        assert!(limiter.should_send("LEDGER_CORRUPT"));
        assert!(!limiter.should_send("LEDGER_CORRUPT"));
    }

    #[test]
    fn test_event_types_are_independent() {
        let limiter = EmergencyRateLimiter::new(Duration::from_secs(60));
        assert!(limiter.should_send("LEDGER_CORRUPT"));
        assert!(limiter.should_send("STAND_DOWN"));
    }

    #[test]
    fn test_send_allowed_after_interval() {
        let limiter = EmergencyRateLimiter::new(Duration::from_millis(30));
        assert!(limiter.should_send("STALL"));
        assert!(!limiter.should_send("STALL"));
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.should_send("STALL"));
    }

    #[test]
    fn test_zero_interval_always_allows() {
        let limiter = EmergencyRateLimiter::new(Duration::ZERO);
        assert!(limiter.should_send("X"));
        assert!(limiter.should_send("X"));
    }
}
