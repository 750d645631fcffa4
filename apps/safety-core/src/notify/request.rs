//! Notification request and priority levels.

use serde::{Deserialize, Serialize};

/// Delivery priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Informational; may be dropped under backpressure.
    Normal,
    /// Important; never dropped by the queue policy.
    High,
    /// Requires operator acknowledgement; never dropped, rate limited per
    /// event type.
    Emergency,
}

impl Priority {
    /// Numeric level the push endpoint expects.
    #[must_use]
    pub const fn level(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::High => 1,
            Self::Emergency => 2,
        }
    }

    /// Whether the queue may drop this priority at capacity.
    #[must_use]
    pub const fn droppable(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

/// One operator alert. Transient: never persisted, lost on process crash
/// by design — ledger entries are durable, notifications are best-effort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    /// Dedup/rate-limit bucket, usually the event type name.
    pub key: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub message: String,
    /// Delivery priority.
    pub priority: Priority,
}

impl NotificationRequest {
    /// Build a request.
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            message: message.into(),
            priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_levels() {
        assert_eq!(Priority::Normal.level(), 0);
        assert_eq!(Priority::High.level(), 1);
        assert_eq!(Priority::Emergency.level(), 2);
    }

    #[test]
    fn test_only_normal_is_droppable() {
        assert!(Priority::Normal.droppable());
        assert!(!Priority::High.droppable());
        assert!(!Priority::Emergency.droppable());
    }
}
