//! In-memory per-run execution counters.
//!
//! Independent of the ledger: these counters exist for a single run's
//! end-of-run audit export and are not persisted.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::audit::AuditEvent;

/// Run counters for submitted/filled/rejected/blocked orders.
#[derive(Debug, Default)]
pub struct ExecutionSummary {
    orders_submitted: AtomicU64,
    orders_filled: AtomicU64,
    orders_rejected: AtomicU64,
    orders_blocked: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummarySnapshot {
    /// Orders submitted to the adapter.
    pub orders_submitted: u64,
    /// Fill events recorded.
    pub orders_filled: u64,
    /// Adapter rejections.
    pub orders_rejected: u64,
    /// Actions blocked by the risk gate or idempotency check.
    pub orders_blocked: u64,
}

impl ExecutionSummary {
    /// Create zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a submission.
    pub fn record_submitted(&self) {
        self.orders_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a fill event.
    pub fn record_filled(&self) {
        self.orders_filled.fetch_add(1, Ordering::Relaxed);
    }

    /// Count an adapter rejection.
    pub fn record_rejected(&self) {
        self.orders_rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a blocked action.
    pub fn record_blocked(&self) {
        self.orders_blocked.fetch_add(1, Ordering::Relaxed);
    }

    /// Snapshot the counters.
    #[must_use]
    pub fn snapshot(&self) -> SummarySnapshot {
        SummarySnapshot {
            orders_submitted: self.orders_submitted.load(Ordering::Relaxed),
            orders_filled: self.orders_filled.load(Ordering::Relaxed),
            orders_rejected: self.orders_rejected.load(Ordering::Relaxed),
            orders_blocked: self.orders_blocked.load(Ordering::Relaxed),
        }
    }

    /// Build the end-of-run audit event.
    #[must_use]
    pub fn export_event(&self) -> AuditEvent {
        let snapshot = self.snapshot();
        AuditEvent::new("RUN_SUMMARY")
            .with("orders_submitted", snapshot.orders_submitted.to_string())
            .with("orders_filled", snapshot.orders_filled.to_string())
            .with("orders_rejected", snapshot.orders_rejected.to_string())
            .with("orders_blocked", snapshot.orders_blocked.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let summary = ExecutionSummary::new();
        summary.record_submitted();
        summary.record_submitted();
        summary.record_filled();
        summary.record_rejected();
        summary.record_blocked();

        let snapshot = summary.snapshot();
        assert_eq!(snapshot.orders_submitted, 2);
        assert_eq!(snapshot.orders_filled, 1);
        assert_eq!(snapshot.orders_rejected, 1);
        assert_eq!(snapshot.orders_blocked, 1);
    }

    #[test]
    fn test_export_event_payload() {
        let summary = ExecutionSummary::new();
        summary.record_submitted();
        let event = summary.export_event();
        assert_eq!(event.payload.get("orders_submitted").unwrap(), "1");
        assert_eq!(event.payload.get("orders_blocked").unwrap(), "0");
    }
}
