//! No-op execution adapter.
//!
//! Performs no venue interaction: every call is logged with full
//! parameters, tagged dry-run, and answered with a synthetic success
//! carrying no order id. Exists so the rest of the system can run
//! end-to-end without a live venue.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use crate::models::{AccountSnapshot, IntentId};

use super::adapter::{AdapterError, AdapterResult, CancelReport, ExecutionAdapter, OrderRequest};

/// Adapter that logs intent without placing orders.
#[derive(Debug)]
pub struct NoopAdapter {
    order_tag_prefix: String,
    calls: AtomicU64,
}

impl NoopAdapter {
    /// Create a no-op adapter owning orders tagged with `order_tag_prefix`.
    #[must_use]
    pub fn new(order_tag_prefix: impl Into<String>) -> Self {
        Self {
            order_tag_prefix: order_tag_prefix.into(),
            calls: AtomicU64::new(0),
        }
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    fn log_order(&self, op: &'static str, req: &OrderRequest, now: DateTime<Utc>) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        info!(
            dry_run = true,
            op = op,
            intent_id = %req.intent_id,
            instrument = %req.instrument,
            direction = %req.direction,
            quantity = %req.quantity,
            limit_price = req.limit_price.map(|p| p.to_string()).unwrap_or_default(),
            stop_price = req.stop_price.map(|p| p.to_string()).unwrap_or_default(),
            at = %now.to_rfc3339(),
            "No-op adapter call"
        );
    }
}

#[async_trait]
impl ExecutionAdapter for NoopAdapter {
    async fn submit_entry_order(&self, req: &OrderRequest, now: DateTime<Utc>) -> AdapterResult {
        self.log_order("submit_entry_order", req, now);
        AdapterResult::ok(None)
    }

    async fn submit_stop_entry_order(
        &self,
        req: &OrderRequest,
        now: DateTime<Utc>,
    ) -> AdapterResult {
        self.log_order("submit_stop_entry_order", req, now);
        AdapterResult::ok(None)
    }

    async fn submit_protective_stop(
        &self,
        req: &OrderRequest,
        now: DateTime<Utc>,
    ) -> AdapterResult {
        self.log_order("submit_protective_stop", req, now);
        AdapterResult::ok(None)
    }

    async fn submit_target_order(&self, req: &OrderRequest, now: DateTime<Utc>) -> AdapterResult {
        self.log_order("submit_target_order", req, now);
        AdapterResult::ok(None)
    }

    async fn modify_stop_to_break_even(
        &self,
        intent_id: &IntentId,
        instrument: &str,
        break_even_price: Decimal,
        now: DateTime<Utc>,
    ) -> AdapterResult {
        self.calls.fetch_add(1, Ordering::Relaxed);
        info!(
            dry_run = true,
            op = "modify_stop_to_break_even",
            intent_id = %intent_id,
            instrument = instrument,
            break_even_price = %break_even_price,
            at = %now.to_rfc3339(),
            "No-op adapter call"
        );
        AdapterResult::ok(None)
    }

    async fn flatten(
        &self,
        intent_id: &IntentId,
        instrument: &str,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> AdapterResult {
        self.calls.fetch_add(1, Ordering::Relaxed);
        info!(
            dry_run = true,
            op = "flatten",
            intent_id = %intent_id,
            instrument = instrument,
            quantity = %quantity,
            at = %now.to_rfc3339(),
            "No-op adapter call"
        );
        AdapterResult::ok(None)
    }

    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, AdapterError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        info!(dry_run = true, op = "get_account_snapshot", "No-op adapter call");
        Ok(AccountSnapshot {
            working_orders: Vec::new(),
            positions: Vec::new(),
            taken_at: Utc::now().to_rfc3339(),
        })
    }

    async fn cancel_owned_working_orders(
        &self,
        snapshot: &AccountSnapshot,
        now: DateTime<Utc>,
    ) -> CancelReport {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let owned = snapshot.owned_orders(&self.order_tag_prefix);
        let skipped = snapshot.working_orders.len() - owned.len();
        for order in &owned {
            info!(
                dry_run = true,
                op = "cancel_owned_working_orders",
                order_id = %order.order_id,
                tag = %order.tag,
                at = %now.to_rfc3339(),
                "No-op adapter would cancel order"
            );
        }
        CancelReport {
            cancelled: owned.iter().map(|o| o.order_id.clone()).collect(),
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Direction, WorkingOrder};
    use rust_decimal_macros::dec;

    fn request() -> OrderRequest {
        OrderRequest {
            intent_id: IntentId::Derived {
                id: "abc".to_string(),
            },
            instrument: "MNQ".to_string(),
            direction: Direction::Long,
            quantity: dec!(2),
            limit_price: Some(dec!(21000.25)),
            stop_price: None,
        }
    }

    #[tokio::test]
    async fn test_orders_succeed_with_no_order_id() {
        let adapter = NoopAdapter::new("safetycore-");
        let result = adapter.submit_entry_order(&request(), Utc::now()).await;
        assert!(result.success);
        assert!(result.order_id.is_none());
        assert!(result.message.is_none());
        assert_eq!(adapter.call_count(), 1);
    }

    #[tokio::test]
    async fn test_cancel_filters_to_owned_orders() {
        let adapter = NoopAdapter::new("safetycore-");
        let snapshot = AccountSnapshot {
            working_orders: vec![
                WorkingOrder {
                    order_id: "1".to_string(),
                    instrument: "MNQ".to_string(),
                    tag: "SafetyCore-x".to_string(),
                    quantity: dec!(1),
                },
                WorkingOrder {
                    order_id: "2".to_string(),
                    instrument: "MNQ".to_string(),
                    tag: "manual".to_string(),
                    quantity: dec!(1),
                },
            ],
            positions: vec![],
            taken_at: Utc::now().to_rfc3339(),
        };

        let report = adapter
            .cancel_owned_working_orders(&snapshot, Utc::now())
            .await;
        assert_eq!(report.cancelled, vec!["1".to_string()]);
        assert_eq!(report.skipped, 1);
    }

    #[tokio::test]
    async fn test_account_snapshot_is_empty() {
        let adapter = NoopAdapter::new("safetycore-");
        let snapshot = adapter.get_account_snapshot().await.unwrap();
        assert!(snapshot.working_orders.is_empty());
        assert!(snapshot.positions.is_empty());
    }
}
