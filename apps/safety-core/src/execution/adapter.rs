//! Execution adapter capability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{AccountSnapshot, Direction, IntentId};

/// Errors from account-state queries.
///
/// Order placement itself never returns `Err`: submission failure is a
/// normal outcome reported through [`AdapterResult::success`], and the
/// caller decides retry/stand-down policy.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The venue connection is unavailable.
    #[error("Adapter unavailable: {0}")]
    Unavailable(String),

    /// The venue returned an unusable response.
    #[error("Adapter protocol error: {0}")]
    Protocol(String),
}

/// Outcome of a submission, modification, or flatten call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterResult {
    /// Whether the venue accepted the request.
    pub success: bool,
    /// Error message on failure.
    pub message: Option<String>,
    /// Adapter-assigned order id; `None` for adapters that place nothing.
    pub order_id: Option<String>,
}

impl AdapterResult {
    /// A successful result with an optional order id.
    #[must_use]
    pub const fn ok(order_id: Option<String>) -> Self {
        Self {
            success: true,
            message: None,
            order_id,
        }
    }

    /// A failed result with a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            order_id: None,
        }
    }
}

/// Report from a mass-cancel of owned working orders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CancelReport {
    /// Order ids cancelled.
    pub cancelled: Vec<String>,
    /// Working orders skipped because this system does not own them.
    pub skipped: usize,
}

/// Parameters for one order placement.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Intent the order belongs to.
    pub intent_id: IntentId,
    /// Instrument symbol.
    pub instrument: String,
    /// Position direction.
    pub direction: Direction,
    /// Order quantity.
    pub quantity: Decimal,
    /// Limit price, if any.
    pub limit_price: Option<Decimal>,
    /// Stop/trigger price, if any.
    pub stop_price: Option<Decimal>,
}

/// Capability for submitting, modifying, and cancelling orders and for
/// reporting account state.
///
/// Implementations: the [`super::NoopAdapter`] reference variant places
/// nothing, so the ledger, exposure tracking, and notifications can be
/// exercised end-to-end without a venue; a live adapter is wired in at
/// composition time and is not part of this core.
#[async_trait]
pub trait ExecutionAdapter: Send + Sync {
    /// Submit a market/limit entry order.
    async fn submit_entry_order(&self, req: &OrderRequest, now: DateTime<Utc>) -> AdapterResult;

    /// Submit a stop-entry order.
    async fn submit_stop_entry_order(
        &self,
        req: &OrderRequest,
        now: DateTime<Utc>,
    ) -> AdapterResult;

    /// Submit the protective stop covering an open entry.
    async fn submit_protective_stop(&self, req: &OrderRequest, now: DateTime<Utc>)
    -> AdapterResult;

    /// Submit the profit target order.
    async fn submit_target_order(&self, req: &OrderRequest, now: DateTime<Utc>) -> AdapterResult;

    /// Move an existing protective stop to the break-even price.
    async fn modify_stop_to_break_even(
        &self,
        intent_id: &IntentId,
        instrument: &str,
        break_even_price: Decimal,
        now: DateTime<Utc>,
    ) -> AdapterResult;

    /// Force a position to zero. Never gated; must always be attempted.
    async fn flatten(
        &self,
        intent_id: &IntentId,
        instrument: &str,
        quantity: Decimal,
        now: DateTime<Utc>,
    ) -> AdapterResult;

    /// Current account state.
    ///
    /// # Errors
    ///
    /// Returns an error if the venue cannot report state; callers treat
    /// that ambiguity as fail-closed.
    async fn get_account_snapshot(&self) -> Result<AccountSnapshot, AdapterError>;

    /// Cancel every working order in `snapshot` owned by this system.
    ///
    /// Ownership is a case-insensitive prefix match on the order tag;
    /// orders another system placed are never touched.
    async fn cancel_owned_working_orders(
        &self,
        snapshot: &AccountSnapshot,
        now: DateTime<Utc>,
    ) -> CancelReport;
}
