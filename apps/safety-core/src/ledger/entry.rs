//! The persisted per-intent journal entry.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{IntentId, OrderKind};

/// Commission, fees, and slippage booked against a trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCosts {
    /// Commission paid.
    pub commission: Decimal,
    /// Exchange and regulatory fees.
    pub fees: Decimal,
    /// Slippage in instrument points.
    pub slippage_points: Decimal,
    /// Slippage in dollars.
    pub slippage_dollars: Decimal,
}

/// One intent's durable execution record. Upsert semantics; immutable once
/// `trade_completed` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Trading date, `YYYY-MM-DD`. Must match the file name's date token.
    pub trading_date: String,
    /// Stream identifier.
    pub stream: String,
    /// Intent identity.
    pub intent_id: IntentId,
    /// Instrument symbol, set on first fill.
    #[serde(default)]
    pub instrument: String,

    /// An entry order was submitted for this intent.
    #[serde(default)]
    pub entry_submitted: bool,
    /// Entry submission time.
    #[serde(default)]
    pub entry_submitted_at: Option<DateTime<Utc>>,
    /// Kind of the entry order submitted.
    #[serde(default)]
    pub entry_order_kind: Option<OrderKind>,
    /// An exit-side order (stop/target/flatten) was submitted.
    #[serde(default)]
    pub exit_submitted: bool,
    /// Exit submission time.
    #[serde(default)]
    pub exit_submitted_at: Option<DateTime<Utc>>,

    /// Cumulative entry-side filled quantity.
    #[serde(default)]
    pub entry_filled_qty: Decimal,
    /// Fill-weighted average entry price.
    #[serde(default)]
    pub entry_avg_fill_price: Decimal,
    /// Cumulative exit-side filled quantity.
    #[serde(default)]
    pub exit_filled_qty: Decimal,
    /// Fill-weighted average exit price.
    #[serde(default)]
    pub exit_avg_fill_price: Decimal,

    /// Costs booked so far.
    #[serde(default)]
    pub costs: TradeCosts,

    /// Terminal flag; no writes are permitted after it is set.
    #[serde(default)]
    pub trade_completed: bool,
    /// Why the trade completed (target, stop, flatten, session end).
    #[serde(default)]
    pub completion_reason: Option<String>,
    /// Completion time, UTC.
    #[serde(default)]
    pub completed_at_utc: Option<DateTime<Utc>>,
    /// Realized P&L net of costs.
    #[serde(default)]
    pub realized_pnl_net: Decimal,
    /// Realized P&L before costs.
    #[serde(default)]
    pub realized_pnl_gross: Decimal,
    /// Realized P&L in instrument points.
    #[serde(default)]
    pub realized_pnl_points: Decimal,
}

impl JournalEntry {
    /// A fresh, unsubmitted entry for the given key fields.
    #[must_use]
    pub fn new(trading_date: &str, stream: &str, intent_id: IntentId) -> Self {
        Self {
            trading_date: trading_date.to_string(),
            stream: stream.to_string(),
            intent_id,
            instrument: String::new(),
            entry_submitted: false,
            entry_submitted_at: None,
            entry_order_kind: None,
            exit_submitted: false,
            exit_submitted_at: None,
            entry_filled_qty: Decimal::ZERO,
            entry_avg_fill_price: Decimal::ZERO,
            exit_filled_qty: Decimal::ZERO,
            exit_avg_fill_price: Decimal::ZERO,
            costs: TradeCosts::default(),
            trade_completed: false,
            completion_reason: None,
            completed_at_utc: None,
            realized_pnl_net: Decimal::ZERO,
            realized_pnl_gross: Decimal::ZERO,
            realized_pnl_points: Decimal::ZERO,
        }
    }

    /// Fold a fill into the entry side, keeping the fill-weighted average.
    pub fn apply_entry_fill(&mut self, fill_price: Decimal, fill_qty: Decimal) {
        (self.entry_avg_fill_price, self.entry_filled_qty) = weighted_fill(
            self.entry_avg_fill_price,
            self.entry_filled_qty,
            fill_price,
            fill_qty,
        );
    }

    /// Fold a fill into the exit side, keeping the fill-weighted average.
    pub fn apply_exit_fill(&mut self, fill_price: Decimal, fill_qty: Decimal) {
        (self.exit_avg_fill_price, self.exit_filled_qty) = weighted_fill(
            self.exit_avg_fill_price,
            self.exit_filled_qty,
            fill_price,
            fill_qty,
        );
    }

    /// Whether the trade counts as a win for rollup purposes.
    #[must_use]
    pub fn is_win(&self) -> bool {
        self.trade_completed && self.realized_pnl_net > Decimal::ZERO
    }

    /// Whether the trade counts as a loss for rollup purposes.
    #[must_use]
    pub fn is_loss(&self) -> bool {
        self.trade_completed && self.realized_pnl_net < Decimal::ZERO
    }
}

fn weighted_fill(
    avg: Decimal,
    total: Decimal,
    fill_price: Decimal,
    fill_qty: Decimal,
) -> (Decimal, Decimal) {
    let new_total = total + fill_qty;
    if new_total <= Decimal::ZERO {
        return (avg, new_total);
    }
    let new_avg = (avg * total + fill_price * fill_qty) / new_total;
    (new_avg, new_total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry() -> JournalEntry {
        JournalEntry::new(
            "2026-01-27",
            "S1",
            IntentId::Derived {
                id: "abc".to_string(),
            },
        )
    }

    #[test]
    fn test_weighted_average_accumulates() {
        let mut e = entry();
        e.apply_entry_fill(dec!(100), dec!(2));
        e.apply_entry_fill(dec!(103), dec!(1));

        assert_eq!(e.entry_filled_qty, dec!(3));
        assert_eq!(e.entry_avg_fill_price, dec!(101));
    }

    #[test]
    fn test_first_fill_sets_average() {
        let mut e = entry();
        e.apply_exit_fill(dec!(21010.25), dec!(3));
        assert_eq!(e.exit_avg_fill_price, dec!(21010.25));
        assert_eq!(e.exit_filled_qty, dec!(3));
    }

    #[test]
    fn test_serde_roundtrip_with_missing_fields() {
        // Older files may lack newer fields; serde defaults must cover them.
        let json = r#"{
            "trading_date": "2026-01-27",
            "stream": "S1",
            "intent_id": {"kind": "derived", "id": "abc"},
            "entry_submitted": true
        }"#;
        let e: JournalEntry = serde_json::from_str(json).unwrap();
        assert!(e.entry_submitted);
        assert!(!e.trade_completed);
        assert_eq!(e.entry_filled_qty, Decimal::ZERO);
    }
}
