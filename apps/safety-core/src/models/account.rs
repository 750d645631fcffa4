//! Account state reported by an execution adapter.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A working (unfilled, uncancelled) order at the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingOrder {
    /// Venue-assigned order id.
    pub order_id: String,
    /// Instrument symbol.
    pub instrument: String,
    /// Order tag / OCO group name set at submission time.
    ///
    /// Orders placed by this system carry the configured tag prefix;
    /// anything else belongs to another system and is never touched.
    pub tag: String,
    /// Remaining quantity.
    pub quantity: Decimal,
}

/// An open position at the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenPosition {
    /// Instrument symbol.
    pub instrument: String,
    /// Signed net quantity (negative = short).
    pub quantity: Decimal,
    /// Average entry price.
    pub avg_price: Decimal,
}

/// Snapshot of venue account state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Working orders, all owners.
    pub working_orders: Vec<WorkingOrder>,
    /// Open positions.
    pub positions: Vec<OpenPosition>,
    /// Snapshot time, RFC 3339 UTC.
    pub taken_at: String,
}

impl AccountSnapshot {
    /// Working orders whose tag starts with `prefix`, case-insensitive.
    #[must_use]
    pub fn owned_orders(&self, prefix: &str) -> Vec<&WorkingOrder> {
        let prefix = prefix.to_ascii_lowercase();
        self.working_orders
            .iter()
            .filter(|o| o.tag.to_ascii_lowercase().starts_with(&prefix))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order(id: &str, tag: &str) -> WorkingOrder {
        WorkingOrder {
            order_id: id.to_string(),
            instrument: "MNQ".to_string(),
            tag: tag.to_string(),
            quantity: dec!(1),
        }
    }

    #[test]
    fn test_owned_orders_prefix_match_is_case_insensitive() {
        let snapshot = AccountSnapshot {
            working_orders: vec![
                order("1", "SAFETYCORE-abc"),
                order("2", "safetycore-def"),
                order("3", "manual-entry"),
                order("4", "OtherBot-xyz"),
            ],
            positions: vec![],
            taken_at: "2026-01-27T12:00:00Z".to_string(),
        };

        let owned = snapshot.owned_orders("SafetyCore-");
        let ids: Vec<&str> = owned.iter().map(|o| o.order_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_owned_orders_empty_snapshot() {
        let snapshot = AccountSnapshot::default();
        assert!(snapshot.owned_orders("SafetyCore-").is_empty());
    }
}
