//! Trading intent identity.
//!
//! An intent is one decided-but-not-yet-settled trading action: an entry,
//! its protective stop, and its target. The identifier is derived from the
//! full parameter set, so two signals with identical parameters on the same
//! trading date collapse to the same id. Fills recovered without a trackable
//! origin get a dedicated `Untracked` variant instead of a magic id string,
//! so aggregation can tell the two apart without prefix checks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position direction for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Long exposure (entry buys, exit sells).
    Long,
    /// Short exposure (entry sells, exit buys).
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "Long"),
            Self::Short => write!(f, "Short"),
        }
    }
}

/// Kind of order placed for an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Market/limit entry order.
    Entry,
    /// Stop-entry order (entry triggered at a stop price).
    StopEntry,
    /// Protective stop covering an open entry.
    ProtectiveStop,
    /// Profit target order.
    Target,
    /// Emergency flatten order.
    Flatten,
}

impl OrderKind {
    /// Stable name used in ledger entries and audit events.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Entry => "ENTRY",
            Self::StopEntry => "STOP_ENTRY",
            Self::ProtectiveStop => "PROTECTIVE_STOP",
            Self::Target => "TARGET",
            Self::Flatten => "FLATTEN",
        }
    }
}

/// Full parameter set an intent identifier is derived from.
///
/// Two parameter sets that are field-for-field identical produce the same
/// `IntentId`, which is what makes the ledger's idempotency check collapse
/// duplicate signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntentParams {
    /// Trading date, `YYYY-MM-DD`.
    pub trading_date: String,
    /// Stream (strategy instance) identifier.
    pub stream: String,
    /// Instrument symbol.
    pub instrument: String,
    /// Session name the slot belongs to.
    pub session: String,
    /// Slot end time, `HH:MM`.
    pub slot_time: String,
    /// Position direction.
    pub direction: Direction,
    /// Entry price.
    pub entry_price: Decimal,
    /// Protective stop price.
    pub stop_price: Decimal,
    /// Target price.
    pub target_price: Decimal,
    /// Break-even trigger price.
    pub break_even_price: Decimal,
}

/// Identity of a trading intent.
///
/// `Derived` ids are the normal case. `Untracked` marks exposure discovered
/// at the venue that no ledger entry explains; it only ever originates from
/// a fail-closed flatten.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntentId {
    /// Identifier derived from the full intent parameter set.
    Derived {
        /// The derived key.
        id: String,
    },
    /// A position or fill recovered without a trackable origin.
    Untracked {
        /// Why the origin could not be determined.
        reason: String,
    },
}

impl IntentId {
    /// Derive the identifier for a parameter set.
    ///
    /// The derivation is a pure function of the parameters: identical
    /// parameters always yield the same id.
    #[must_use]
    pub fn derive(params: &IntentParams) -> Self {
        let id = format!(
            "{}-{}-{}-{}-{}-{}-e{}-s{}-t{}-b{}",
            params.trading_date,
            params.stream,
            params.instrument,
            params.session,
            sanitize(&params.slot_time),
            params.direction,
            params.entry_price.normalize(),
            params.stop_price.normalize(),
            params.target_price.normalize(),
            params.break_even_price.normalize(),
        );
        Self::Derived { id }
    }

    /// Construct an untracked identity for a fail-closed flatten.
    #[must_use]
    pub fn untracked(reason: impl Into<String>) -> Self {
        Self::Untracked {
            reason: reason.into(),
        }
    }

    /// Whether this identity came from a fail-closed recovery path.
    #[must_use]
    pub const fn is_untracked(&self) -> bool {
        matches!(self, Self::Untracked { .. })
    }

    /// Filesystem-safe form used in ledger file names.
    #[must_use]
    pub fn file_key(&self) -> String {
        match self {
            Self::Derived { id } => sanitize(id),
            Self::Untracked { reason } => format!("untracked-{}", sanitize(reason)),
        }
    }
}

impl std::fmt::Display for IntentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Derived { id } => write!(f, "{id}"),
            Self::Untracked { reason } => write!(f, "untracked({reason})"),
        }
    }
}

/// Replace characters that are unsafe in file names.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            ':' | '/' | '\\' | ' ' => '-',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_params() -> IntentParams {
        IntentParams {
            trading_date: "2026-01-27".to_string(),
            stream: "S1".to_string(),
            instrument: "MNQ".to_string(),
            session: "morning".to_string(),
            slot_time: "07:30".to_string(),
            direction: Direction::Long,
            entry_price: dec!(21000.25),
            stop_price: dec!(20980.00),
            target_price: dec!(21040.50),
            break_even_price: dec!(21010.25),
        }
    }

    #[test]
    fn test_identical_params_collapse_to_same_id() {
        let a = IntentId::derive(&make_params());
        let b = IntentId::derive(&make_params());
        assert_eq!(a, b);
    }

    #[test]
    fn test_changed_price_changes_id() {
        let a = IntentId::derive(&make_params());
        let mut params = make_params();
        params.entry_price = dec!(21001.25);
        let b = IntentId::derive(&params);
        assert_ne!(a, b);
    }

    #[test]
    fn test_trailing_zeros_do_not_change_id() {
        let a = IntentId::derive(&make_params());
        let mut params = make_params();
        params.stop_price = dec!(20980);
        let b = IntentId::derive(&params);
        assert_eq!(a, b);
    }

    #[test]
    fn test_untracked_is_distinguishable() {
        let id = IntentId::untracked("RECONCILE_ORPHAN");
        assert!(id.is_untracked());
        assert!(!IntentId::derive(&make_params()).is_untracked());
    }

    #[test]
    fn test_file_key_has_no_separators() {
        let id = IntentId::derive(&make_params());
        let key = id.file_key();
        assert!(!key.contains(':'));
        assert!(!key.contains('/'));
        assert!(!key.contains(' '));
    }

    #[test]
    fn test_serde_roundtrip() {
        let id = IntentId::derive(&make_params());
        let json = serde_json::to_string(&id).unwrap();
        let back: IntentId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let untracked = IntentId::untracked("NO_ORIGIN");
        let json = serde_json::to_string(&untracked).unwrap();
        let back: IntentId = serde_json::from_str(&json).unwrap();
        assert_eq!(untracked, back);
    }
}
