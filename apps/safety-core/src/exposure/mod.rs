//! Per-intent exposure tracking.
//!
//! Keeps each intent's fill bookkeeping independent of all others. No
//! per-instrument aggregation happens here; rollups are derived from
//! completed ledger entries by the analytics layer.

use std::collections::HashMap;
use std::sync::Mutex;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Direction, IntentId};

/// Lifecycle state of an intent's exposure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExposureState {
    /// Position may still be open or filling.
    Active,
    /// Cumulative exit fills covered cumulative entry fills.
    Closed,
    /// Terminal error state entered via explicit failure; never
    /// auto-recovers.
    StandingDown,
}

/// Identity captured when an exposure record is created.
#[derive(Debug, Clone, Default)]
pub struct ExposureIdentity {
    /// Stream identifier.
    pub stream: String,
    /// Instrument symbol.
    pub instrument: String,
    /// Position direction.
    pub direction: Option<Direction>,
    /// Originally intended size.
    pub intended_qty: Decimal,
}

/// One intent's fill bookkeeping.
#[derive(Debug, Clone)]
pub struct IntentExposure {
    /// Intent this exposure belongs to.
    pub intent_id: IntentId,
    /// Identity captured at creation.
    pub identity: ExposureIdentity,
    /// Cumulative entry-side fill quantity. Monotonically non-decreasing.
    pub entry_filled_qty: Decimal,
    /// Cumulative exit-side fill quantity. Monotonically non-decreasing.
    pub exit_filled_qty: Decimal,
    /// Current lifecycle state.
    pub state: ExposureState,
    /// Reason recorded when standing down.
    pub stand_down_reason: Option<String>,
}

impl IntentExposure {
    fn new(intent_id: IntentId, identity: ExposureIdentity) -> Self {
        Self {
            intent_id,
            identity,
            entry_filled_qty: Decimal::ZERO,
            exit_filled_qty: Decimal::ZERO,
            state: ExposureState::Active,
            stand_down_reason: None,
        }
    }

    /// Net quantity currently at risk: entry fills minus exit fills.
    #[must_use]
    pub fn remaining_exposure(&self) -> Decimal {
        self.entry_filled_qty - self.exit_filled_qty
    }

    fn refresh_state(&mut self) {
        if self.state == ExposureState::StandingDown {
            return;
        }
        if self.entry_filled_qty > Decimal::ZERO && self.exit_filled_qty >= self.entry_filled_qty {
            self.state = ExposureState::Closed;
        }
    }
}

/// Outcome of applying a fill to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// The fill was applied.
    Recorded {
        /// State after applying the fill.
        state: ExposureState,
    },
    /// The intent is standing down; the fill was ignored and must be
    /// alerted by the caller.
    RejectedStandingDown,
}

/// Tracks exposure for every intent seen in this run.
///
/// Records are never deleted within a run; terminal states persist for
/// audit. A fill against an unknown intent creates the record implicitly:
/// a real fill is never dropped because bookkeeping didn't expect it.
#[derive(Debug, Default)]
pub struct IntentExposureTracker {
    inner: Mutex<HashMap<IntentId, IntentExposure>>,
}

impl IntentExposureTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an intent on first entry-order submission.
    ///
    /// Idempotent: an existing record (any state) is left untouched.
    pub fn register(&self, intent_id: &IntentId, identity: ExposureIdentity) {
        let mut inner = self.lock();
        inner
            .entry(intent_id.clone())
            .or_insert_with(|| IntentExposure::new(intent_id.clone(), identity));
    }

    /// Apply an entry-side fill.
    pub fn on_entry_fill(&self, intent_id: &IntentId, qty: Decimal) -> FillOutcome {
        let mut inner = self.lock();
        let exposure = inner
            .entry(intent_id.clone())
            .or_insert_with(|| IntentExposure::new(intent_id.clone(), ExposureIdentity::default()));

        if exposure.state == ExposureState::StandingDown {
            tracing::error!(
                intent_id = %intent_id,
                qty = %qty,
                "Entry fill against standing-down intent ignored"
            );
            return FillOutcome::RejectedStandingDown;
        }

        exposure.entry_filled_qty += qty;
        exposure.refresh_state();
        FillOutcome::Recorded {
            state: exposure.state,
        }
    }

    /// Apply an exit-side fill.
    ///
    /// Exit fills are applied even when standing down: reducing exposure is
    /// always legal, it just can't move the state away from
    /// `StandingDown`.
    pub fn on_exit_fill(&self, intent_id: &IntentId, qty: Decimal) -> FillOutcome {
        let mut inner = self.lock();
        let exposure = inner
            .entry(intent_id.clone())
            .or_insert_with(|| IntentExposure::new(intent_id.clone(), ExposureIdentity::default()));

        exposure.exit_filled_qty += qty;
        exposure.refresh_state();
        FillOutcome::Recorded {
            state: exposure.state,
        }
    }

    /// Force-transition an intent to `StandingDown`.
    ///
    /// Used exclusively on protective-order failure or a fail-closed error
    /// path. Creates the record if missing so the failure is tracked.
    pub fn stand_down(&self, intent_id: &IntentId, reason: &str) {
        let mut inner = self.lock();
        let exposure = inner
            .entry(intent_id.clone())
            .or_insert_with(|| IntentExposure::new(intent_id.clone(), ExposureIdentity::default()));
        exposure.state = ExposureState::StandingDown;
        exposure.stand_down_reason = Some(reason.to_string());
        tracing::error!(intent_id = %intent_id, reason = reason, "Intent standing down");
    }

    /// Snapshot one intent's exposure.
    #[must_use]
    pub fn get(&self, intent_id: &IntentId) -> Option<IntentExposure> {
        self.lock().get(intent_id).cloned()
    }

    /// Snapshot every tracked exposure.
    #[must_use]
    pub fn all(&self) -> Vec<IntentExposure> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IntentId, IntentExposure>> {
        // Lock poisoning means a panic mid-update on another thread; the
        // map is still the best available state, so keep serving it.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn intent(n: u32) -> IntentId {
        IntentId::Derived {
            id: format!("intent-{n}"),
        }
    }

    #[test]
    fn test_fill_creates_record_implicitly() {
        let tracker = IntentExposureTracker::new();
        let id = intent(1);

        let outcome = tracker.on_entry_fill(&id, dec!(2));
        assert_eq!(
            outcome,
            FillOutcome::Recorded {
                state: ExposureState::Active
            }
        );

        let exposure = tracker.get(&id).unwrap();
        assert_eq!(exposure.entry_filled_qty, dec!(2));
        assert_eq!(exposure.remaining_exposure(), dec!(2));
    }

    #[test]
    fn test_closed_iff_exit_covers_entry() {
        let tracker = IntentExposureTracker::new();
        let id = intent(1);

        tracker.on_entry_fill(&id, dec!(3));
        tracker.on_exit_fill(&id, dec!(2));
        assert_eq!(tracker.get(&id).unwrap().state, ExposureState::Active);

        tracker.on_exit_fill(&id, dec!(1));
        let exposure = tracker.get(&id).unwrap();
        assert_eq!(exposure.state, ExposureState::Closed);
        assert_eq!(exposure.remaining_exposure(), Decimal::ZERO);
    }

    #[test]
    fn test_exit_without_entry_does_not_close() {
        let tracker = IntentExposureTracker::new();
        let id = intent(1);

        // exit >= entry but entry == 0: not closed.
        tracker.on_exit_fill(&id, dec!(1));
        assert_eq!(tracker.get(&id).unwrap().state, ExposureState::Active);
    }

    #[test]
    fn test_stand_down_is_terminal() {
        let tracker = IntentExposureTracker::new();
        let id = intent(1);

        tracker.on_entry_fill(&id, dec!(2));
        tracker.stand_down(&id, "PROTECTIVE_ORDER_FAILED");

        // Entry fills are rejected outright.
        assert_eq!(
            tracker.on_entry_fill(&id, dec!(1)),
            FillOutcome::RejectedStandingDown
        );
        assert_eq!(tracker.get(&id).unwrap().entry_filled_qty, dec!(2));

        // Exit fills reduce exposure but never change state.
        tracker.on_exit_fill(&id, dec!(5));
        let exposure = tracker.get(&id).unwrap();
        assert_eq!(exposure.state, ExposureState::StandingDown);
        assert_eq!(
            exposure.stand_down_reason.as_deref(),
            Some("PROTECTIVE_ORDER_FAILED")
        );
    }

    #[test]
    fn test_stand_down_creates_missing_record() {
        let tracker = IntentExposureTracker::new();
        let id = intent(9);
        tracker.stand_down(&id, "FAIL_CLOSED");
        assert_eq!(tracker.get(&id).unwrap().state, ExposureState::StandingDown);
    }

    #[test]
    fn test_intents_are_independent() {
        let tracker = IntentExposureTracker::new();
        tracker.on_entry_fill(&intent(1), dec!(2));
        tracker.on_entry_fill(&intent(2), dec!(4));
        tracker.on_exit_fill(&intent(1), dec!(2));

        assert_eq!(tracker.get(&intent(1)).unwrap().state, ExposureState::Closed);
        assert_eq!(tracker.get(&intent(2)).unwrap().state, ExposureState::Active);
        assert_eq!(tracker.all().len(), 2);
    }

    #[test]
    fn test_register_is_idempotent() {
        let tracker = IntentExposureTracker::new();
        let id = intent(1);
        tracker.register(
            &id,
            ExposureIdentity {
                stream: "S1".to_string(),
                instrument: "MNQ".to_string(),
                direction: Some(Direction::Long),
                intended_qty: dec!(2),
            },
        );
        tracker.on_entry_fill(&id, dec!(2));
        tracker.register(&id, ExposureIdentity::default());

        let exposure = tracker.get(&id).unwrap();
        assert_eq!(exposure.entry_filled_qty, dec!(2));
        assert_eq!(exposure.identity.stream, "S1");
    }
}
