//! Order-flow coordination.
//!
//! One place owns the control flow for every order action: risk gates,
//! then the ledger idempotency check, then the adapter call, then
//! bookkeeping and notifications. Nothing below this layer submits on its
//! own, and nothing here talks to a venue except through the adapter.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::audit::{AuditEvent, AuditSink, event_types};
use crate::exposure::{ExposureIdentity, ExposureState, FillOutcome, IntentExposureTracker};
use crate::ledger::{ExecutionLedger, ExecutionSummary, LedgerError, LedgerKey, SubmissionProbe, TradeCosts};
use crate::models::{IntentId, IntentParams, OrderKind};
use crate::notify::{NotificationRequest, Notifier, Priority};
use crate::risk::{GateInputs, RiskGate, RunMode};

use super::adapter::{AdapterError, AdapterResult, CancelReport, ExecutionAdapter, OrderRequest};

/// Errors the coordinator propagates to its caller.
///
/// Blocks, duplicates, and venue rejections are not errors; they are
/// normal [`SubmitOutcome`]s. `Err` means bookkeeping itself failed.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// The ledger refused or failed a write.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The adapter could not report account state.
    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

/// A decided entry to submit.
#[derive(Debug, Clone)]
pub struct EntryCommand {
    /// Full intent parameter set; the intent id derives from this.
    pub params: IntentParams,
    /// Order quantity.
    pub quantity: Decimal,
    /// Live or replay.
    pub mode: RunMode,
    /// Caller-supplied: timetable validation passed.
    pub timetable_validated: bool,
    /// Caller-supplied: stream is armed.
    pub stream_armed: bool,
    /// Place a stop-entry order instead of a limit entry.
    pub stop_entry: bool,
}

impl EntryCommand {
    fn gate_inputs(&self, now: DateTime<Utc>) -> GateInputs<'_> {
        GateInputs {
            mode: self.mode,
            trading_date: &self.params.trading_date,
            stream: &self.params.stream,
            instrument: &self.params.instrument,
            session: &self.params.session,
            slot_time: &self.params.slot_time,
            timetable_validated: self.timetable_validated,
            stream_armed: self.stream_armed,
            now,
        }
    }

    fn ledger_key(&self, intent_id: IntentId) -> LedgerKey {
        LedgerKey::new(&self.params.trading_date, &self.params.stream, intent_id)
    }
}

/// Outcome of an entry submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A gate failed; nothing was sent.
    Blocked {
        /// Short reason string from the failing gate.
        reason: String,
    },
    /// The ledger already records a submission for this intent.
    Duplicate {
        /// The intent that was already submitted.
        intent_id: IntentId,
    },
    /// The adapter refused the order.
    Rejected {
        /// Venue/adapter error message.
        message: String,
    },
    /// The order went out and the ledger recorded it.
    Submitted {
        /// The derived intent.
        intent_id: IntentId,
        /// Adapter-assigned order id, if any.
        order_id: Option<String>,
    },
}

/// A fill reported back from the venue.
#[derive(Debug, Clone)]
pub struct FillEvent {
    /// Ledger key of the intent the fill belongs to.
    pub key: LedgerKey,
    /// Instrument symbol.
    pub instrument: String,
    /// Which order the fill came from; entry-side and exit-side fills are
    /// booked differently.
    pub order_kind: OrderKind,
    /// Fill price.
    pub price: Decimal,
    /// Fill quantity.
    pub quantity: Decimal,
}

impl FillEvent {
    const fn is_entry_side(&self) -> bool {
        matches!(self.order_kind, OrderKind::Entry | OrderKind::StopEntry)
    }
}

/// Coordinates gates, ledger, exposure tracking, and the adapter for
/// every order action.
pub struct ExecutionCoordinator {
    gate: RiskGate,
    ledger: Arc<ExecutionLedger>,
    tracker: Arc<IntentExposureTracker>,
    adapter: Arc<dyn ExecutionAdapter>,
    notifier: Arc<dyn Notifier>,
    audit: Arc<dyn AuditSink>,
    summary: Arc<ExecutionSummary>,
}

impl ExecutionCoordinator {
    /// Wire a coordinator from its collaborators.
    #[must_use]
    pub fn new(
        gate: RiskGate,
        ledger: Arc<ExecutionLedger>,
        tracker: Arc<IntentExposureTracker>,
        adapter: Arc<dyn ExecutionAdapter>,
        notifier: Arc<dyn Notifier>,
        audit: Arc<dyn AuditSink>,
        summary: Arc<ExecutionSummary>,
    ) -> Self {
        Self {
            gate,
            ledger,
            tracker,
            adapter,
            notifier,
            audit,
            summary,
        }
    }

    /// Run counters.
    #[must_use]
    pub fn summary(&self) -> &ExecutionSummary {
        &self.summary
    }

    /// Submit an entry order: gates, idempotency check, adapter,
    /// bookkeeping, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the ledger write after a successful
    /// submission fails; the order is then live but unrecorded, which is
    /// alerted as an emergency.
    pub async fn submit_entry(
        &self,
        cmd: &EntryCommand,
        now: DateTime<Utc>,
    ) -> Result<SubmitOutcome, CoordinatorError> {
        let gate_result = self.gate.check_gates(&cmd.gate_inputs(now));
        if !gate_result.allowed {
            self.summary.record_blocked();
            return Ok(SubmitOutcome::Blocked {
                reason: gate_result.reason.unwrap_or_default(),
            });
        }

        let intent_id = IntentId::derive(&cmd.params);
        let key = cmd.ledger_key(intent_id.clone());
        match self.ledger.probe_submission(&key) {
            SubmissionProbe::Submitted => {
                self.summary.record_blocked();
                info!(intent_id = %intent_id, "Entry already submitted, skipping");
                return Ok(SubmitOutcome::Duplicate { intent_id });
            }
            SubmissionProbe::Corrupt => {
                // The ledger already audited the corruption; treat the
                // intent as submitted and escalate.
                self.summary.record_blocked();
                self.notifier.notify(NotificationRequest::new(
                    event_types::LEDGER_CORRUPT,
                    "Ledger entry corrupt",
                    format!("Intent {intent_id} has an unreadable ledger entry; treating as submitted"),
                    Priority::Emergency,
                ));
                return Ok(SubmitOutcome::Duplicate { intent_id });
            }
            SubmissionProbe::NotSubmitted => {}
        }

        self.tracker.register(
            &intent_id,
            ExposureIdentity {
                stream: cmd.params.stream.clone(),
                instrument: cmd.params.instrument.clone(),
                direction: Some(cmd.params.direction),
                intended_qty: cmd.quantity,
            },
        );

        let request = OrderRequest {
            intent_id: intent_id.clone(),
            instrument: cmd.params.instrument.clone(),
            direction: cmd.params.direction,
            quantity: cmd.quantity,
            limit_price: (!cmd.stop_entry).then_some(cmd.params.entry_price),
            stop_price: cmd.stop_entry.then_some(cmd.params.entry_price),
        };
        let order_kind = if cmd.stop_entry {
            OrderKind::StopEntry
        } else {
            OrderKind::Entry
        };
        let result = if cmd.stop_entry {
            self.adapter.submit_stop_entry_order(&request, now).await
        } else {
            self.adapter.submit_entry_order(&request, now).await
        };

        if !result.success {
            let message = result.message.unwrap_or_default();
            self.summary.record_rejected();
            warn!(intent_id = %intent_id, reason = %message, "Entry order rejected");
            self.notifier.notify(NotificationRequest::new(
                "ORDER_REJECTED",
                "Entry order rejected",
                format!("{intent_id}: {message}"),
                Priority::High,
            ));
            return Ok(SubmitOutcome::Rejected { message });
        }

        if let Err(e) = self.ledger.record_submission(&key, order_kind, now) {
            error!(intent_id = %intent_id, error = %e, "Order live but ledger write failed");
            self.notifier.notify(NotificationRequest::new(
                "LEDGER_WRITE_FAILED",
                "Order live but unrecorded",
                format!("Intent {intent_id}: {e}"),
                Priority::Emergency,
            ));
            return Err(e.into());
        }

        self.summary.record_submitted();
        self.audit.record(
            &AuditEvent::new(event_types::ORDER_SUBMITTED)
                .intent(&intent_id)
                .instrument(&cmd.params.instrument)
                .trading_date(&cmd.params.trading_date)
                .with("stream", cmd.params.stream.clone())
                .with("order_kind", order_kind.name())
                .with("quantity", cmd.quantity.to_string())
                .with("order_id", result.order_id.clone().unwrap_or_default()),
        );
        Ok(SubmitOutcome::Submitted {
            intent_id,
            order_id: result.order_id,
        })
    }

    /// Place the protective stop covering a filled entry.
    ///
    /// Not gated: covering open exposure is always allowed. A failure here
    /// is the one condition that stands the intent down.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot record the submission.
    pub async fn place_protective_stop(
        &self,
        key: &LedgerKey,
        request: &OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<AdapterResult, CoordinatorError> {
        let result = self.adapter.submit_protective_stop(request, now).await;
        if result.success {
            self.ledger
                .record_submission(key, OrderKind::ProtectiveStop, now)?;
            self.summary.record_submitted();
        } else {
            self.summary.record_rejected();
            self.stand_down(
                &key.intent_id,
                "PROTECTIVE_STOP_FAILED",
                result.message.as_deref().unwrap_or(""),
            );
        }
        Ok(result)
    }

    /// Place the profit target order.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger cannot record the submission.
    pub async fn place_target(
        &self,
        key: &LedgerKey,
        request: &OrderRequest,
        now: DateTime<Utc>,
    ) -> Result<AdapterResult, CoordinatorError> {
        let result = self.adapter.submit_target_order(request, now).await;
        if result.success {
            self.ledger.record_submission(key, OrderKind::Target, now)?;
            self.summary.record_submitted();
        } else {
            self.summary.record_rejected();
            warn!(intent_id = %key.intent_id, "Target order rejected");
            self.notifier.notify(NotificationRequest::new(
                "TARGET_ORDER_FAILED",
                "Target order rejected",
                format!(
                    "{}: {}",
                    key.intent_id,
                    result.message.as_deref().unwrap_or("")
                ),
                Priority::High,
            ));
        }
        Ok(result)
    }

    /// Move an intent's protective stop to break-even.
    ///
    /// Gated like an entry: widening is impossible, but a recovery state
    /// or kill switch still means leave the book alone.
    pub async fn move_stop_to_break_even(
        &self,
        inputs: &GateInputs<'_>,
        key: &LedgerKey,
        break_even_price: Decimal,
        now: DateTime<Utc>,
    ) -> SubmitOutcome {
        let gate_result = self.gate.check_gates(inputs);
        if !gate_result.allowed {
            self.summary.record_blocked();
            return SubmitOutcome::Blocked {
                reason: gate_result.reason.unwrap_or_default(),
            };
        }

        let result = self
            .adapter
            .modify_stop_to_break_even(&key.intent_id, inputs.instrument, break_even_price, now)
            .await;
        if result.success {
            self.summary.record_submitted();
            SubmitOutcome::Submitted {
                intent_id: key.intent_id.clone(),
                order_id: result.order_id,
            }
        } else {
            let message = result.message.unwrap_or_default();
            self.summary.record_rejected();
            warn!(intent_id = %key.intent_id, reason = %message, "Break-even modification rejected");
            self.notifier.notify(NotificationRequest::new(
                "BREAK_EVEN_FAILED",
                "Break-even modification rejected",
                format!("{}: {message}", key.intent_id),
                Priority::High,
            ));
            SubmitOutcome::Rejected { message }
        }
    }

    /// Record a fill against the tracker and the ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the ledger write fails, including a fill
    /// arriving after the trade completed.
    pub fn on_fill(&self, event: &FillEvent) -> Result<(), CoordinatorError> {
        let outcome = if event.is_entry_side() {
            self.tracker.on_entry_fill(&event.key.intent_id, event.quantity)
        } else {
            self.tracker.on_exit_fill(&event.key.intent_id, event.quantity)
        };

        if outcome == FillOutcome::RejectedStandingDown {
            self.notifier.notify(NotificationRequest::new(
                "FILL_WHILE_STANDING_DOWN",
                "Fill against standing-down intent",
                format!(
                    "{}: {} {} @ {}",
                    event.key.intent_id,
                    event.order_kind.name(),
                    event.quantity,
                    event.price
                ),
                Priority::Emergency,
            ));
            return Ok(());
        }

        if event.is_entry_side() {
            self.ledger
                .record_entry_fill(&event.key, &event.instrument, event.price, event.quantity)?;
        } else {
            self.ledger
                .record_exit_fill(&event.key, &event.instrument, event.price, event.quantity)?;
        }

        self.summary.record_filled();
        self.audit.record(
            &AuditEvent::new(event_types::ORDER_FILL)
                .intent(&event.key.intent_id)
                .instrument(&event.instrument)
                .trading_date(&event.key.trading_date)
                .with("stream", event.key.stream.clone())
                .with("order_kind", event.order_kind.name())
                .with("price", event.price.to_string())
                .with("quantity", event.quantity.to_string()),
        );
        Ok(())
    }

    /// Mark a trade complete in the ledger and announce the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry is already completed or the write
    /// fails.
    pub fn complete_trade(
        &self,
        key: &LedgerKey,
        reason: &str,
        pnl_net: Decimal,
        pnl_gross: Decimal,
        pnl_points: Decimal,
        costs: TradeCosts,
    ) -> Result<(), CoordinatorError> {
        self.ledger
            .record_completion(key, reason, pnl_net, pnl_gross, pnl_points, costs)?;
        self.audit.record(
            &AuditEvent::new(event_types::TRADE_COMPLETED)
                .intent(&key.intent_id)
                .trading_date(&key.trading_date)
                .with("stream", key.stream.clone())
                .with("reason", reason)
                .with("pnl_net", pnl_net.to_string()),
        );
        self.notifier.notify(NotificationRequest::new(
            event_types::TRADE_COMPLETED,
            "Trade completed",
            format!("{}: {reason}, net {pnl_net}", key.intent_id),
            Priority::Normal,
        ));
        Ok(())
    }

    /// Force an intent into its terminal standing-down state.
    pub fn stand_down(&self, intent_id: &IntentId, reason: &str, detail: &str) {
        self.tracker.stand_down(intent_id, reason);
        self.audit.record(
            &AuditEvent::new(event_types::STAND_DOWN)
                .intent(intent_id)
                .with("reason", reason)
                .with("detail", detail),
        );
        self.notifier.notify(NotificationRequest::new(
            event_types::STAND_DOWN,
            "Intent standing down",
            format!("{intent_id}: {reason} {detail}"),
            Priority::Emergency,
        ));
    }

    /// Fail-closed cleanup: cancel every owned working order, then flatten
    /// every open position.
    ///
    /// Positions an active tracked exposure explains are flattened under
    /// their intent; anything else books under an untracked identity —
    /// ambiguity about a position's origin is never a reason to leave it
    /// open. Never gated.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot report account state; there
    /// is nothing safe to do without a snapshot.
    pub async fn fail_closed_flatten(
        &self,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<CancelReport, CoordinatorError> {
        let snapshot = self.adapter.get_account_snapshot().await?;
        let report = self
            .adapter
            .cancel_owned_working_orders(&snapshot, now)
            .await;
        info!(
            cancelled = report.cancelled.len(),
            skipped = report.skipped,
            "Cancelled owned working orders"
        );

        let mut flattened = 0usize;
        for position in &snapshot.positions {
            if position.quantity.is_zero() {
                continue;
            }
            flattened += 1;
            let intent_id = self
                .tracker
                .all()
                .into_iter()
                .find(|e| {
                    e.state == ExposureState::Active
                        && e.identity.instrument == position.instrument
                })
                .map_or_else(|| IntentId::untracked(reason), |e| e.intent_id);

            self.audit.record(
                &AuditEvent::new(event_types::FAIL_CLOSED_FLATTEN)
                    .intent(&intent_id)
                    .instrument(&position.instrument)
                    .with("reason", reason)
                    .with("quantity", position.quantity.to_string()),
            );
            let result = self
                .adapter
                .flatten(&intent_id, &position.instrument, position.quantity.abs(), now)
                .await;
            if !result.success {
                error!(
                    instrument = %position.instrument,
                    intent_id = %intent_id,
                    "Flatten failed"
                );
            }
            self.stand_down(&intent_id, "FAIL_CLOSED_FLATTEN", reason);
        }

        self.notifier.notify(NotificationRequest::new(
            event_types::FAIL_CLOSED_FLATTEN,
            "Fail-closed flatten executed",
            format!(
                "{reason}: {flattened} positions flattened, {} orders cancelled",
                report.cancelled.len()
            ),
            Priority::Emergency,
        ));
        Ok(report)
    }
}
