//! Ordered, short-circuiting gate evaluation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditSink, event_types};
use crate::config::SessionCatalog;

use super::guard::RecoveryGuard;

/// Whether the caller is processing live data or replaying history.
///
/// Carried into audit events only; the gate outcome does not depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunMode {
    /// Live session.
    Live,
    /// Historical replay.
    Replay,
}

impl RunMode {
    /// Stable name for audit payloads.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Live => "LIVE",
            Self::Replay => "REPLAY",
        }
    }
}

/// The gates, in their fixed evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// Recovery-state guard says new risk is allowed.
    RecoveryState,
    /// Manual kill switch is off.
    KillSwitch,
    /// Caller validated its timetable.
    TimetableValidated,
    /// The stream is armed.
    StreamArmed,
    /// The session resolves to a configured definition.
    SessionDefined,
    /// The slot time is one of the session's allowed end times.
    SlotTimeAllowed,
    /// A trading date is present.
    TradingDatePresent,
}

impl Gate {
    /// All gates in evaluation order.
    pub const ALL: [Self; 7] = [
        Self::RecoveryState,
        Self::KillSwitch,
        Self::TimetableValidated,
        Self::StreamArmed,
        Self::SessionDefined,
        Self::SlotTimeAllowed,
        Self::TradingDatePresent,
    ];

    /// Stable gate name used in audit events and `failed_gates`.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RecoveryState => "RECOVERY_STATE",
            Self::KillSwitch => "KILL_SWITCH",
            Self::TimetableValidated => "TIMETABLE_VALIDATED",
            Self::StreamArmed => "STREAM_ARMED",
            Self::SessionDefined => "SESSION_DEFINED",
            Self::SlotTimeAllowed => "SLOT_TIME_ALLOWED",
            Self::TradingDatePresent => "TRADING_DATE_PRESENT",
        }
    }

    /// Whether a failure here is a risk precondition rather than a
    /// process-wide override (kill switch) or connectivity state.
    #[must_use]
    pub const fn is_risk_precondition(&self) -> bool {
        !matches!(self, Self::RecoveryState | Self::KillSwitch)
    }
}

/// Inputs to one gate evaluation.
#[derive(Debug, Clone)]
pub struct GateInputs<'a> {
    /// Live or replay.
    pub mode: RunMode,
    /// Trading date, `YYYY-MM-DD`; empty means the replay/live-session
    /// invariant checkpoint failed upstream.
    pub trading_date: &'a str,
    /// Stream identifier.
    pub stream: &'a str,
    /// Instrument symbol.
    pub instrument: &'a str,
    /// Session name.
    pub session: &'a str,
    /// Slot end time, `HH:MM`.
    pub slot_time: &'a str,
    /// Caller-supplied: timetable validation passed.
    pub timetable_validated: bool,
    /// Caller-supplied: stream is armed.
    pub stream_armed: bool,
    /// Evaluation time.
    pub now: DateTime<Utc>,
}

/// Outcome of one gate evaluation.
#[derive(Debug, Clone)]
pub struct RiskGateResult {
    /// All gates passed.
    pub allowed: bool,
    /// Short reason string for the first failure, e.g. `KILL_SWITCH_ACTIVE`.
    pub reason: Option<String>,
    /// Gates that failed, in evaluation order. Short-circuiting means this
    /// holds at most the first failing gate.
    pub failed_gates: Vec<Gate>,
}

impl RiskGateResult {
    fn pass() -> Self {
        Self {
            allowed: true,
            reason: None,
            failed_gates: Vec::new(),
        }
    }

    fn fail(gate: Gate, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
            failed_gates: vec![gate],
        }
    }
}

/// Synchronous fail-closed permission check.
///
/// Evaluation is ordered and short-circuiting: the first failing gate wins
/// and later gates are not evaluated. The gate only reads state and logs;
/// it never submits, cancels, or mutates ledger/exposure state.
pub struct RiskGate {
    guard: Arc<dyn RecoveryGuard>,
    sessions: SessionCatalog,
    audit: Arc<dyn AuditSink>,
    diagnostics: bool,
}

impl RiskGate {
    /// Create a gate over the given guard, session catalog, and audit sink.
    #[must_use]
    pub fn new(
        guard: Arc<dyn RecoveryGuard>,
        sessions: SessionCatalog,
        audit: Arc<dyn AuditSink>,
        diagnostics: bool,
    ) -> Self {
        Self {
            guard,
            sessions,
            audit,
            diagnostics,
        }
    }

    /// Evaluate all gates for one intended action.
    ///
    /// Emits `RISK_CHECK_EVALUATED` (when diagnostics are on) for every
    /// evaluation, and `EXECUTION_BLOCKED` plus, for risk-precondition
    /// failures, `ENTRY_BLOCKED_RISK` on a block.
    #[must_use]
    pub fn check_gates(&self, inputs: &GateInputs<'_>) -> RiskGateResult {
        let result = self.evaluate(inputs);

        if self.diagnostics {
            self.audit.record(&self.evaluation_event(inputs, &result));
        }

        if !result.allowed {
            self.audit.record(&self.blocked_event(inputs, &result));

            if let Some(failed) = result.failed_gates.first()
                && failed.is_risk_precondition()
            {
                self.audit.record(
                    &AuditEvent::new(event_types::ENTRY_BLOCKED_RISK)
                        .instrument(inputs.instrument)
                        .trading_date(inputs.trading_date)
                        .with("stream", inputs.stream)
                        .with("session", inputs.session)
                        .with("slot_time", inputs.slot_time)
                        .with("failed_gate", failed.name())
                        .with("reason", result.reason.clone().unwrap_or_default()),
                );
            }

            tracing::warn!(
                instrument = inputs.instrument,
                stream = inputs.stream,
                reason = result.reason.as_deref().unwrap_or(""),
                "Execution blocked by risk gate"
            );
        }

        result
    }

    fn evaluate(&self, inputs: &GateInputs<'_>) -> RiskGateResult {
        let permission = self.guard.execution_permission();
        if !permission.allowed {
            let reason = permission
                .reason
                .unwrap_or_else(|| "RECOVERY_STATE_BLOCKED".to_string());
            return RiskGateResult::fail(Gate::RecoveryState, reason);
        }

        if self.guard.is_kill_switch_enabled() {
            return RiskGateResult::fail(Gate::KillSwitch, "KILL_SWITCH_ACTIVE");
        }

        if !inputs.timetable_validated {
            return RiskGateResult::fail(Gate::TimetableValidated, "TIMETABLE_NOT_VALIDATED");
        }

        if !inputs.stream_armed {
            return RiskGateResult::fail(Gate::StreamArmed, "STREAM_NOT_ARMED");
        }

        let Some(session) = self.sessions.resolve(inputs.session) else {
            return RiskGateResult::fail(Gate::SessionDefined, "SESSION_NOT_CONFIGURED");
        };

        if !session.allows_slot(inputs.slot_time) {
            return RiskGateResult::fail(Gate::SlotTimeAllowed, "SLOT_TIME_NOT_ALLOWED");
        }

        if inputs.trading_date.trim().is_empty() {
            return RiskGateResult::fail(Gate::TradingDatePresent, "TRADING_DATE_MISSING");
        }

        RiskGateResult::pass()
    }

    fn evaluation_event(&self, inputs: &GateInputs<'_>, result: &RiskGateResult) -> AuditEvent {
        let failed: Vec<&str> = result.failed_gates.iter().map(Gate::name).collect();
        AuditEvent::new(event_types::RISK_CHECK_EVALUATED)
            .instrument(inputs.instrument)
            .trading_date(inputs.trading_date)
            .with("mode", inputs.mode.name())
            .with("stream", inputs.stream)
            .with("session", inputs.session)
            .with("slot_time", inputs.slot_time)
            .with("timetable_validated", inputs.timetable_validated.to_string())
            .with("stream_armed", inputs.stream_armed.to_string())
            .with("evaluated_at", inputs.now.to_rfc3339())
            .with("allowed", result.allowed.to_string())
            .with("failed_gates", failed.join(","))
    }

    /// Build the `EXECUTION_BLOCKED` event carrying the per-gate
    /// PASSED/FAILED/UNKNOWN breakdown. Gates before the first failure
    /// passed; gates after it were never evaluated.
    fn blocked_event(&self, inputs: &GateInputs<'_>, result: &RiskGateResult) -> AuditEvent {
        let mut event = AuditEvent::new(event_types::EXECUTION_BLOCKED)
            .instrument(inputs.instrument)
            .trading_date(inputs.trading_date)
            .with("stream", inputs.stream)
            .with("reason", result.reason.clone().unwrap_or_default());

        let failed_at = result
            .failed_gates
            .first()
            .and_then(|failed| Gate::ALL.iter().position(|g| g == failed));
        for (idx, gate) in Gate::ALL.iter().enumerate() {
            let status = match failed_at {
                Some(fail_idx) if idx < fail_idx => "PASSED",
                Some(fail_idx) if idx == fail_idx => "FAILED",
                Some(_) => "UNKNOWN",
                None => "PASSED",
            };
            event = event.with(gate.name(), status);
        }
        event
    }
}
