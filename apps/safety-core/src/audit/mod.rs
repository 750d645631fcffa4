//! Structured audit events.
//!
//! Every gate evaluation, block, submission, and fill emits a structured
//! event to an append-only sink. The event shape (type name, instrument,
//! intent id, trading date, key/value payload, UTC timestamp) is a contract
//! consumed by external monitoring; the sinks here must honor it but never
//! let a sink failure escape to the caller.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::IntentId;

/// Event type names emitted by this core.
pub mod event_types {
    /// A risk gate evaluation ran (pass or fail).
    pub const RISK_CHECK_EVALUATED: &str = "RISK_CHECK_EVALUATED";
    /// An action was blocked by the gates.
    pub const EXECUTION_BLOCKED: &str = "EXECUTION_BLOCKED";
    /// A block attributable to risk preconditions rather than
    /// kill-switch/recovery state.
    pub const ENTRY_BLOCKED_RISK: &str = "ENTRY_BLOCKED_RISK";
    /// An order was submitted to the adapter.
    pub const ORDER_SUBMITTED: &str = "ORDER_SUBMITTED";
    /// A fill was recorded.
    pub const ORDER_FILL: &str = "ORDER_FILL";
    /// A trade reached its terminal completed state.
    pub const TRADE_COMPLETED: &str = "TRADE_COMPLETED";
    /// An intent was force-transitioned to standing down.
    pub const STAND_DOWN: &str = "STAND_DOWN";
    /// A ledger file this process owns failed to parse.
    pub const LEDGER_CORRUPT: &str = "LEDGER_CORRUPT";
    /// A position without a trackable origin was flattened.
    pub const FAIL_CLOSED_FLATTEN: &str = "FAIL_CLOSED_FLATTEN";
}

/// A single structured audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event type name, e.g. `RISK_CHECK_EVALUATED`.
    pub event_type: String,
    /// Instrument symbol, empty when not applicable.
    pub instrument: String,
    /// Intent the event concerns, if any.
    pub intent_id: Option<IntentId>,
    /// Trading date, `YYYY-MM-DD`, empty when not applicable.
    pub trading_date: String,
    /// Arbitrary key/value payload.
    pub payload: BTreeMap<String, String>,
    /// Event time, UTC.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Create an event with an empty payload, timestamped now.
    #[must_use]
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            instrument: String::new(),
            intent_id: None,
            trading_date: String::new(),
            payload: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// Set the instrument.
    #[must_use]
    pub fn instrument(mut self, instrument: &str) -> Self {
        self.instrument = instrument.to_string();
        self
    }

    /// Set the intent id.
    #[must_use]
    pub fn intent(mut self, intent_id: &IntentId) -> Self {
        self.intent_id = Some(intent_id.clone());
        self
    }

    /// Set the trading date.
    #[must_use]
    pub fn trading_date(mut self, trading_date: &str) -> Self {
        self.trading_date = trading_date.to_string();
        self
    }

    /// Add a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.payload.insert(key.to_string(), value.into());
        self
    }
}

/// Append-only sink for audit events.
///
/// Implementations must be infallible from the caller's point of view:
/// a sink that cannot write logs the failure and drops the event.
pub trait AuditSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: &AuditEvent);
}

/// Errors opening an audit journal file.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The journal file could not be created or opened.
    #[error("Failed to open audit journal {path}: {source}")]
    Open {
        /// Journal path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// File-backed sink writing one JSON object per line.
pub struct JsonlAuditSink {
    file: Mutex<File>,
    path: String,
}

impl JsonlAuditSink {
    /// Open (or create) the journal file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened for append.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path_str = path.as_ref().display().to_string();
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::Open {
                path: path_str.clone(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())
            .map_err(|source| AuditError::Open {
                path: path_str.clone(),
                source,
            })?;
        Ok(Self {
            file: Mutex::new(file),
            path: path_str,
        })
    }
}

impl AuditSink for JsonlAuditSink {
    fn record(&self, event: &AuditEvent) {
        let line = match serde_json::to_string(event) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, event_type = %event.event_type, "Audit event not serializable, dropped");
                return;
            }
        };
        let Ok(mut file) = self.file.lock() else {
            warn!(path = %self.path, "Audit journal lock poisoned, event dropped");
            return;
        };
        if let Err(e) = writeln!(file, "{line}") {
            warn!(error = %e, path = %self.path, "Audit journal write failed, event dropped");
        }
    }
}

/// Sink that forwards events to the tracing subscriber only.
///
/// Used in tests and in dry-run wiring where no durable trail is wanted.
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        info!(
            event_type = %event.event_type,
            instrument = %event.instrument,
            intent_id = event.intent_id.as_ref().map(ToString::to_string).unwrap_or_default(),
            trading_date = %event.trading_date,
            payload = ?event.payload,
            "audit"
        );
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory sink capturing events for assertions.
    #[derive(Debug, Default)]
    pub struct CapturingAuditSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    impl CapturingAuditSink {
        pub fn events(&self) -> Vec<AuditEvent> {
            self.events.lock().unwrap().clone()
        }

        pub fn of_type(&self, event_type: &str) -> Vec<AuditEvent> {
            self.events()
                .into_iter()
                .filter(|e| e.event_type == event_type)
                .collect()
        }
    }

    impl AuditSink for CapturingAuditSink {
        fn record(&self, event: &AuditEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    #[test]
    fn test_jsonl_sink_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let sink = JsonlAuditSink::open(&path).unwrap();

        sink.record(
            &AuditEvent::new(event_types::ORDER_SUBMITTED)
                .instrument("MNQ")
                .trading_date("2026-01-27")
                .with("order_kind", "ENTRY"),
        );
        sink.record(&AuditEvent::new(event_types::ORDER_FILL).instrument("MNQ"));

        let file = File::open(&path).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(Result::unwrap)
            .collect();
        assert_eq!(lines.len(), 2);

        let first: AuditEvent = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.event_type, event_types::ORDER_SUBMITTED);
        assert_eq!(first.payload.get("order_kind").unwrap(), "ENTRY");
    }

    #[test]
    fn test_jsonl_sink_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        {
            let sink = JsonlAuditSink::open(&path).unwrap();
            sink.record(&AuditEvent::new(event_types::STAND_DOWN));
        }
        {
            let sink = JsonlAuditSink::open(&path).unwrap();
            sink.record(&AuditEvent::new(event_types::STAND_DOWN));
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
