//! File-backed, idempotent ledger store.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::audit::{AuditEvent, AuditSink, event_types};
use crate::models::{IntentId, OrderKind};

use super::entry::{JournalEntry, TradeCosts};

/// Errors from ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Filesystem error reading or writing an entry.
    #[error("Ledger I/O error at {path}: {source}")]
    Io {
        /// File involved.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An existing entry file failed to parse. Fail closed: the intent must
    /// be treated as submitted, never resubmitted.
    #[error("Corrupt ledger entry at {path}: {detail}")]
    Corrupt {
        /// File involved.
        path: String,
        /// Parse failure detail.
        detail: String,
    },

    /// A write was attempted after `trade_completed` was set.
    #[error("Ledger entry for {intent_id} is completed and immutable")]
    Completed {
        /// The terminal intent.
        intent_id: String,
    },

    /// Serialization failed.
    #[error("Ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key addressing one ledger entry (and its file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKey {
    /// Trading date, `YYYY-MM-DD`.
    pub trading_date: String,
    /// Stream identifier.
    pub stream: String,
    /// Intent identity.
    pub intent_id: IntentId,
}

impl LedgerKey {
    /// Build a key.
    #[must_use]
    pub fn new(trading_date: &str, stream: &str, intent_id: IntentId) -> Self {
        Self {
            trading_date: trading_date.to_string(),
            stream: stream.to_string(),
            intent_id,
        }
    }

    /// File name for this key: `{tradingDate}_{stream}_{intentId}.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.json",
            self.trading_date,
            self.stream,
            self.intent_id.file_key()
        )
    }
}

/// Result of probing an intent's submission state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionProbe {
    /// No entry file exists, or it exists without the submitted flag.
    NotSubmitted,
    /// The persisted entry carries the submitted flag.
    Submitted,
    /// The entry file exists but cannot be read or parsed. Callers must
    /// treat this as submitted and raise an operator alert.
    Corrupt,
}

/// Append-/update-only, file-persisted record of one entry per intent.
pub struct ExecutionLedger {
    journal_dir: PathBuf,
    audit: Arc<dyn AuditSink>,
    /// Serializes every read-modify-write. Concurrent writers to the same
    /// intent would otherwise read the same prior state and the later
    /// rename would drop the earlier fill.
    write_lock: Mutex<()>,
}

impl ExecutionLedger {
    /// Open a ledger rooted at `journal_dir`, creating the directory if
    /// needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(journal_dir: impl Into<PathBuf>, audit: Arc<dyn AuditSink>) -> Result<Self, LedgerError> {
        let journal_dir = journal_dir.into();
        fs::create_dir_all(&journal_dir).map_err(|source| LedgerError::Io {
            path: journal_dir.display().to_string(),
            source,
        })?;
        Ok(Self {
            journal_dir,
            audit,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the per-intent files.
    #[must_use]
    pub fn journal_dir(&self) -> &Path {
        &self.journal_dir
    }

    /// Pure read: has this intent already had an order submitted?
    ///
    /// No side effects beyond logging; safe at high frequency during live
    /// bar processing. A corrupt existing file resolves to `true` — never
    /// resubmit over ambiguity.
    #[must_use]
    pub fn is_intent_submitted(&self, key: &LedgerKey) -> bool {
        match self.probe_submission(key) {
            SubmissionProbe::NotSubmitted => false,
            SubmissionProbe::Submitted | SubmissionProbe::Corrupt => true,
        }
    }

    /// Probe submission state, distinguishing the corrupt case so the
    /// caller can alert loudly on the live path.
    #[must_use]
    pub fn probe_submission(&self, key: &LedgerKey) -> SubmissionProbe {
        let path = self.path_for(key);
        if !path.exists() {
            return SubmissionProbe::NotSubmitted;
        }
        match self.read_entry(&path) {
            Ok(entry) => {
                if entry.entry_submitted || entry.exit_submitted {
                    SubmissionProbe::Submitted
                } else {
                    SubmissionProbe::NotSubmitted
                }
            }
            Err(e) => {
                error!(
                    intent_id = %key.intent_id,
                    path = %path.display(),
                    error = %e,
                    "Corrupt ledger entry on live path, failing closed"
                );
                self.audit.record(
                    &AuditEvent::new(event_types::LEDGER_CORRUPT)
                        .intent(&key.intent_id)
                        .trading_date(&key.trading_date)
                        .with("stream", key.stream.clone())
                        .with("path", path.display().to_string())
                        .with("error", e.to_string()),
                );
                SubmissionProbe::Corrupt
            }
        }
    }

    /// Record an order submission. Upsert; atomic write-replace.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, a corrupt existing file, or an
    /// attempt to write a completed entry.
    pub fn record_submission(
        &self,
        key: &LedgerKey,
        order_kind: OrderKind,
        timestamp: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        self.update(key, |entry| {
            match order_kind {
                OrderKind::Entry | OrderKind::StopEntry => {
                    entry.entry_submitted = true;
                    entry.entry_submitted_at = Some(timestamp);
                    entry.entry_order_kind = Some(order_kind);
                }
                OrderKind::ProtectiveStop | OrderKind::Target | OrderKind::Flatten => {
                    entry.exit_submitted = true;
                    entry.exit_submitted_at = Some(timestamp);
                }
            }
            debug!(
                intent_id = %key.intent_id,
                order_kind = order_kind.name(),
                "Submission recorded"
            );
        })
    }

    /// Record an entry-side fill, accumulating the weighted average price.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, corruption, or a completed entry.
    pub fn record_entry_fill(
        &self,
        key: &LedgerKey,
        instrument: &str,
        fill_price: Decimal,
        fill_qty: Decimal,
    ) -> Result<(), LedgerError> {
        self.update(key, |entry| {
            if entry.instrument.is_empty() {
                entry.instrument = instrument.to_string();
            }
            entry.apply_entry_fill(fill_price, fill_qty);
        })
    }

    /// Record an exit-side fill.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, corruption, or a completed entry.
    pub fn record_exit_fill(
        &self,
        key: &LedgerKey,
        instrument: &str,
        fill_price: Decimal,
        fill_qty: Decimal,
    ) -> Result<(), LedgerError> {
        self.update(key, |entry| {
            if entry.instrument.is_empty() {
                entry.instrument = instrument.to_string();
            }
            entry.apply_exit_fill(fill_price, fill_qty);
        })
    }

    /// Mark the trade completed. Terminal: every later write to this entry
    /// is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, corruption, or if already
    /// completed.
    pub fn record_completion(
        &self,
        key: &LedgerKey,
        reason: &str,
        pnl_net: Decimal,
        pnl_gross: Decimal,
        pnl_points: Decimal,
        costs: TradeCosts,
    ) -> Result<(), LedgerError> {
        self.update(key, |entry| {
            entry.trade_completed = true;
            entry.completion_reason = Some(reason.to_string());
            entry.completed_at_utc = Some(Utc::now());
            entry.realized_pnl_net = pnl_net;
            entry.realized_pnl_gross = pnl_gross;
            entry.realized_pnl_points = pnl_points;
            entry.costs = costs;
        })
    }

    /// Load one entry, if present.
    ///
    /// # Errors
    ///
    /// Returns `Corrupt` for an existing unparseable file, `Io` otherwise.
    pub fn load(&self, key: &LedgerKey) -> Result<Option<JournalEntry>, LedgerError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        self.read_entry(&path).map(Some)
    }

    fn update(
        &self,
        key: &LedgerKey,
        mutate: impl FnOnce(&mut JournalEntry),
    ) -> Result<(), LedgerError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let path = self.path_for(key);
        let mut entry = if path.exists() {
            self.read_entry(&path)?
        } else {
            JournalEntry::new(&key.trading_date, &key.stream, key.intent_id.clone())
        };

        if entry.trade_completed {
            return Err(LedgerError::Completed {
                intent_id: key.intent_id.to_string(),
            });
        }

        mutate(&mut entry);
        self.write_atomic(&path, &entry)
    }

    fn read_entry(&self, path: &Path) -> Result<JournalEntry, LedgerError> {
        let raw = fs::read_to_string(path).map_err(|source| LedgerError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|e| LedgerError::Corrupt {
            path: path.display().to_string(),
            detail: e.to_string(),
        })
    }

    /// Write the entry to a temp file in the same directory, then rename
    /// over the target. Readers never observe a partial write.
    fn write_atomic(&self, path: &Path, entry: &JournalEntry) -> Result<(), LedgerError> {
        let json = serde_json::to_string_pretty(entry)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| LedgerError::Io {
            path: tmp.display().to_string(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| {
            // Best effort: don't leave the temp file behind.
            if let Err(cleanup) = fs::remove_file(&tmp) {
                warn!(path = %tmp.display(), error = %cleanup, "Temp ledger file left behind");
            }
            LedgerError::Io {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(())
    }

    fn path_for(&self, key: &LedgerKey) -> PathBuf {
        self.journal_dir.join(key.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::CapturingAuditSink;
    use rust_decimal_macros::dec;

    fn key(id: &str) -> LedgerKey {
        LedgerKey::new(
            "2026-01-27",
            "S1",
            IntentId::Derived { id: id.to_string() },
        )
    }

    fn open_ledger(dir: &Path) -> (ExecutionLedger, Arc<CapturingAuditSink>) {
        let audit = Arc::new(CapturingAuditSink::default());
        let ledger = ExecutionLedger::open(dir, audit.clone()).unwrap();
        (ledger, audit)
    }

    #[test]
    fn test_unknown_intent_is_not_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = open_ledger(dir.path());
        assert!(!ledger.is_intent_submitted(&key("abc")));
    }

    #[test]
    fn test_submission_is_idempotent_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (ledger, _) = open_ledger(dir.path());
            ledger
                .record_submission(&key("abc"), OrderKind::Entry, Utc::now())
                .unwrap();
            assert!(ledger.is_intent_submitted(&key("abc")));
        }
        // Fresh ledger over the same directory simulates a process restart.
        let (reopened, _) = open_ledger(dir.path());
        assert!(reopened.is_intent_submitted(&key("abc")));
        assert!(!reopened.is_intent_submitted(&key("other")));
    }

    #[test]
    fn test_fill_accumulation_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = open_ledger(dir.path());
        let k = key("abc");

        ledger
            .record_submission(&k, OrderKind::Entry, Utc::now())
            .unwrap();
        ledger
            .record_entry_fill(&k, "MNQ", dec!(21000), dec!(2))
            .unwrap();
        ledger
            .record_entry_fill(&k, "MNQ", dec!(21003), dec!(1))
            .unwrap();
        ledger
            .record_exit_fill(&k, "MNQ", dec!(21010), dec!(3))
            .unwrap();

        let entry = ledger.load(&k).unwrap().unwrap();
        assert_eq!(entry.entry_filled_qty, dec!(3));
        assert_eq!(entry.exit_filled_qty, dec!(3));
        assert_eq!(entry.entry_avg_fill_price, dec!(21001));
        assert!(!entry.trade_completed);

        // Caller may now complete the trade.
        ledger
            .record_completion(
                &k,
                "TARGET_FILLED",
                dec!(55.5),
                dec!(60),
                dec!(30),
                TradeCosts {
                    commission: dec!(3),
                    fees: dec!(1.5),
                    slippage_points: dec!(0.5),
                    slippage_dollars: dec!(1),
                },
            )
            .unwrap();
        let entry = ledger.load(&k).unwrap().unwrap();
        assert!(entry.trade_completed);
        assert_eq!(entry.completion_reason.as_deref(), Some("TARGET_FILLED"));
    }

    #[test]
    fn test_concurrent_fills_on_one_intent_all_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let audit = Arc::new(CapturingAuditSink::default());
        let ledger = Arc::new(ExecutionLedger::open(dir.path(), audit).unwrap());
        let k = key("abc");
        ledger
            .record_submission(&k, OrderKind::Entry, Utc::now())
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                let k = k.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        ledger
                            .record_entry_fill(&k, "MNQ", dec!(21000), dec!(1))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let entry = ledger.load(&k).unwrap().unwrap();
        assert_eq!(entry.entry_filled_qty, dec!(200));
    }

    #[test]
    fn test_completed_entry_is_immutable() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = open_ledger(dir.path());
        let k = key("abc");

        ledger
            .record_submission(&k, OrderKind::Entry, Utc::now())
            .unwrap();
        ledger
            .record_completion(
                &k,
                "FLATTENED",
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                TradeCosts::default(),
            )
            .unwrap();

        let err = ledger
            .record_entry_fill(&k, "MNQ", dec!(1), dec!(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Completed { .. }));

        let err = ledger
            .record_completion(
                &k,
                "AGAIN",
                Decimal::ZERO,
                Decimal::ZERO,
                Decimal::ZERO,
                TradeCosts::default(),
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Completed { .. }));
    }

    #[test]
    fn test_corrupt_file_fails_closed_and_alerts() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, audit) = open_ledger(dir.path());
        let k = key("abc");

        fs::write(dir.path().join(k.file_name()), "{not json").unwrap();

        assert_eq!(ledger.probe_submission(&k), SubmissionProbe::Corrupt);
        // Fail closed: corrupt is treated as submitted.
        assert!(ledger.is_intent_submitted(&k));
        assert!(!audit.of_type(crate::audit::event_types::LEDGER_CORRUPT).is_empty());

        // Writing over a corrupt entry is also refused.
        let err = ledger
            .record_submission(&k, OrderKind::Entry, Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::Corrupt { .. }));
    }

    #[test]
    fn test_exit_only_submission_counts_as_submitted() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = open_ledger(dir.path());
        let k = key("abc");
        ledger
            .record_submission(&k, OrderKind::ProtectiveStop, Utc::now())
            .unwrap();
        assert!(ledger.is_intent_submitted(&k));
        let entry = ledger.load(&k).unwrap().unwrap();
        assert!(entry.exit_submitted);
        assert!(!entry.entry_submitted);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let (ledger, _) = open_ledger(dir.path());
        ledger
            .record_submission(&key("abc"), OrderKind::Entry, Utc::now())
            .unwrap();

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|name| name.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
