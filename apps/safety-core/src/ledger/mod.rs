//! Idempotent execution ledger and its read-only rollups.
//!
//! The ledger is the single source of truth for "has this intent already
//! been submitted?". One JSON file per intent, durable across restarts,
//! updated with atomic write-replace so a crash mid-write never leaves an
//! ambiguous half-written file.

mod entry;
mod rollup;
mod store;
mod summary;

pub use entry::{JournalEntry, TradeCosts};
pub use rollup::{PnlAggregator, PnlRollup};
pub use store::{ExecutionLedger, LedgerError, LedgerKey, SubmissionProbe};
pub use summary::{ExecutionSummary, SummarySnapshot};
