//! Read-only P&L rollups over the ledger files.
//!
//! The aggregator scans the journal directory by file-name pattern, filters
//! to completed trades, and sums. It never writes. Corrupt files are
//! skipped with a warning here — this is the read-only rollup policy, which
//! deliberately differs from the loud fail-closed policy on the live write
//! path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use super::entry::JournalEntry;

/// Sums and counts over a set of completed trades.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PnlRollup {
    /// Completed trades counted.
    pub trades: u32,
    /// Trades with positive net P&L.
    pub wins: u32,
    /// Trades with negative net P&L.
    pub losses: u32,
    /// Trades with exactly zero net P&L.
    pub breakeven: u32,
    /// Net P&L total.
    pub net: Decimal,
    /// Gross P&L total.
    pub gross: Decimal,
    /// P&L total in points.
    pub points: Decimal,
    /// Commission total.
    pub commission: Decimal,
    /// Fee total.
    pub fees: Decimal,
    /// Slippage total in points.
    pub slippage_points: Decimal,
    /// Slippage total in dollars.
    pub slippage_dollars: Decimal,
}

impl PnlRollup {
    fn absorb(&mut self, entry: &JournalEntry) {
        self.trades += 1;
        if entry.is_win() {
            self.wins += 1;
        } else if entry.is_loss() {
            self.losses += 1;
        } else {
            self.breakeven += 1;
        }
        self.net += entry.realized_pnl_net;
        self.gross += entry.realized_pnl_gross;
        self.points += entry.realized_pnl_points;
        self.commission += entry.costs.commission;
        self.fees += entry.costs.fees;
        self.slippage_points += entry.costs.slippage_points;
        self.slippage_dollars += entry.costs.slippage_dollars;
    }
}

/// Read-only aggregation over the journal directory.
#[derive(Debug, Clone)]
pub struct PnlAggregator {
    journal_dir: PathBuf,
}

impl PnlAggregator {
    /// Aggregate over the given journal directory.
    #[must_use]
    pub fn new(journal_dir: impl Into<PathBuf>) -> Self {
        Self {
            journal_dir: journal_dir.into(),
        }
    }

    /// Rollup for one stream on one trading date
    /// (`{date}_{stream}_*.json`).
    #[must_use]
    pub fn stream_rollup(&self, trading_date: &str, stream: &str) -> PnlRollup {
        let prefix = format!("{trading_date}_{stream}_");
        self.scan(|name, _| name.starts_with(&prefix))
    }

    /// Rollup for a whole trading date (`{date}_*.json`).
    #[must_use]
    pub fn day_rollup(&self, trading_date: &str) -> PnlRollup {
        let prefix = format!("{trading_date}_");
        self.scan(|name, _| name.starts_with(&prefix))
    }

    /// Rollup across a date range (inclusive), parsing each file's leading
    /// date token.
    #[must_use]
    pub fn portfolio_rollup(&self, from: NaiveDate, to: NaiveDate) -> PnlRollup {
        self.scan(|name, _| {
            file_date(name).is_some_and(|date| date >= from && date <= to)
        })
    }

    fn scan(&self, include: impl Fn(&str, &Path) -> bool) -> PnlRollup {
        let mut rollup = PnlRollup::default();
        let entries = match fs::read_dir(&self.journal_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    dir = %self.journal_dir.display(),
                    error = %e,
                    "Journal directory unreadable, empty rollup"
                );
                return rollup;
            }
        };

        for dir_entry in entries.flatten() {
            let path = dir_entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".json") || !include(name, &path) {
                continue;
            }

            let entry: JournalEntry = match fs::read_to_string(&path)
                .map_err(|e| e.to_string())
                .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
            {
                Ok(entry) => entry,
                Err(e) => {
                    // Read-only path: skip quietly, never crash the caller.
                    warn!(path = %path.display(), error = %e, "Skipping unreadable ledger file");
                    continue;
                }
            };

            // The filename date and the embedded trading date must agree;
            // a mismatch means the file was renamed or mis-written.
            if file_date(name).is_some_and(|date| {
                NaiveDate::parse_from_str(&entry.trading_date, "%Y-%m-%d") != Ok(date)
            }) {
                warn!(
                    path = %path.display(),
                    embedded = %entry.trading_date,
                    "Filename date does not match embedded trading date, skipping"
                );
                continue;
            }

            if entry.trade_completed {
                rollup.absorb(&entry);
            }
        }
        rollup
    }
}

/// Parse the leading `YYYY-MM-DD` token of a ledger file name.
fn file_date(name: &str) -> Option<NaiveDate> {
    let token = name.get(..10)?;
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}
