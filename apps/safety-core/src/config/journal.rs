//! Ledger journal location settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the per-intent ledger files and the audit journal live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory holding one JSON file per intent.
    #[serde(default = "default_journal_dir")]
    pub journal_dir: PathBuf,
    /// Append-only audit event journal (JSONL).
    #[serde(default = "default_audit_path")]
    pub audit_path: PathBuf,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            journal_dir: default_journal_dir(),
            audit_path: default_audit_path(),
        }
    }
}

fn default_journal_dir() -> PathBuf {
    PathBuf::from("data/journal")
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("data/audit.jsonl")
}
