//! Safety Core Binary
//!
//! Starts the execution safety core with the no-op adapter: the full gate,
//! ledger, exposure, and notification stack runs, but no venue is touched.
//! A live deployment swaps the adapter at this composition root.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin safety-core
//! ```
//!
//! # Configuration
//!
//! Read from `config/safety-core.toml` (optional) plus `SAFETY_`-prefixed
//! environment variables, e.g. `SAFETY_NOTIFICATIONS__TOKEN`.
//! `RUST_LOG` controls log verbosity (default: info).

use std::sync::Arc;

use safety_core::audit::{AuditSink, JsonlAuditSink};
use safety_core::config::Config;
use safety_core::execution::{ExecutionCoordinator, NoopAdapter};
use safety_core::exposure::IntentExposureTracker;
use safety_core::ledger::{ExecutionLedger, ExecutionSummary};
use safety_core::notify::{NotificationPipeline, Notifier, PushClient};
use safety_core::observability::init_tracing;
use safety_core::risk::{RiskGate, StaticRecoveryGuard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    tracing::info!("Starting execution safety core");

    let config = Config::load()?;
    let audit: Arc<dyn AuditSink> = Arc::new(JsonlAuditSink::open(&config.journal.audit_path)?);
    let ledger = Arc::new(ExecutionLedger::open(
        &config.journal.journal_dir,
        Arc::clone(&audit),
    )?);
    let tracker = Arc::new(IntentExposureTracker::new());
    let summary = Arc::new(ExecutionSummary::new());

    let gate = RiskGate::new(
        Arc::new(StaticRecoveryGuard::default()),
        config.sessions.clone(),
        Arc::clone(&audit),
        config.safety.gate_diagnostics,
    );

    let transport = Arc::new(PushClient::new(&config.notifications)?);
    let pipeline = Arc::new(NotificationPipeline::start(&config.notifications, transport));
    let notifier: Arc<dyn Notifier> = Arc::clone(&pipeline) as Arc<dyn Notifier>;

    let adapter = Arc::new(NoopAdapter::new(config.safety.order_tag_prefix.clone()));
    let coordinator = ExecutionCoordinator::new(
        gate,
        ledger,
        tracker,
        adapter,
        notifier,
        Arc::clone(&audit),
        Arc::clone(&summary),
    );

    tracing::info!(
        journal_dir = %config.journal.journal_dir.display(),
        "Safety core ready, press ctrl-c to stop"
    );
    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down");
    audit.record(&coordinator.summary().export_event());
    pipeline.shutdown().await;

    tracing::info!("Safety core stopped");
    Ok(())
}
