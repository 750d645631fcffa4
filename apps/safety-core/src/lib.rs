// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call,
        clippy::field_reassign_with_default
    )
)]

//! Execution Safety Core
//!
//! The fail-closed safety layer that sits between trading decisions and a
//! venue. Every order action passes an ordered, short-circuiting set of
//! risk gates, a durable idempotency check against a file-backed ledger,
//! and per-intent exposure tracking before it reaches the execution
//! adapter; anything ambiguous is blocked and alerted rather than sent.
//!
//! # Layers
//!
//! - `models`: intent identity, order kinds, account state
//! - `risk`: recovery guard seam + the ordered gate chain
//! - `exposure`: per-intent fill bookkeeping and stand-down state
//! - `ledger`: file-per-intent journal, idempotency, P&L rollups
//! - `execution`: adapter capability, no-op adapter, the coordinator that
//!   owns the control flow
//! - `notify`: self-healing operator notification pipeline
//! - `audit`: structured events for external monitoring
//! - `config` / `observability`: ambient wiring

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

pub mod audit;
pub mod config;
pub mod execution;
pub mod exposure;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod observability;
pub mod risk;
