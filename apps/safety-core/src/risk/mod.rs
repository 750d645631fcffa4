//! Fail-closed risk gating.
//!
//! Every entry submission, protective-order submission, and order
//! modification passes through [`RiskGate::check_gates`] first. Flatten and
//! emergency-exit paths bypass the gate by design: flattening must never be
//! blocked by the checks that block new risk.

mod gate;
mod guard;

pub use gate::{Gate, GateInputs, RiskGate, RiskGateResult, RunMode};
pub use guard::{ExecutionPermission, RecoveryGuard, StaticRecoveryGuard};
