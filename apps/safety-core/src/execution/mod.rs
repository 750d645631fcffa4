//! Execution adapter seam and the order-flow coordinator.
//!
//! The adapter is an abstract capability: this core never talks to a venue
//! directly. The coordinator is the one place the control flow lives:
//! gates, idempotency check, adapter call, then bookkeeping.

mod adapter;
mod coordinator;
mod noop;

pub use adapter::{AdapterError, AdapterResult, CancelReport, ExecutionAdapter, OrderRequest};
pub use coordinator::{
    CoordinatorError, EntryCommand, ExecutionCoordinator, FillEvent, SubmitOutcome,
};
pub use noop::NoopAdapter;
