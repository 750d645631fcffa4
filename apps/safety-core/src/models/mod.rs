//! Shared value types for the execution safety core.
//!
//! These types cross module boundaries: intent identity, order direction,
//! order kinds, and the account snapshot consumed by owned-order filtering.

mod account;
mod intent;

pub use account::{AccountSnapshot, OpenPosition, WorkingOrder};
pub use intent::{Direction, IntentId, IntentParams, OrderKind};
