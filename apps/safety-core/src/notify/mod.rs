//! Self-healing operator notification pipeline.
//!
//! A bounded queue feeds a background worker that delivers alerts through
//! an HTTP push endpoint; an independent watchdog restarts the worker if it
//! stalls. Enqueueing never blocks the caller and nothing in here can
//! crash the host process — the worst outcome is "alert not sent".

mod pipeline;
mod push;
mod queue;
mod rate_limit;
mod request;

pub use pipeline::{NotificationPipeline, WorkerState};
pub use push::{AlertTransport, PushClient, PushError};
pub use queue::AlertQueue;
pub use rate_limit::EmergencyRateLimiter;
pub use request::{NotificationRequest, Priority};

/// Anything that can accept an operator alert.
///
/// The pipeline is the production implementation; tests substitute a
/// capturing one.
pub trait Notifier: Send + Sync {
    /// Enqueue an alert, best-effort. Returns whether it was accepted.
    fn notify(&self, request: NotificationRequest) -> bool;
}
