//! Recovery-state and kill-switch capability.
//!
//! This core consumes connectivity/recovery state and the manual kill
//! switch but does not implement them; production wiring injects the real
//! implementation at composition time.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answer to "may new risk be taken right now?".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPermission {
    /// Whether execution is currently allowed.
    pub allowed: bool,
    /// Guard-supplied reason when blocked.
    pub reason: Option<String>,
}

impl ExecutionPermission {
    /// Permission with no restriction.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    /// Permission denied with a reason string.
    #[must_use]
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Connectivity/recovery-state capability consumed by the risk gate.
///
/// Both queries must be cheap and synchronous: they run on the caller's
/// execution thread before every order action and must never touch the
/// network.
pub trait RecoveryGuard: Send + Sync {
    /// Whether new risk-taking is allowed given current recovery state.
    fn execution_permission(&self) -> ExecutionPermission;

    /// Whether the process-wide manual kill switch is enabled.
    fn is_kill_switch_enabled(&self) -> bool;
}

/// In-process guard backed by two flags.
///
/// Serves test wiring and dry-run composition; a live deployment injects a
/// guard fed by its connectivity monitor instead.
#[derive(Debug)]
pub struct StaticRecoveryGuard {
    execution_allowed: AtomicBool,
    kill_switch: AtomicBool,
}

impl Default for StaticRecoveryGuard {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl StaticRecoveryGuard {
    /// Create a guard with the given initial flags.
    #[must_use]
    pub const fn new(execution_allowed: bool, kill_switch: bool) -> Self {
        Self {
            execution_allowed: AtomicBool::new(execution_allowed),
            kill_switch: AtomicBool::new(kill_switch),
        }
    }

    /// Flip the execution-allowed flag.
    pub fn set_execution_allowed(&self, allowed: bool) {
        self.execution_allowed.store(allowed, Ordering::SeqCst);
    }

    /// Flip the kill switch.
    pub fn set_kill_switch(&self, enabled: bool) {
        self.kill_switch.store(enabled, Ordering::SeqCst);
    }
}

impl RecoveryGuard for StaticRecoveryGuard {
    fn execution_permission(&self) -> ExecutionPermission {
        if self.execution_allowed.load(Ordering::SeqCst) {
            ExecutionPermission::allowed()
        } else {
            ExecutionPermission::blocked("RECOVERY_IN_PROGRESS")
        }
    }

    fn is_kill_switch_enabled(&self) -> bool {
        self.kill_switch.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_guard_flags() {
        let guard = StaticRecoveryGuard::default();
        assert!(guard.execution_permission().allowed);
        assert!(!guard.is_kill_switch_enabled());

        guard.set_execution_allowed(false);
        let permission = guard.execution_permission();
        assert!(!permission.allowed);
        assert_eq!(permission.reason.as_deref(), Some("RECOVERY_IN_PROGRESS"));

        guard.set_kill_switch(true);
        assert!(guard.is_kill_switch_enabled());
    }
}
