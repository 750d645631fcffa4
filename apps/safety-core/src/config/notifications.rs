//! Operator notification settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Upper bound the push endpoint accepts for the emergency `expire`
/// parameter, in seconds.
pub const MAX_EMERGENCY_EXPIRE_SECS: u64 = 10_800;

/// Lower bound the push endpoint accepts for the emergency `retry`
/// parameter, in seconds.
pub const MIN_EMERGENCY_RETRY_SECS: u64 = 30;

/// Settings for the notification pipeline and its push transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Push endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Application token for the push endpoint.
    #[serde(default)]
    pub token: String,
    /// Destination user key.
    #[serde(default)]
    pub user: String,
    /// Nominal queue capacity; normal-priority messages past this are dropped.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Client-side send timeout, seconds. Must be strictly shorter than
    /// `stall_threshold_secs` so the watchdog never races an in-flight send.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
    /// Worker liveness heartbeat interval, seconds.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// No-dequeue-progress threshold before the watchdog restarts the
    /// worker, seconds.
    #[serde(default = "default_stall_threshold")]
    pub stall_threshold_secs: u64,
    /// Watchdog check interval, seconds.
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,
    /// Minimum interval between emergency notifications of the same event
    /// type, seconds.
    #[serde(default = "default_emergency_renotify")]
    pub emergency_renotify_secs: u64,
    /// `expire` parameter sent with emergency notifications, seconds.
    #[serde(default = "default_emergency_expire")]
    pub emergency_expire_secs: u64,
    /// `retry` parameter sent with emergency notifications, seconds.
    #[serde(default = "default_emergency_retry")]
    pub emergency_retry_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: String::new(),
            user: String::new(),
            queue_capacity: default_queue_capacity(),
            send_timeout_secs: default_send_timeout(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            stall_threshold_secs: default_stall_threshold(),
            watchdog_interval_secs: default_watchdog_interval(),
            emergency_renotify_secs: default_emergency_renotify(),
            emergency_expire_secs: default_emergency_expire(),
            emergency_retry_secs: default_emergency_retry(),
        }
    }
}

impl NotificationConfig {
    /// Check invariants the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns an error if the send timeout does not undercut the stall
    /// threshold, or the emergency parameters fall outside the endpoint's
    /// accepted ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.send_timeout_secs >= self.stall_threshold_secs {
            return Err(ConfigError::Invalid(format!(
                "send_timeout_secs ({}) must be strictly shorter than stall_threshold_secs ({})",
                self.send_timeout_secs, self.stall_threshold_secs
            )));
        }
        if self.emergency_expire_secs > MAX_EMERGENCY_EXPIRE_SECS {
            return Err(ConfigError::Invalid(format!(
                "emergency_expire_secs ({}) exceeds endpoint maximum ({MAX_EMERGENCY_EXPIRE_SECS})",
                self.emergency_expire_secs
            )));
        }
        if self.emergency_retry_secs < MIN_EMERGENCY_RETRY_SECS {
            return Err(ConfigError::Invalid(format!(
                "emergency_retry_secs ({}) is below endpoint minimum ({MIN_EMERGENCY_RETRY_SECS})",
                self.emergency_retry_secs
            )));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Send timeout as a [`Duration`].
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    /// Heartbeat interval as a [`Duration`].
    #[must_use]
    pub const fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    /// Stall threshold as a [`Duration`].
    #[must_use]
    pub const fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_threshold_secs)
    }

    /// Watchdog interval as a [`Duration`].
    #[must_use]
    pub const fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    /// Emergency re-notify interval as a [`Duration`].
    #[must_use]
    pub const fn emergency_renotify_interval(&self) -> Duration {
        Duration::from_secs(self.emergency_renotify_secs)
    }
}

fn default_endpoint() -> String {
    "https://api.pushover.net/1/messages.json".to_string()
}

const fn default_queue_capacity() -> usize {
    64
}

const fn default_send_timeout() -> u64 {
    10
}

const fn default_heartbeat_interval() -> u64 {
    60
}

const fn default_stall_threshold() -> u64 {
    120
}

const fn default_watchdog_interval() -> u64 {
    15
}

const fn default_emergency_renotify() -> u64 {
    300
}

const fn default_emergency_expire() -> u64 {
    3600
}

const fn default_emergency_retry() -> u64 {
    60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(NotificationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_emergency_expire_bounds() {
        let mut config = NotificationConfig::default();
        config.emergency_expire_secs = MAX_EMERGENCY_EXPIRE_SECS + 1;
        assert!(config.validate().is_err());

        config.emergency_expire_secs = MAX_EMERGENCY_EXPIRE_SECS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_emergency_retry_bounds() {
        let mut config = NotificationConfig::default();
        config.emergency_retry_secs = MIN_EMERGENCY_RETRY_SECS - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = NotificationConfig::default();
        config.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
