//! Gate diagnostics and order ownership settings.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Settings consumed by the risk gate and the owned-order filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Emit a `RISK_CHECK_EVALUATED` audit event on every gate evaluation,
    /// pass or fail.
    #[serde(default = "default_gate_diagnostics")]
    pub gate_diagnostics: bool,
    /// Tag prefix identifying orders this system placed. Matched
    /// case-insensitively; orders without it are never cancelled.
    #[serde(default = "default_order_tag_prefix")]
    pub order_tag_prefix: String,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            gate_diagnostics: default_gate_diagnostics(),
            order_tag_prefix: default_order_tag_prefix(),
        }
    }
}

impl SafetyConfig {
    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the order tag prefix is empty; an empty prefix
    /// would claim ownership of every working order at the venue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.order_tag_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "order_tag_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

const fn default_gate_diagnostics() -> bool {
    true
}

fn default_order_tag_prefix() -> String {
    "safetycore-".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_prefix_rejected() {
        let config = SafetyConfig {
            gate_diagnostics: true,
            order_tag_prefix: "  ".to_string(),
        };
        assert!(config.validate().is_err());
    }
}
