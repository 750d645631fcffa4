//! Trading session definitions.
//!
//! A session maps a name to the slot end times at which a stream is allowed
//! to act. The risk gate rejects any slot time that does not resolve to a
//! configured session, and any slot time a session does not list.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One configured session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionDefinition {
    /// Allowed slot end times, `HH:MM`.
    #[serde(default)]
    pub slot_end_times: Vec<String>,
}

impl SessionDefinition {
    /// Whether `slot_time` is one of this session's configured end times.
    #[must_use]
    pub fn allows_slot(&self, slot_time: &str) -> bool {
        self.slot_end_times.iter().any(|t| t == slot_time)
    }
}

/// All configured sessions, keyed by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCatalog {
    sessions: HashMap<String, SessionDefinition>,
}

impl SessionCatalog {
    /// Build a catalog from (name, slot end times) pairs.
    #[must_use]
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let sessions = pairs
            .into_iter()
            .map(|(name, times)| {
                (
                    name.into(),
                    SessionDefinition {
                        slot_end_times: times.into_iter().map(Into::into).collect(),
                    },
                )
            })
            .collect();
        Self { sessions }
    }

    /// Look up a session by name.
    #[must_use]
    pub fn resolve(&self, session: &str) -> Option<&SessionDefinition> {
        self.sessions.get(session)
    }

    /// Number of configured sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_and_slot_membership() {
        let catalog =
            SessionCatalog::from_pairs([("S1", vec!["07:30", "08:00"]), ("S2", vec!["13:30"])]);

        let s1 = catalog.resolve("S1").unwrap();
        assert!(s1.allows_slot("07:30"));
        assert!(s1.allows_slot("08:00"));
        assert!(!s1.allows_slot("09:00"));
        assert!(catalog.resolve("S3").is_none());
    }

    #[test]
    fn test_catalog_deserializes_transparent_map() {
        let toml = r#"
            [S1]
            slot_end_times = ["07:30", "08:00"]
        "#;
        let catalog: SessionCatalog = toml_from_str(toml);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.resolve("S1").unwrap().allows_slot("08:00"));
    }

    fn toml_from_str(raw: &str) -> SessionCatalog {
        let loaded = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap();
        loaded.try_deserialize().unwrap()
    }
}
