//! Engine configuration.
//!
//! Loaded from TOML or constructed with defaults. Every bound the policy
//! and classifier enforce lives here so tests can tighten them.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::errors::AgentError;

/// Tunable limits for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// How long a destructive-action confirmation stays valid, in seconds.
    pub confirmation_ttl_secs: u32,
    /// Upper bound on inbound message length, in characters.
    pub max_message_len: usize,
    /// Upper bound on a task description, in characters.
    pub max_task_description_len: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            confirmation_ttl_secs: 300,
            max_message_len: 4000,
            max_task_description_len: 1000,
        }
    }
}

impl AgentConfig {
    /// Confirmation TTL as a `chrono::Duration` for expiry arithmetic.
    pub fn confirmation_ttl(&self) -> Duration {
        Duration::seconds(i64::from(self.confirmation_ttl_secs))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AgentError> {
        toml::from_str(raw).map_err(|e| AgentError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let config = AgentConfig::default();
        assert_eq!(config.confirmation_ttl(), Duration::minutes(5));
        assert_eq!(config.max_message_len, 4000);
        assert_eq!(config.max_task_description_len, 1000);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AgentConfig::from_toml_str("confirmation_ttl_secs = 60").unwrap();
        assert_eq!(config.confirmation_ttl_secs, 60);
        assert_eq!(config.max_message_len, 4000);
    }
}
