//! Observer configuration.
//!
//! Reads from environment variables:
//! - `PIPEWATCH_ATTACH`: attachment strategy, `collection` (default) or
//!   `factory`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ObserveError;

/// Environment variable selecting the attachment strategy.
pub const ATTACH_ENV: &str = "PIPEWATCH_ATTACH";

/// How the observer learns about newly created nodes.
///
/// Both strategies produce the same event sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachStrategy {
    /// Listen to `Add` changes on the pipeline's node collection.
    #[default]
    Collection,
    /// Register a creation hook with the pipeline.
    Factory,
}

impl AttachStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            AttachStrategy::Collection => "collection",
            AttachStrategy::Factory => "factory",
        }
    }
}

impl fmt::Display for AttachStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttachStrategy {
    type Err = ObserveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "collection" => Ok(AttachStrategy::Collection),
            "factory" => Ok(AttachStrategy::Factory),
            other => Err(ObserveError::InvalidConfig {
                reason: format!("unknown attach strategy '{other}'"),
            }),
        }
    }
}

/// Settings for [`crate::ChangeObserver::attach`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    pub strategy: AttachStrategy,
}

impl ObserverConfig {
    pub fn with_strategy(strategy: AttachStrategy) -> Self {
        ObserverConfig { strategy }
    }

    /// Builds a config from the process environment, falling back to
    /// defaults for unset variables.
    pub fn from_env() -> Result<Self, ObserveError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ObserveError> {
        let strategy = match lookup(ATTACH_ENV) {
            Some(raw) => raw.parse()?,
            None => AttachStrategy::default(),
        };
        Ok(ObserverConfig { strategy })
    }

    /// Parses a JSON config document.
    pub fn from_json(raw: &str) -> Result<Self, ObserveError> {
        Ok(serde_json::from_str(raw)?)
    }
}
