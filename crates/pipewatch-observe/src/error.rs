//! Error types for the observer layer.

use pipewatch_core::CoreError;

/// Errors that can occur while attaching, configuring or replaying.
#[derive(Debug, thiserror::Error)]
pub enum ObserveError {
    /// A pipeline or node operation failed.
    #[error("pipeline error: {0}")]
    Core(#[from] CoreError),

    /// Configuration could not be parsed.
    #[error("invalid observer configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON serialization or deserialization failed.
    #[error("observe serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
