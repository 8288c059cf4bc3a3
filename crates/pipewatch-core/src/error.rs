//! Core error types for pipewatch-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Every fault is
//! raised at the point of access and propagated; nothing is retried.

use crate::id::NodeId;
use thiserror::Error;

/// Core errors produced by the pipewatch-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A node was asked for a field or list it does not have.
    #[error("invalid node shape: no field '{field}'")]
    InvalidNodeShape { field: String },

    /// A write targeted a slot that has not been materialized.
    #[error("index {index} out of range for sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// A node id was not found in the pipeline arena.
    #[error("node not found: NodeId({id})", id = id.0)]
    NodeNotFound { id: NodeId },

    /// The node exists but is no longer part of the pipeline.
    #[error("node already removed: NodeId({id})", id = id.0)]
    NodeRemoved { id: NodeId },

    /// A sequence already has a listener installed.
    #[error("sequence is already observed")]
    AlreadyObserved,

    /// A node already carries write traps.
    #[error("node already instrumented: NodeId({id})", id = id.0)]
    AlreadyInstrumented { id: NodeId },

    /// The arena has no node ids left to hand out.
    #[error("node capacity exhausted after {created} nodes")]
    CapacityExhausted { created: usize },

    /// A script value does not fit the list it targets.
    #[error("invalid value: {reason}")]
    InvalidValue { reason: String },
}
