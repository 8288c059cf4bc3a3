//! Pipeline data model with explicit instrumentation points.
//!
//! This crate is the collaborator side of pipewatch: a [`Pipeline`] of
//! nodes whose every mutable field is reachable only through accessors that
//! report writes, and the [`ObservableSequence`] container backing all node
//! lists. It knows nothing about events; observers attach through
//! [`Pipeline::subscribe`], [`Pipeline::observe_nodes`] and
//! [`NodeRef::instrument`].

pub mod error;
pub mod id;
pub mod node;
pub mod pipeline;
pub mod script;
pub mod sequence;

// Re-export commonly used types
pub use error::CoreError;
pub use id::NodeId;
pub use node::{
    FieldTrap, FieldWrite, Instrumentation, ListKind, Literal, NodeRef, RefList, REMOVED_INDEX,
};
pub use pipeline::{CreateHook, Pipeline};
pub use script::Mutation;
pub use sequence::{ObservableSequence, SequenceChange, SequenceListener};
