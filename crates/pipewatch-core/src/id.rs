//! Stable ID newtypes for pipeline entities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable node identifier: the node's permanent arena slot.
///
/// Assigned once when the pipeline creates the node and never reused. Unlike
/// the node's `index`, which moves as nodes are removed, a `NodeId` stays
/// valid for the node's whole life and is what identity lookups key on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena slot as a `usize` for indexing.
    pub fn slot(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        NodeId(raw)
    }
}
