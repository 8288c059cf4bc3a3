//! Stable handle allocation.
//!
//! [`IdentityRegistry`] maps each node, keyed by its permanent arena slot,
//! to a [`Handle`]. Handles start at 0, grow by one per new node, and are
//! never removed or reused. A node's handle is independent of its mutable
//! `index`.

use std::fmt;

use indexmap::IndexMap;
use pipewatch_core::NodeId;
use serde::{Deserialize, Serialize};

/// Stable integer identity of an observed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(pub u64);

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lookup-or-allocate table from node to handle.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    /// Insertion order is allocation order.
    handles: IndexMap<NodeId, Handle>,
    next: u64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the node's handle, allocating the next one on first sight.
    pub fn handle_of(&mut self, node: NodeId) -> Handle {
        if let Some(&handle) = self.handles.get(&node) {
            return handle;
        }
        let handle = Handle(self.next);
        self.next += 1;
        self.handles.insert(node, handle);
        tracing::trace!(%node, %handle, "handle allocated");
        handle
    }

    /// Existing handle, without allocating.
    pub fn get(&self, node: NodeId) -> Option<Handle> {
        self.handles.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Registered nodes in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Handle)> + '_ {
        self.handles.iter().map(|(&node, &handle)| (node, handle))
    }
}
