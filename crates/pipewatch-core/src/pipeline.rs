//! Pipeline: the node container observers attach to.
//!
//! [`Pipeline`] owns an arena of every node it ever created, indexed by
//! [`NodeId`], and an ordered collection of the live nodes. A node's `index`
//! field is its position in that collection.
//!
//! Observers attach through one of two explicit entry points, never by
//! altering the pipeline's behavior:
//! - [`Pipeline::subscribe`] registers a creation hook, called with each new
//!   node after it is fully built.
//! - [`Pipeline::observe_nodes`] installs a listener on the live node
//!   collection; appending a new node reports an `Add` carrying it.
//!
//! Both fire at the same point of [`Pipeline::create`], after the node's
//! initial inputs are in place, so either one sees the same node state.

use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{Literal, NodeRef, REMOVED_INDEX};
use crate::sequence::{ObservableSequence, SequenceListener};

/// Hook invoked with every newly created node.
pub type CreateHook = Box<dyn FnMut(&NodeRef)>;

/// A pipeline of nodes with ordered reference lists.
pub struct Pipeline {
    /// Every node ever created, indexed by `NodeId`.
    arena: Vec<NodeRef>,
    /// Live nodes in index order.
    nodes: ObservableSequence<NodeRef>,
    hooks: Vec<CreateHook>,
}

impl Pipeline {
    pub fn new() -> Self {
        Pipeline {
            arena: Vec::new(),
            nodes: ObservableSequence::new(),
            hooks: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// Looks a node up by its arena slot, removed nodes included.
    pub fn node(&self, id: NodeId) -> Option<&NodeRef> {
        self.arena.get(id.slot())
    }

    /// Live node at position `index`.
    pub fn get(&self, index: usize) -> Option<&NodeRef> {
        self.nodes.get(index)
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes ever created.
    pub fn created(&self) -> usize {
        self.arena.len()
    }

    /// Live nodes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeRef> + '_ {
        self.nodes.values()
    }

    /// Resolves `id`, failing if it was never allocated.
    pub fn require(&self, id: NodeId) -> Result<&NodeRef, CoreError> {
        self.node(id).ok_or(CoreError::NodeNotFound { id })
    }

    // -----------------------------------------------------------------------
    // Attachment points
    // -----------------------------------------------------------------------

    /// Registers a hook called with every node created from now on.
    pub fn subscribe(&mut self, hook: CreateHook) {
        self.hooks.push(hook);
    }

    /// Installs a listener on the live node collection.
    ///
    /// Nodes already present are not replayed; the listener sees changes
    /// from now on only.
    pub fn observe_nodes(&mut self, listener: SequenceListener<NodeRef>) -> Result<(), CoreError> {
        self.nodes.listen(listener)
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    /// Creates a node with `opcode` and the given initial inputs and appends
    /// it to the pipeline.
    pub fn create(&mut self, opcode: impl Into<String>, inputs: &[NodeId]) -> Result<NodeRef, CoreError> {
        self.create_with(opcode, inputs, Vec::new())
    }

    /// Like [`Pipeline::create`], with initial literals as well.
    pub fn create_with(
        &mut self,
        opcode: impl Into<String>,
        inputs: &[NodeId],
        literals: Vec<Literal>,
    ) -> Result<NodeRef, CoreError> {
        for &input in inputs {
            self.require(input)?;
        }

        let id = next_id(self.arena.len())?;
        let index = self.nodes.len() as i64;
        let node = NodeRef::new(id, index, opcode.into(), inputs.to_vec(), literals);

        self.arena.push(node.clone());
        self.nodes.push(node.clone());
        for hook in self.hooks.iter_mut() {
            hook(&node);
        }
        tracing::trace!(node = %id, index, "node created");
        Ok(node)
    }

    /// Removes `id` from the live collection.
    ///
    /// The removed node's index becomes [`REMOVED_INDEX`] first, then every
    /// later node is re-indexed in ascending order. The node stays in the
    /// arena and keeps its lists.
    pub fn remove(&mut self, id: NodeId) -> Result<(), CoreError> {
        let node = self.require(id)?.clone();
        let position = self
            .nodes
            .values()
            .position(|live| live.id() == id)
            .ok_or(CoreError::NodeRemoved { id })?;

        node.set_index(REMOVED_INDEX);
        self.nodes.remove(position)?;

        let shifted: Vec<NodeRef> = self.nodes.values().skip(position).cloned().collect();
        for (offset, later) in shifted.iter().enumerate() {
            later.set_index((position + offset) as i64);
        }
        tracing::trace!(node = %id, shifted = shifted.len(), "node removed");
        Ok(())
    }
}

/// Id for the node created after `created` others.
fn next_id(created: usize) -> Result<NodeId, CoreError> {
    u32::try_from(created)
        .map(NodeId)
        .map_err(|_| CoreError::CapacityExhausted { created })
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}
