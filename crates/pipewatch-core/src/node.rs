//! Pipeline nodes and their instrumentation points.
//!
//! A [`NodeRef`] is a shared handle to one node: a mutable `index` (its
//! position in the pipeline, [`REMOVED_INDEX`] once removed), a mutable
//! `opcode`, and three [`ObservableSequence`] lists. `inputs` and `control`
//! hold references to other nodes by [`NodeId`]; `literals` holds opaque
//! values.
//!
//! Every field is reached only through accessor methods. Scalar writes go
//! through [`NodeRef::set_index`] and [`NodeRef::set_opcode`], which invoke
//! the node's [`FieldTrap`] once one is installed; list writes go through the
//! sequences, which invoke their own listeners. [`NodeRef::instrument`]
//! installs all four hooks at once and cannot be undone.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::sequence::{ObservableSequence, SequenceListener};

/// Opaque literal value carried by a node.
pub type Literal = serde_json::Value;

/// Sentinel `index` of a node that is no longer part of its pipeline.
pub const REMOVED_INDEX: i64 = -1;

// ---------------------------------------------------------------------------
// List names
// ---------------------------------------------------------------------------

/// A node list holding references to other nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefList {
    Inputs,
    Control,
}

/// Any of the three node lists, addressable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Inputs,
    Control,
    Literals,
}

impl ListKind {
    /// Field name as it appears on the node.
    pub fn as_str(self) -> &'static str {
        match self {
            ListKind::Inputs => "inputs",
            ListKind::Control => "control",
            ListKind::Literals => "literals",
        }
    }

    /// The reference list this names, or `None` for `literals`.
    pub fn as_ref_list(self) -> Option<RefList> {
        match self {
            ListKind::Inputs => Some(RefList::Inputs),
            ListKind::Control => Some(RefList::Control),
            ListKind::Literals => None,
        }
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inputs" => Ok(ListKind::Inputs),
            "control" => Ok(ListKind::Control),
            "literals" => Ok(ListKind::Literals),
            other => Err(CoreError::InvalidNodeShape {
                field: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Instrumentation
// ---------------------------------------------------------------------------

/// A write to one of the node's scalar fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWrite {
    Index { from: i64, to: i64 },
    Opcode { from: String, to: String },
}

/// Write trap invoked on every scalar field write, equal values included.
pub type FieldTrap = Box<dyn FnMut(&FieldWrite)>;

/// The full set of hooks installed on a node by [`NodeRef::instrument`].
pub struct Instrumentation {
    pub fields: FieldTrap,
    pub inputs: SequenceListener<NodeId>,
    pub control: SequenceListener<NodeId>,
    pub literals: SequenceListener<Literal>,
}

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

struct NodeData {
    index: i64,
    opcode: String,
    inputs: ObservableSequence<NodeId>,
    control: ObservableSequence<NodeId>,
    literals: ObservableSequence<Literal>,
    trap: Option<FieldTrap>,
}

impl NodeData {
    fn refs_mut(&mut self, list: RefList) -> &mut ObservableSequence<NodeId> {
        match list {
            RefList::Inputs => &mut self.inputs,
            RefList::Control => &mut self.control,
        }
    }

    fn refs(&self, list: RefList) -> &ObservableSequence<NodeId> {
        match list {
            RefList::Inputs => &self.inputs,
            RefList::Control => &self.control,
        }
    }
}

/// Shared handle to a pipeline node.
///
/// Clones refer to the same node. Equality is node identity (same
/// [`NodeId`]), never field equality. Hooks run while the node is borrowed,
/// so they must not call back into the node they observe.
#[derive(Clone)]
pub struct NodeRef {
    id: NodeId,
    data: Rc<RefCell<NodeData>>,
}

impl NodeRef {
    pub(crate) fn new(
        id: NodeId,
        index: i64,
        opcode: String,
        inputs: Vec<NodeId>,
        literals: Vec<Literal>,
    ) -> Self {
        NodeRef {
            id,
            data: Rc::new(RefCell::new(NodeData {
                index,
                opcode,
                inputs: inputs.into_iter().collect(),
                control: ObservableSequence::new(),
                literals: literals.into_iter().collect(),
                trap: None,
            })),
        }
    }

    // -----------------------------------------------------------------------
    // Scalar fields
    // -----------------------------------------------------------------------

    /// Permanent arena slot of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Current position in the pipeline, or [`REMOVED_INDEX`].
    pub fn index(&self) -> i64 {
        self.data.borrow().index
    }

    pub fn opcode(&self) -> String {
        self.data.borrow().opcode.clone()
    }

    pub fn is_removed(&self) -> bool {
        self.index() == REMOVED_INDEX
    }

    /// Writes `index`, firing the field trap.
    pub fn set_index(&self, index: i64) {
        let mut data = self.data.borrow_mut();
        let from = std::mem::replace(&mut data.index, index);
        if let Some(trap) = data.trap.as_mut() {
            trap(&FieldWrite::Index { from, to: index });
        }
    }

    /// Writes `opcode`, firing the field trap.
    pub fn set_opcode(&self, opcode: impl Into<String>) {
        let opcode = opcode.into();
        let mut data = self.data.borrow_mut();
        let from = std::mem::replace(&mut data.opcode, opcode.clone());
        if let Some(trap) = data.trap.as_mut() {
            trap(&FieldWrite::Opcode { from, to: opcode });
        }
    }

    // -----------------------------------------------------------------------
    // Lists: reads
    // -----------------------------------------------------------------------

    /// Non-empty input references in order.
    pub fn inputs(&self) -> Vec<NodeId> {
        self.refs(RefList::Inputs)
    }

    /// Non-empty control references in order.
    pub fn control(&self) -> Vec<NodeId> {
        self.refs(RefList::Control)
    }

    pub fn literals(&self) -> Vec<Literal> {
        self.data.borrow().literals.values().cloned().collect()
    }

    pub fn refs(&self, list: RefList) -> Vec<NodeId> {
        self.data.borrow().refs(list).values().copied().collect()
    }

    /// Reference at `index`, `None` if out of range or empty.
    pub fn input(&self, index: usize) -> Option<NodeId> {
        self.data.borrow().inputs.get(index).copied()
    }

    /// Materialized length of the named list.
    pub fn list_len(&self, field: &str) -> Result<usize, CoreError> {
        let data = self.data.borrow();
        Ok(match field.parse::<ListKind>()? {
            ListKind::Inputs => data.inputs.len(),
            ListKind::Control => data.control.len(),
            ListKind::Literals => data.literals.len(),
        })
    }

    // -----------------------------------------------------------------------
    // Lists: writes
    // -----------------------------------------------------------------------

    /// Runs `edit` against a reference list. All writes stay instrumented.
    pub fn edit_refs<R>(
        &self,
        list: RefList,
        edit: impl FnOnce(&mut ObservableSequence<NodeId>) -> R,
    ) -> R {
        edit(self.data.borrow_mut().refs_mut(list))
    }

    /// Runs `edit` against the literal list.
    pub fn edit_literals<R>(&self, edit: impl FnOnce(&mut ObservableSequence<Literal>) -> R) -> R {
        edit(&mut self.data.borrow_mut().literals)
    }

    pub fn add_input(&self, input: NodeId) {
        self.edit_refs(RefList::Inputs, |seq| seq.push(input));
    }

    /// Replaces the input at `index`, returning the displaced reference.
    pub fn replace_input(&self, index: usize, input: NodeId) -> Result<Option<NodeId>, CoreError> {
        self.edit_refs(RefList::Inputs, |seq| seq.set(index, input))
    }

    pub fn remove_input(&self, index: usize) -> Result<Option<NodeId>, CoreError> {
        self.edit_refs(RefList::Inputs, |seq| seq.remove(index))
    }

    /// Drops every input, highest index first.
    pub fn clear_inputs(&self) {
        self.edit_refs(RefList::Inputs, |seq| seq.clear());
    }

    pub fn add_control(&self, target: NodeId) {
        self.edit_refs(RefList::Control, |seq| seq.push(target));
    }

    pub fn replace_control(&self, index: usize, target: NodeId) -> Result<Option<NodeId>, CoreError> {
        self.edit_refs(RefList::Control, |seq| seq.set(index, target))
    }

    pub fn remove_control(&self, index: usize) -> Result<Option<NodeId>, CoreError> {
        self.edit_refs(RefList::Control, |seq| seq.remove(index))
    }

    pub fn clear_control(&self) {
        self.edit_refs(RefList::Control, |seq| seq.clear());
    }

    pub fn add_literal(&self, value: Literal) {
        self.edit_literals(|seq| seq.push(value));
    }

    pub fn replace_literal(&self, index: usize, value: Literal) -> Result<Option<Literal>, CoreError> {
        self.edit_literals(|seq| seq.set(index, value))
    }

    pub fn remove_literal(&self, index: usize) -> Result<Option<Literal>, CoreError> {
        self.edit_literals(|seq| seq.remove(index))
    }

    pub fn clear_literals(&self) {
        self.edit_literals(|seq| seq.clear());
    }

    // -----------------------------------------------------------------------
    // Instrumentation
    // -----------------------------------------------------------------------

    /// Returns `true` once [`NodeRef::instrument`] has succeeded.
    pub fn is_instrumented(&self) -> bool {
        self.data.borrow().trap.is_some()
    }

    /// Installs the field trap and the three list listeners.
    ///
    /// Lists are observed in `inputs`, `control`, `literals` order, each
    /// replaying its current contents as adds. Fails without side effects
    /// if any hook is already present.
    pub fn instrument(&self, hooks: Instrumentation) -> Result<(), CoreError> {
        let mut data = self.data.borrow_mut();
        if data.trap.is_some() {
            return Err(CoreError::AlreadyInstrumented { id: self.id });
        }
        if data.inputs.is_observed() || data.control.is_observed() || data.literals.is_observed() {
            return Err(CoreError::AlreadyObserved);
        }

        data.trap = Some(hooks.fields);
        data.inputs.observe(hooks.inputs)?;
        data.control.observe(hooks.control)?;
        data.literals.observe(hooks.literals)?;
        tracing::trace!(node = %self.id, "node instrumented");
        Ok(())
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.borrow();
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("index", &data.index)
            .field("opcode", &data.opcode)
            .field("inputs", &data.inputs)
            .field("control", &data.control)
            .field("literals", &data.literals)
            .finish()
    }
}
