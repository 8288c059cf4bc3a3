//! Serializable mutation scripts.
//!
//! A [`Mutation`] describes one collaborator-side edit to a [`Pipeline`].
//! Scripts are plain JSON, so a run can be captured once and replayed
//! against any number of observers. Lists are named by field (`inputs`,
//! `control`, `literals`); values aimed at a reference list must be node ids.
//!
//! [`Pipeline::apply`] validates a mutation fully before touching anything,
//! so a failing mutation leaves the pipeline unchanged.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;
use crate::node::{ListKind, Literal};
use crate::pipeline::Pipeline;
use crate::sequence::ObservableSequence;

/// One pipeline edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Mutation {
    /// Create a node, appended to the pipeline.
    Create {
        opcode: String,
        #[serde(default)]
        inputs: Vec<NodeId>,
        #[serde(default)]
        literals: Vec<Literal>,
    },
    SetOpcode { node: NodeId, opcode: String },
    SetIndex { node: NodeId, index: i64 },
    /// Remove a node from the live collection.
    RemoveNode { node: NodeId },
    Push { node: NodeId, list: String, value: Literal },
    Insert {
        node: NodeId,
        list: String,
        index: usize,
        value: Literal,
    },
    Replace {
        node: NodeId,
        list: String,
        index: usize,
        value: Literal,
    },
    /// Empty a slot without shrinking the list.
    Unset { node: NodeId, list: String, index: usize },
    RemoveAt { node: NodeId, list: String, index: usize },
    Truncate { node: NodeId, list: String, len: usize },
    Clear { node: NodeId, list: String },
}

/// A list edit independent of the element type.
enum ListEdit<T> {
    Push(T),
    Insert(usize, T),
    Replace(usize, T),
    Unset(usize),
    RemoveAt(usize),
    Truncate(usize),
    Clear,
}

impl<T: Clone> ListEdit<T> {
    fn map_value<U>(self, f: impl FnOnce(T) -> Result<U, CoreError>) -> Result<ListEdit<U>, CoreError> {
        Ok(match self {
            ListEdit::Push(v) => ListEdit::Push(f(v)?),
            ListEdit::Insert(i, v) => ListEdit::Insert(i, f(v)?),
            ListEdit::Replace(i, v) => ListEdit::Replace(i, f(v)?),
            ListEdit::Unset(i) => ListEdit::Unset(i),
            ListEdit::RemoveAt(i) => ListEdit::RemoveAt(i),
            ListEdit::Truncate(n) => ListEdit::Truncate(n),
            ListEdit::Clear => ListEdit::Clear,
        })
    }

    fn run(self, seq: &mut ObservableSequence<T>) -> Result<(), CoreError> {
        match self {
            ListEdit::Push(v) => seq.push(v),
            ListEdit::Insert(i, v) => seq.insert(i, v)?,
            ListEdit::Replace(i, v) => {
                seq.set(i, v)?;
            }
            ListEdit::Unset(i) => {
                seq.unset(i)?;
            }
            ListEdit::RemoveAt(i) => {
                seq.remove(i)?;
            }
            ListEdit::Truncate(n) => seq.truncate(n),
            ListEdit::Clear => seq.clear(),
        }
        Ok(())
    }
}

impl Pipeline {
    /// Applies one mutation.
    pub fn apply(&mut self, mutation: &Mutation) -> Result<(), CoreError> {
        match mutation {
            Mutation::Create {
                opcode,
                inputs,
                literals,
            } => {
                self.create_with(opcode.clone(), inputs, literals.clone())?;
                Ok(())
            }
            Mutation::SetOpcode { node, opcode } => {
                self.require(*node)?.set_opcode(opcode.clone());
                Ok(())
            }
            Mutation::SetIndex { node, index } => {
                self.require(*node)?.set_index(*index);
                Ok(())
            }
            Mutation::RemoveNode { node } => self.remove(*node),
            Mutation::Push { node, list, value } => {
                self.edit_list(*node, list, ListEdit::Push(value.clone()))
            }
            Mutation::Insert {
                node,
                list,
                index,
                value,
            } => self.edit_list(*node, list, ListEdit::Insert(*index, value.clone())),
            Mutation::Replace {
                node,
                list,
                index,
                value,
            } => self.edit_list(*node, list, ListEdit::Replace(*index, value.clone())),
            Mutation::Unset { node, list, index } => {
                self.edit_list(*node, list, ListEdit::Unset(*index))
            }
            Mutation::RemoveAt { node, list, index } => {
                self.edit_list(*node, list, ListEdit::RemoveAt(*index))
            }
            Mutation::Truncate { node, list, len } => {
                self.edit_list(*node, list, ListEdit::Truncate(*len))
            }
            Mutation::Clear { node, list } => self.edit_list(*node, list, ListEdit::Clear),
        }
    }

    /// Applies every mutation in order, stopping at the first failure.
    pub fn apply_all<'a, I>(&mut self, script: I) -> Result<(), CoreError>
    where
        I: IntoIterator<Item = &'a Mutation>,
    {
        for mutation in script {
            self.apply(mutation)?;
        }
        Ok(())
    }

    fn edit_list(&self, id: NodeId, list: &str, edit: ListEdit<Literal>) -> Result<(), CoreError> {
        let node = self.require(id)?;
        match list.parse::<ListKind>()?.as_ref_list() {
            None => node.edit_literals(|seq| edit.run(seq)),
            Some(refs) => {
                let edit = edit.map_value(|value| self.resolve_ref(&value))?;
                node.edit_refs(refs, |seq| edit.run(seq))
            }
        }
    }

    fn resolve_ref(&self, value: &Literal) -> Result<NodeId, CoreError> {
        let id = value
            .as_u64()
            .and_then(|raw| u32::try_from(raw).ok())
            .map(NodeId)
            .ok_or_else(|| CoreError::InvalidValue {
                reason: format!("expected a node id, found {value}"),
            })?;
        self.require(id)?;
        Ok(id)
    }
}
