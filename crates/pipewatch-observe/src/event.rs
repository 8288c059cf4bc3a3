//! Change events: the wire contract for downstream consumers.
//!
//! Events serialize to JSON objects tagged by `action`:
//!
//! | action | fields |
//! |--------|--------|
//! | `create` | `node` (raw index), `opcode` |
//! | `changeIndex`, `changeOpcode` | `node`, `from`, `to` |
//! | `addInput`, `addControl`, `addLiteral` | `node`, `other` |
//! | `removeInput`, `removeControl`, `removeLiteral` | `node`, `old`, `index` |
//! | `replaceInput`, `replaceControl`, `replaceLiteral` | `node`, `index`, `from`, `to` |
//!
//! `create` is the only event that carries the node's raw index rather than
//! its handle; every later event refers to the node by [`Handle`]. Reference
//! fields are `null` when the slot involved was empty.

use pipewatch_core::{Literal, RefList};
use serde::{Deserialize, Serialize};

use crate::registry::Handle;

/// One normalized, observed mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ChangeEvent {
    Create { node: i64, opcode: String },
    ChangeIndex { node: Handle, from: i64, to: i64 },
    ChangeOpcode { node: Handle, from: String, to: String },

    AddInput { node: Handle, other: Option<Handle> },
    RemoveInput { node: Handle, old: Option<Handle>, index: usize },
    ReplaceInput {
        node: Handle,
        index: usize,
        from: Option<Handle>,
        to: Option<Handle>,
    },

    AddControl { node: Handle, other: Option<Handle> },
    RemoveControl { node: Handle, old: Option<Handle>, index: usize },
    ReplaceControl {
        node: Handle,
        index: usize,
        from: Option<Handle>,
        to: Option<Handle>,
    },

    AddLiteral { node: Handle, other: Literal },
    RemoveLiteral { node: Handle, old: Literal, index: usize },
    ReplaceLiteral {
        node: Handle,
        index: usize,
        from: Literal,
        to: Literal,
    },
}

impl ChangeEvent {
    /// The `action` tag as it appears on the wire.
    pub fn action(&self) -> &'static str {
        match self {
            ChangeEvent::Create { .. } => "create",
            ChangeEvent::ChangeIndex { .. } => "changeIndex",
            ChangeEvent::ChangeOpcode { .. } => "changeOpcode",
            ChangeEvent::AddInput { .. } => "addInput",
            ChangeEvent::RemoveInput { .. } => "removeInput",
            ChangeEvent::ReplaceInput { .. } => "replaceInput",
            ChangeEvent::AddControl { .. } => "addControl",
            ChangeEvent::RemoveControl { .. } => "removeControl",
            ChangeEvent::ReplaceControl { .. } => "replaceControl",
            ChangeEvent::AddLiteral { .. } => "addLiteral",
            ChangeEvent::RemoveLiteral { .. } => "removeLiteral",
            ChangeEvent::ReplaceLiteral { .. } => "replaceLiteral",
        }
    }

    /// Handle of the node the event is about; `None` for `create`.
    pub fn handle(&self) -> Option<Handle> {
        match self {
            ChangeEvent::Create { .. } => None,
            ChangeEvent::ChangeIndex { node, .. }
            | ChangeEvent::ChangeOpcode { node, .. }
            | ChangeEvent::AddInput { node, .. }
            | ChangeEvent::RemoveInput { node, .. }
            | ChangeEvent::ReplaceInput { node, .. }
            | ChangeEvent::AddControl { node, .. }
            | ChangeEvent::RemoveControl { node, .. }
            | ChangeEvent::ReplaceControl { node, .. }
            | ChangeEvent::AddLiteral { node, .. }
            | ChangeEvent::RemoveLiteral { node, .. }
            | ChangeEvent::ReplaceLiteral { node, .. } => Some(*node),
        }
    }

    pub(crate) fn added(list: RefList, node: Handle, other: Option<Handle>) -> Self {
        match list {
            RefList::Inputs => ChangeEvent::AddInput { node, other },
            RefList::Control => ChangeEvent::AddControl { node, other },
        }
    }

    pub(crate) fn removed(list: RefList, node: Handle, old: Option<Handle>, index: usize) -> Self {
        match list {
            RefList::Inputs => ChangeEvent::RemoveInput { node, old, index },
            RefList::Control => ChangeEvent::RemoveControl { node, old, index },
        }
    }

    pub(crate) fn replaced(
        list: RefList,
        node: Handle,
        index: usize,
        from: Option<Handle>,
        to: Option<Handle>,
    ) -> Self {
        match list {
            RefList::Inputs => ChangeEvent::ReplaceInput { node, index, from, to },
            RefList::Control => ChangeEvent::ReplaceControl { node, index, from, to },
        }
    }
}
