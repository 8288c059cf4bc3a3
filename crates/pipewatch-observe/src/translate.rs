//! Translation of low-level change records into [`ChangeEvent`]s.
//!
//! Each observed node gets three closures built here: a field trap for
//! `index`/`opcode`, a reference listener per reference list and a literal
//! listener. They run inline with the mutation that triggers them and push
//! exactly one event per change record.

use pipewatch_core::{
    FieldTrap, FieldWrite, Literal, NodeId, RefList, SequenceChange, SequenceListener,
};

use crate::event::ChangeEvent;
use crate::observer::SharedState;
use crate::registry::{Handle, IdentityRegistry};

pub(crate) fn field_trap(state: SharedState, owner: Handle) -> FieldTrap {
    Box::new(move |write| {
        let event = match write {
            FieldWrite::Index { from, to } => ChangeEvent::ChangeIndex {
                node: owner,
                from: *from,
                to: *to,
            },
            FieldWrite::Opcode { from, to } => ChangeEvent::ChangeOpcode {
                node: owner,
                from: from.clone(),
                to: to.clone(),
            },
        };
        state.borrow_mut().emit(event);
    })
}

pub(crate) fn reference_listener(
    state: SharedState,
    owner: Handle,
    list: RefList,
) -> SequenceListener<NodeId> {
    Box::new(move |change| {
        let mut state = state.borrow_mut();
        let event = translate_reference(&mut state.registry, owner, list, change);
        state.emit(event);
    })
}

pub(crate) fn literal_listener(state: SharedState, owner: Handle) -> SequenceListener<Literal> {
    Box::new(move |change| {
        let event = translate_literal(owner, change);
        state.borrow_mut().emit(event);
    })
}

/// Maps a reference-list change, resolving every node through `registry`.
///
/// A write that empties a slot is reported as a removal at that index.
pub(crate) fn translate_reference(
    registry: &mut IdentityRegistry,
    owner: Handle,
    list: RefList,
    change: &SequenceChange<NodeId>,
) -> ChangeEvent {
    let mut resolve = |slot: &Option<NodeId>| slot.map(|node| registry.handle_of(node));
    match change {
        SequenceChange::Add { value, .. } => ChangeEvent::added(list, owner, resolve(value)),
        SequenceChange::Delete { index, old } => {
            ChangeEvent::removed(list, owner, resolve(old), *index)
        }
        SequenceChange::Update {
            index,
            old,
            value: None,
        } => ChangeEvent::removed(list, owner, resolve(old), *index),
        SequenceChange::Update { index, old, value } => {
            let from = resolve(old);
            let to = resolve(value);
            ChangeEvent::replaced(list, owner, *index, from, to)
        }
    }
}

/// Maps a literal-list change. Values pass through untouched; empty slots
/// read as `null`.
pub(crate) fn translate_literal(owner: Handle, change: &SequenceChange<Literal>) -> ChangeEvent {
    let raw = |slot: &Option<Literal>| slot.clone().unwrap_or(Literal::Null);
    match change {
        SequenceChange::Add { value, .. } => ChangeEvent::AddLiteral {
            node: owner,
            other: raw(value),
        },
        SequenceChange::Delete { index, old } => ChangeEvent::RemoveLiteral {
            node: owner,
            old: raw(old),
            index: *index,
        },
        SequenceChange::Update { index, old, value } => ChangeEvent::ReplaceLiteral {
            node: owner,
            index: *index,
            from: raw(old),
            to: raw(value),
        },
    }
}
