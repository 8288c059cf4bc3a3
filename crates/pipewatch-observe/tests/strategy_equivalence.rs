//! Property tests: both attachment strategies observe identical logs, and
//! handles behave as permanent identities.

use std::collections::{HashMap, HashSet};

use pipewatch_core::{Mutation, NodeId, Pipeline};
use pipewatch_observe::{AttachStrategy, ChangeEvent, ChangeObserver, Handle, ObserverConfig};
use proptest::prelude::*;
use serde_json::json;

const MAX_NODES: u32 = 6;

fn node_id() -> impl Strategy<Value = NodeId> {
    (0..MAX_NODES).prop_map(NodeId)
}

fn list_name() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just("inputs".to_string()),
        3 => Just("control".to_string()),
        3 => Just("literals".to_string()),
        1 => Just("uses".to_string()),
    ]
}

fn mutation() -> impl Strategy<Value = Mutation> {
    let value = (0..MAX_NODES as u64).prop_map(|raw| json!(raw));
    prop_oneof![
        3 => ("[a-c]{1,3}", prop::collection::vec(node_id(), 0..3))
            .prop_map(|(opcode, inputs)| Mutation::Create { opcode, inputs, literals: vec![] }),
        1 => (node_id(), "[a-c]{1,3}").prop_map(|(node, opcode)| Mutation::SetOpcode { node, opcode }),
        1 => (node_id(), -1i64..4).prop_map(|(node, index)| Mutation::SetIndex { node, index }),
        1 => node_id().prop_map(|node| Mutation::RemoveNode { node }),
        3 => (node_id(), list_name(), value.clone())
            .prop_map(|(node, list, value)| Mutation::Push { node, list, value }),
        1 => (node_id(), list_name(), 0usize..4, value.clone())
            .prop_map(|(node, list, index, value)| Mutation::Insert { node, list, index, value }),
        2 => (node_id(), list_name(), 0usize..4, value)
            .prop_map(|(node, list, index, value)| Mutation::Replace { node, list, index, value }),
        2 => (node_id(), list_name(), 0usize..4, any::<bool>()).prop_map(|(node, list, index, unset)| {
            if unset {
                Mutation::Unset { node, list, index }
            } else {
                Mutation::RemoveAt { node, list, index }
            }
        }),
        1 => (node_id(), list_name(), 0usize..3)
            .prop_map(|(node, list, len)| Mutation::Truncate { node, list, len }),
        1 => (node_id(), list_name()).prop_map(|(node, list)| Mutation::Clear { node, list }),
    ]
}

/// Applies `script` leniently (failing mutations are skipped; they have no
/// side effects) and returns the synchronous event log plus node handles.
fn replay(script: &[Mutation], strategy: AttachStrategy) -> (Vec<ChangeEvent>, HashMap<NodeId, Handle>) {
    let mut pipeline = Pipeline::new();
    let (observer, mut events) =
        ChangeObserver::attach(&mut pipeline, &ObserverConfig::with_strategy(strategy)).unwrap();
    for mutation in script {
        let _ = pipeline.apply(mutation);
    }

    let handles = (0..pipeline.created() as u32)
        .map(NodeId)
        .filter_map(|id| observer.handle(id).map(|h| (id, h)))
        .collect();
    (events.drain_ready(), handles)
}

proptest! {
    #[test]
    fn strategies_produce_identical_logs(script in prop::collection::vec(mutation(), 0..40)) {
        let (collection, _) = replay(&script, AttachStrategy::Collection);
        let (factory, _) = replay(&script, AttachStrategy::Factory);
        prop_assert_eq!(collection, factory);
    }

    #[test]
    fn handles_are_unique_and_dense(script in prop::collection::vec(mutation(), 0..40)) {
        let (_, handles) = replay(&script, AttachStrategy::Collection);
        let distinct: HashSet<Handle> = handles.values().copied().collect();
        prop_assert_eq!(distinct.len(), handles.len());
        for handle in distinct {
            prop_assert!(handle.0 < handles.len() as u64);
        }
    }

    #[test]
    fn every_created_node_emits_one_create(script in prop::collection::vec(mutation(), 0..40)) {
        let created = {
            let mut pipeline = Pipeline::new();
            script.iter().filter(|m| matches!(m, Mutation::Create { .. }) && pipeline.apply(m).is_ok()).count()
        };
        let (log, _) = replay(&script, AttachStrategy::Factory);
        let creates = log.iter().filter(|e| matches!(e, ChangeEvent::Create { .. })).count();
        prop_assert_eq!(creates, created);
    }
}
