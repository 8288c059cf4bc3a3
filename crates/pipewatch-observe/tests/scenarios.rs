//! End-to-end observation scenarios, run under both attachment strategies.

use pipewatch_core::{CoreError, NodeId, Pipeline};
use pipewatch_observe::{
    AttachStrategy, ChangeEvent, ChangeObserver, EventStream, Handle, ObserverConfig,
};
use serde_json::{json, Value};

const STRATEGIES: [AttachStrategy; 2] = [AttachStrategy::Collection, AttachStrategy::Factory];

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn attach(strategy: AttachStrategy) -> (Pipeline, ChangeObserver, EventStream) {
    init_tracing();
    let mut pipeline = Pipeline::new();
    let (observer, events) =
        ChangeObserver::attach(&mut pipeline, &ObserverConfig::with_strategy(strategy))
            .expect("attach to a fresh pipeline");
    (pipeline, observer, events)
}

/// Runs `build` against an observed pipeline, finishes, and returns the log
/// as wire JSON.
async fn observe<F>(strategy: AttachStrategy, build: F) -> Value
where
    F: FnOnce(&mut Pipeline) -> Result<(), CoreError>,
{
    let (mut pipeline, observer, events) = attach(strategy);
    build(&mut pipeline).expect("mutations succeed");
    observer.finish().await;
    serde_json::to_value(events.collect().await).unwrap()
}

#[tokio::test]
async fn observes_addition_of_nodes_and_inputs() {
    for strategy in STRATEGIES {
        let log = observe(strategy, |p| {
            let first = p.create("first-input", &[])?;
            let node = p.create("node", &[first.id()])?;
            let second = p.create("second-input", &[])?;
            node.add_input(second.id());
            Ok(())
        })
        .await;

        assert_eq!(
            log,
            json!([
                { "action": "create", "node": 0, "opcode": "first-input" },
                { "action": "create", "node": 1, "opcode": "node" },
                { "action": "addInput", "node": 1, "other": 0 },
                { "action": "create", "node": 2, "opcode": "second-input" },
                { "action": "addInput", "node": 1, "other": 2 }
            ]),
            "strategy {strategy}"
        );
    }
}

#[tokio::test]
async fn observes_removal_of_inputs_highest_first() {
    for strategy in STRATEGIES {
        let log = observe(strategy, |p| {
            let first = p.create("first-input", &[])?;
            let second = p.create("second-input", &[])?;
            let node = p.create("node", &[first.id(), second.id()])?;
            node.clear_inputs();
            Ok(())
        })
        .await;

        assert_eq!(
            log,
            json!([
                { "action": "create", "node": 0, "opcode": "first-input" },
                { "action": "create", "node": 1, "opcode": "second-input" },
                { "action": "create", "node": 2, "opcode": "node" },
                { "action": "addInput", "node": 2, "other": 0 },
                { "action": "addInput", "node": 2, "other": 1 },
                { "action": "removeInput", "node": 2, "old": 1, "index": 1 },
                { "action": "removeInput", "node": 2, "old": 0, "index": 0 }
            ]),
            "strategy {strategy}"
        );
    }
}

#[tokio::test]
async fn observes_replacement_of_inputs() {
    for strategy in STRATEGIES {
        let log = observe(strategy, |p| {
            let first = p.create("first-input", &[])?;
            let second = p.create("second-input", &[])?;
            let node = p.create("node", &[first.id(), second.id()])?;
            let replacement = p.create("replacement", &[])?;
            node.replace_input(0, replacement.id())?;
            Ok(())
        })
        .await;

        assert_eq!(
            log,
            json!([
                { "action": "create", "node": 0, "opcode": "first-input" },
                { "action": "create", "node": 1, "opcode": "second-input" },
                { "action": "create", "node": 2, "opcode": "node" },
                { "action": "addInput", "node": 2, "other": 0 },
                { "action": "addInput", "node": 2, "other": 1 },
                { "action": "create", "node": 3, "opcode": "replacement" },
                { "action": "replaceInput", "node": 2, "index": 0, "from": 0, "to": 3 }
            ]),
            "strategy {strategy}"
        );
    }
}

#[tokio::test]
async fn observes_change_of_opcode() {
    for strategy in STRATEGIES {
        let log = observe(strategy, |p| {
            let node = p.create("node", &[])?;
            node.set_opcode("new-node");
            Ok(())
        })
        .await;

        assert_eq!(
            log,
            json!([
                { "action": "create", "node": 0, "opcode": "node" },
                { "action": "changeOpcode", "node": 0, "from": "node", "to": "new-node" }
            ]),
            "strategy {strategy}"
        );
    }
}

#[tokio::test]
async fn observes_change_of_index() {
    for strategy in STRATEGIES {
        let log = observe(strategy, |p| {
            let node = p.create("node", &[])?;
            p.create("other-node", &[])?;
            p.remove(node.id())
        })
        .await;

        assert_eq!(
            log,
            json!([
                { "action": "create", "node": 0, "opcode": "node" },
                { "action": "create", "node": 1, "opcode": "other-node" },
                { "action": "changeIndex", "node": 0, "from": 0, "to": -1 },
                { "action": "changeIndex", "node": 1, "from": 1, "to": 0 }
            ]),
            "strategy {strategy}"
        );
    }
}

#[tokio::test]
async fn empty_run_finishes_cleanly() {
    for strategy in STRATEGIES {
        let (_pipeline, observer, events) = attach(strategy);
        observer.finish().await;
        assert!(events.collect().await.is_empty());
    }
}

#[tokio::test]
async fn repeated_writes_are_never_coalesced() {
    let (mut p, observer, events) = attach(AttachStrategy::Collection);
    let a = p.create("a", &[]).unwrap();
    let b = p.create("b", &[a.id()]).unwrap();
    b.replace_input(0, a.id()).unwrap();
    b.replace_input(0, a.id()).unwrap();
    b.set_index(1);
    observer.finish().await;

    let log = events.collect().await;
    let handle_a = Handle(0);
    let handle_b = Handle(1);
    assert_eq!(
        &log[3..],
        &[
            ChangeEvent::ReplaceInput { node: handle_b, index: 0, from: Some(handle_a), to: Some(handle_a) },
            ChangeEvent::ReplaceInput { node: handle_b, index: 0, from: Some(handle_a), to: Some(handle_a) },
            ChangeEvent::ChangeIndex { node: handle_b, from: 1, to: 1 },
        ]
    );
}

#[tokio::test]
async fn handles_follow_identity_not_index() {
    let (mut p, observer, events) = attach(AttachStrategy::Factory);
    let a = p.create("a", &[]).unwrap();
    let b = p.create("b", &[]).unwrap();
    p.remove(a.id()).unwrap();
    // `b` now sits at index 0, which used to be `a`'s position.
    b.set_opcode("b2");
    let c = p.create("c", &[b.id()]).unwrap();
    observer.finish().await;

    let log = events.collect().await;
    assert_eq!(observer.handle(a.id()), Some(Handle(0)));
    assert_eq!(observer.handle(b.id()), Some(Handle(1)));
    assert_eq!(observer.handle(c.id()), Some(Handle(2)));
    assert!(log.contains(&ChangeEvent::ChangeOpcode {
        node: Handle(1),
        from: "b".into(),
        to: "b2".into(),
    }));
    assert!(log.contains(&ChangeEvent::Create { node: 1, opcode: "c".into() }));
    assert!(log.contains(&ChangeEvent::AddInput { node: Handle(2), other: Some(Handle(1)) }));
}

#[tokio::test]
async fn referenced_nodes_get_handles_lazily() {
    let mut p = Pipeline::new();
    let outside = p.create("outside", &[]).unwrap();
    let (observer, events) = ChangeObserver::attach(&mut p, &ObserverConfig::default()).unwrap();

    assert_eq!(observer.handle(outside.id()), None);
    let inside = p.create("inside", &[]).unwrap();
    inside.add_control(outside.id());
    inside.remove_control(0).unwrap();
    observer.finish().await;

    assert_eq!(
        events.collect().await,
        vec![
            ChangeEvent::Create { node: 1, opcode: "inside".into() },
            ChangeEvent::AddControl { node: Handle(0), other: Some(Handle(1)) },
            ChangeEvent::RemoveControl { node: Handle(0), old: Some(Handle(1)), index: 0 },
        ]
    );
    assert_eq!(observer.handle(outside.id()), Some(Handle(1)));
    assert_eq!(observer.handle(NodeId(99)), None);
}

#[tokio::test]
async fn literal_edits_carry_raw_values() {
    let (mut p, observer, events) = attach(AttachStrategy::Collection);
    let n = p.create_with("const", &[], vec![json!(0)]).unwrap();
    n.add_literal(json!("str"));
    n.replace_literal(0, json!(false)).unwrap();
    n.edit_literals(|seq| seq.unset(1)).unwrap();
    n.remove_literal(0).unwrap();
    observer.finish().await;

    assert_eq!(
        serde_json::to_value(events.collect().await).unwrap(),
        json!([
            { "action": "create", "node": 0, "opcode": "const" },
            { "action": "addLiteral", "node": 0, "other": 0 },
            { "action": "addLiteral", "node": 0, "other": "str" },
            { "action": "replaceLiteral", "node": 0, "index": 0, "from": 0, "to": false },
            { "action": "replaceLiteral", "node": 0, "index": 1, "from": "str", "to": null },
            { "action": "replaceLiteral", "node": 0, "index": 0, "from": false, "to": null },
            { "action": "removeLiteral", "node": 0, "old": null, "index": 1 }
        ])
    );
}

#[tokio::test]
async fn insert_is_reported_as_shifts_then_add() {
    let (mut p, observer, events) = attach(AttachStrategy::Collection);
    let a = p.create("a", &[]).unwrap();
    let b = p.create("b", &[]).unwrap();
    let n = p.create("n", &[a.id()]).unwrap();
    n.edit_refs(pipewatch_core::RefList::Inputs, |seq| seq.insert(0, b.id())).unwrap();
    observer.finish().await;

    let log = events.collect().await;
    assert_eq!(
        &log[4..],
        &[
            ChangeEvent::ReplaceInput { node: Handle(2), index: 0, from: Some(Handle(0)), to: Some(Handle(1)) },
            ChangeEvent::AddInput { node: Handle(2), other: Some(Handle(0)) },
        ]
    );
    assert_eq!(n.inputs(), vec![b.id(), a.id()]);
}

#[tokio::test]
async fn mutations_after_finish_are_not_emitted() {
    let (mut p, observer, mut events) = attach(AttachStrategy::Factory);
    let n = p.create("n", &[]).unwrap();
    observer.finish().await;
    n.set_opcode("after");

    assert_eq!(events.next().await, Some(ChangeEvent::Create { node: 0, opcode: "n".into() }));
    assert_eq!(events.next().await, None);
    assert_eq!(n.opcode(), "after");
}
