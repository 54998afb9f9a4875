//! Builder and compile-time validation: structural defects must fail at
//! compile, never at invoke.

mod common;

use std::sync::Arc;

use graphloom::channels::Channel;
use graphloom::graph::{GraphBuildError, GraphBuilder, GraphCompileError, RouterFn};
use graphloom::types::NodeKind;

use common::nodes::{Increment, Noop, Transform};

#[test]
fn duplicate_node_fails_compile() {
    let err = GraphBuilder::new()
        .add_node("worker", Noop)
        .add_node("worker", Noop)
        .add_edge(NodeKind::Start, "worker")
        .add_edge("worker", NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::Build(GraphBuildError::DuplicateNode { name }) if name == "worker"
    ));
}

#[test]
fn duplicate_channel_fails_compile() {
    let err = GraphBuilder::new()
        .add_channel(Channel::new("state"))
        .add_channel(Channel::new("state"))
        .add_node("worker", Noop)
        .add_edge(NodeKind::Start, "worker")
        .add_edge("worker", NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::Build(GraphBuildError::DuplicateChannel { name }) if name == "state"
    ));
}

#[test]
fn registering_virtual_endpoint_fails_compile() {
    let err = GraphBuilder::new()
        .add_node(NodeKind::Start, Noop)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::Build(GraphBuildError::ReservedNode { kind: NodeKind::Start })
    ));
}

#[test]
fn edge_to_unregistered_node_fails_compile() {
    let err = GraphBuilder::new()
        .add_node("worker", Noop)
        .add_edge(NodeKind::Start, "worker")
        .add_edge("worker", "ghost")
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::UnknownEdgeTarget { to, .. } if to == NodeKind::Custom("ghost".into())
    ));
}

#[test]
fn edge_from_unregistered_node_fails_compile() {
    let err = GraphBuilder::new()
        .add_node("worker", Noop)
        .add_edge(NodeKind::Start, "worker")
        .add_edge("ghost", NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::UnknownEdgeSource { from } if from == NodeKind::Custom("ghost".into())
    ));
}

#[test]
fn conditional_label_to_unregistered_node_fails_compile() {
    let router: RouterFn = Arc::new(|_| vec!["go".to_string()]);
    let err = GraphBuilder::new()
        .add_node("worker", Noop)
        .add_edge(NodeKind::Start, "worker")
        .add_conditional_edges("worker", router, [("go", "ghost")])
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::UnknownLabelTarget { label, target, .. }
            if label == "go" && target == NodeKind::Custom("ghost".into())
    ));
}

#[test]
fn missing_entry_edges_fails_compile() {
    let err = GraphBuilder::new()
        .add_node("worker", Noop)
        .compile()
        .unwrap_err();
    assert!(matches!(err, GraphCompileError::NoEntryEdges));
}

#[test]
fn unreachable_node_fails_compile() {
    let err = GraphBuilder::new()
        .add_node("reached", Noop)
        .add_node("island", Noop)
        .add_edge(NodeKind::Start, "reached")
        .add_edge("reached", NodeKind::End)
        .add_edge("island", NodeKind::End)
        .compile()
        .unwrap_err();
    assert!(matches!(
        err,
        GraphCompileError::Unreachable { node } if node == NodeKind::Custom("island".into())
    ));
}

#[test]
fn cycles_are_legal() {
    let router: RouterFn = Arc::new(|_| vec!["End".to_string()]);
    let app = GraphBuilder::new()
        .add_channel(Channel::summing("count"))
        .add_node("loop", Increment)
        .add_edge(NodeKind::Start, "loop")
        .add_edge("loop", "loop")
        .add_conditional_edge("loop", router)
        .compile();
    assert!(app.is_ok());
}

#[test]
fn nodes_reached_only_through_labels_are_reachable() {
    let router: RouterFn = Arc::new(|_| vec!["next".to_string()]);
    let app = GraphBuilder::new()
        .add_channel(Channel::new("input"))
        .add_channel(Channel::new("output"))
        .add_channel(Channel::appending("trace"))
        .add_node("first", Transform { tag: "A" })
        .add_node("second", Transform { tag: "B" })
        .add_edge(NodeKind::Start, "first")
        .add_conditional_edges("first", router, [("next", "second")])
        .add_edge("second", NodeKind::End)
        .compile();
    assert!(app.is_ok());
}
