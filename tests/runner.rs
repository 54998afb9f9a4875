//! Superstep execution: linear chains, fan-out/fan-in, loops, budgets,
//! timeouts, and node failure propagation.

mod common;

use graphloom::node::NodePartial;
use graphloom::runtime::{
    AppRunner, RunnerError, SchedulerError, StepOutcome,
};
use graphloom::types::NodeKind;
use serde_json::json;

use common::fixtures::*;
use common::nodes::Failing;

#[tokio::test]
async fn linear_chain_runs_three_supersteps_in_order() {
    common::init_tracing();
    let app = linear_app();
    let mut runner = AppRunner::new(app);
    runner
        .create_session("chain".into(), NodePartial::new().with("input", json!("x")))
        .await
        .unwrap();

    let mut ran: Vec<Vec<NodeKind>> = Vec::new();
    loop {
        match runner.run_step("chain").await.unwrap() {
            StepOutcome::Completed(report) => {
                if report.ran_nodes.is_empty() && report.completed {
                    break;
                }
                ran.push(report.ran_nodes.clone());
                if report.completed {
                    break;
                }
            }
            StepOutcome::Interrupted(_) => panic!("no interrupts in this graph"),
        }
    }

    assert_eq!(
        ran,
        vec![
            vec![NodeKind::Custom("a".into())],
            vec![NodeKind::Custom("b".into())],
            vec![NodeKind::Custom("c".into())],
        ]
    );

    let session = runner.get_session("chain").unwrap();
    assert_eq!(session.step, 3);
    let snapshot = session.state.snapshot();
    assert_eq!(snapshot.get_str("output"), Some("x => A => B => C"));
    assert_eq!(snapshot.get("trace"), Some(&json!(["A", "B", "C"])));
}

#[tokio::test]
async fn invoke_returns_final_state() {
    let app = linear_app();
    let outcome = app
        .invoke(NodePartial::new().with("input", json!("x")))
        .await
        .unwrap();
    let state = outcome.into_state().expect("run completes");
    assert_eq!(state.get_str("output"), Some("x => A => B => C"));
}

#[tokio::test]
async fn bounded_loop_terminates_at_expected_step() {
    let app = counter_app(3);
    let mut runner = AppRunner::new(app);
    runner
        .create_session("loop".into(), NodePartial::new())
        .await
        .unwrap();

    let mut steps = 0;
    loop {
        match runner.run_step("loop").await.unwrap() {
            StepOutcome::Completed(report) => {
                if !report.ran_nodes.is_empty() {
                    steps += 1;
                }
                if report.completed {
                    break;
                }
            }
            StepOutcome::Interrupted(_) => panic!("no interrupts in this graph"),
        }
    }

    assert_eq!(steps, 3);
    let snapshot = runner.get_session("loop").unwrap().state.snapshot();
    assert_eq!(snapshot.get_i64("count"), Some(3));
}

#[tokio::test]
async fn unbounded_loop_is_caught_by_step_budget() {
    let app = unbounded_loop_app(10);
    let err = app.invoke(NodePartial::new()).await.unwrap_err();
    assert!(matches!(
        err,
        RunnerError::StepBudgetExceeded { budget: 10, .. }
    ));
}

#[tokio::test]
async fn invoke_options_override_step_budget() {
    // Config allows 10 steps, the per-invocation override allows 2.
    let app = unbounded_loop_app(10);
    let err = app
        .invoke_with(
            NodePartial::new(),
            graphloom::app::InvokeOptions {
                step_budget: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RunnerError::StepBudgetExceeded { budget: 2, .. }
    ));
}

#[tokio::test]
async fn fan_out_joins_exactly_once_after_all_branches_merge() {
    let app = fan_out_join_app();
    let outcome = app.invoke(NodePartial::new()).await.unwrap();
    let state = outcome.into_state().expect("run completes");

    // All three upstream partials were merged before the join observed
    // the state, and the join ran exactly once.
    assert_eq!(state.get_i64("join_observed"), Some(3));
    assert_eq!(state.get_i64("join_runs"), Some(1));

    // Merge order is node-name order, not completion order: fan_a has
    // the longest delay yet lands first.
    assert_eq!(
        state.get("trace"),
        Some(&json!(["fan_a", "fan_b", "fan_c"]))
    );
}

#[tokio::test]
async fn node_failure_carries_node_and_step() {
    let app = graphloom::graph::GraphBuilder::new()
        .add_node("broken", Failing)
        .add_edge(NodeKind::Start, "broken")
        .add_edge("broken", NodeKind::End)
        .compile()
        .unwrap();
    let err = app.invoke(NodePartial::new()).await.unwrap_err();
    match err {
        RunnerError::Scheduler(SchedulerError::NodeRun { node, step, .. }) => {
            assert_eq!(node, NodeKind::Custom("broken".into()));
            assert_eq!(step, 1);
        }
        other => panic!("expected NodeRun error, got: {other:?}"),
    }
}

#[tokio::test]
async fn superstep_timeout_fails_without_committing() {
    let app = slow_app(500, std::time::Duration::from_millis(50));
    let mut runner = AppRunner::new(app);
    runner
        .create_session("slow".into(), NodePartial::new())
        .await
        .unwrap();

    let err = runner.run_step("slow").await.unwrap_err();
    assert!(matches!(err, RunnerError::StepTimeout { step: 1 }));

    // The expired step committed nothing.
    let session = runner.get_session("slow").unwrap();
    assert_eq!(session.step, 0);
    assert_eq!(session.state.snapshot().get("trace"), Some(&json!([])));
}

#[tokio::test]
async fn duplicate_routing_targets_dedup_by_destination() {
    // Router returns the same destination twice alongside the static
    // edge; the node still runs once per superstep.
    use graphloom::channels::Channel;
    use graphloom::graph::{GraphBuilder, RouterFn};
    use std::sync::Arc;

    let router: RouterFn = Arc::new(|snapshot| {
        if snapshot.get_i64("count").unwrap_or(0) < 1 {
            vec!["next".to_string(), "next".to_string()]
        } else {
            vec![]
        }
    });
    let app = GraphBuilder::new()
        .add_channel(Channel::summing("count"))
        .add_node("first", common::nodes::Noop)
        .add_node("next", common::nodes::Increment)
        .add_edge(NodeKind::Start, "first")
        .add_conditional_edges("first", router, [("next", "next")])
        .add_edge("next", NodeKind::End)
        .compile()
        .unwrap();

    let state = app
        .invoke(NodePartial::new())
        .await
        .unwrap()
        .into_state()
        .unwrap();
    assert_eq!(state.get_i64("count"), Some(1));
}
