use std::sync::Arc;
use std::time::Duration;

use graphloom::app::App;
use graphloom::channels::Channel;
use graphloom::graph::{GraphBuilder, RouterFn};
use graphloom::runtime::{Checkpointer, RuntimeConfig};
use graphloom::types::NodeKind;

use super::nodes::*;

/// Linear chain: Start -> a -> b -> c -> End over input/output/trace.
pub fn linear_app() -> App {
    GraphBuilder::new()
        .add_channel(Channel::new("input"))
        .add_channel(Channel::new("output"))
        .add_channel(Channel::appending("trace"))
        .add_node("a", Transform { tag: "A" })
        .add_node("b", Transform { tag: "B" })
        .add_node("c", Transform { tag: "C" })
        .add_edge(NodeKind::Start, "a")
        .add_edge("a", "b")
        .add_edge("b", "c")
        .add_edge("c", NodeKind::End)
        .compile()
        .expect("linear graph compiles")
}

/// Self-loop incrementing `count`, routed through a label map:
/// `again -> loop` while count < stop_at, else `done -> End`.
pub fn counter_app(stop_at: i64) -> App {
    let router: RouterFn = Arc::new(move |snapshot| {
        if snapshot.get_i64("count").unwrap_or(0) < stop_at {
            vec!["again".to_string()]
        } else {
            vec!["done".to_string()]
        }
    });
    GraphBuilder::new()
        .add_channel(Channel::summing("count"))
        .add_node("loop", Increment)
        .add_edge(NodeKind::Start, "loop")
        .add_conditional_edges("loop", router, [("again", "loop"), ("done", "End")])
        .compile()
        .expect("counter graph compiles")
}

/// Self-loop that never terminates on its own; exercised with a step
/// budget.
pub fn unbounded_loop_app(step_budget: u64) -> App {
    let router: RouterFn = Arc::new(|_| vec!["loop".to_string()]);
    GraphBuilder::new()
        .add_channel(Channel::summing("count"))
        .add_node("loop", Increment)
        .add_edge(NodeKind::Start, "loop")
        .add_conditional_edge("loop", router)
        .with_runtime_config(RuntimeConfig::new().with_step_budget(step_budget))
        .compile()
        .expect("unbounded loop compiles")
}

/// Three-way fan-out from Start joining into one probe node.
pub fn fan_out_join_app() -> App {
    GraphBuilder::new()
        .add_channel(Channel::appending("trace"))
        .add_channel(Channel::new("join_observed"))
        .add_channel(Channel::summing("join_runs"))
        .add_node(
            "fan_a",
            BranchWriter {
                tag: "fan_a",
                delay_ms: 30,
            },
        )
        .add_node(
            "fan_b",
            BranchWriter {
                tag: "fan_b",
                delay_ms: 10,
            },
        )
        .add_node(
            "fan_c",
            BranchWriter {
                tag: "fan_c",
                delay_ms: 0,
            },
        )
        .add_node("join", JoinProbe)
        .add_edge(NodeKind::Start, "fan_a")
        .add_edge(NodeKind::Start, "fan_b")
        .add_edge(NodeKind::Start, "fan_c")
        .add_edge("fan_a", "join")
        .add_edge("fan_b", "join")
        .add_edge("fan_c", "join")
        .add_edge("join", NodeKind::End)
        .compile()
        .expect("fan-out graph compiles")
}

fn gate_channels(builder: GraphBuilder) -> GraphBuilder {
    builder
        .add_channel(Channel::new("input"))
        .add_channel(Channel::new("approval"))
        .add_channel(Channel::appending("trace"))
}

/// Single gate node that suspends for approval; durable via the given
/// checkpointer.
pub fn gate_app(checkpointer: Arc<dyn Checkpointer>) -> App {
    gate_channels(GraphBuilder::new())
        .add_node("gate", Gate)
        .add_edge(NodeKind::Start, "gate")
        .add_edge("gate", NodeKind::End)
        .compile_with_checkpointer(checkpointer)
        .expect("gate graph compiles")
}

/// Baseline for replay equivalence: same shape as [`gate_app`] but the
/// approval is available synchronously.
pub fn instant_gate_app(decision: &'static str) -> App {
    gate_channels(GraphBuilder::new())
        .add_node("gate", InstantGate { decision })
        .add_edge(NodeKind::Start, "gate")
        .add_edge("gate", NodeKind::End)
        .compile()
        .expect("instant gate compiles")
}

/// Gate with two suspension call sites.
pub fn double_gate_app(checkpointer: Arc<dyn Checkpointer>) -> App {
    GraphBuilder::new()
        .add_channel(Channel::new("approval"))
        .add_node("gate", DoubleGate)
        .add_edge(NodeKind::Start, "gate")
        .add_edge("gate", NodeKind::End)
        .compile_with_checkpointer(checkpointer)
        .expect("double gate compiles")
}

/// One slow node plus a superstep timeout.
pub fn slow_app(node_millis: u64, timeout: Duration) -> App {
    GraphBuilder::new()
        .add_channel(Channel::appending("trace"))
        .add_node("slow", Slow { millis: node_millis })
        .add_edge(NodeKind::Start, "slow")
        .add_edge("slow", NodeKind::End)
        .with_runtime_config(RuntimeConfig::new().with_step_timeout(timeout))
        .compile()
        .expect("slow graph compiles")
}

/// One chattering node for message/custom stream modes.
pub fn chatter_app() -> App {
    GraphBuilder::new()
        .add_channel(Channel::appending("trace"))
        .add_node("chatter", Chatter)
        .add_edge(NodeKind::Start, "chatter")
        .add_edge("chatter", NodeKind::End)
        .compile()
        .expect("chatter graph compiles")
}
