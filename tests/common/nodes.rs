use async_trait::async_trait;
use graphloom::node::{Node, NodeContext, NodeError, NodePartial};
use graphloom::state::StateSnapshot;
use serde_json::json;

/// Chains a tag onto `output` and records itself in `trace`.
pub struct Transform {
    pub tag: &'static str,
}

#[async_trait]
impl Node for Transform {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let current = snapshot
            .get_str("output")
            .or_else(|| snapshot.get_str("input"))
            .unwrap_or("");
        Ok(NodePartial::new()
            .with("output", json!(format!("{current} => {}", self.tag)))
            .with("trace", json!([self.tag])))
    }
}

/// Adds one to the summing `count` channel.
pub struct Increment;

#[async_trait]
impl Node for Increment {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with("count", json!(1)))
    }
}

/// Writes its tag to `trace` after an artificial delay, so completion
/// order differs from name order in fan-out tests.
pub struct BranchWriter {
    pub tag: &'static str,
    pub delay_ms: u64,
}

#[async_trait]
impl Node for BranchWriter {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
        Ok(NodePartial::new().with("trace", json!([self.tag])))
    }
}

/// Records how many trace entries were visible when it ran, and how many
/// times it ran.
pub struct JoinProbe;

#[async_trait]
impl Node for JoinProbe {
    async fn run(
        &self,
        snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let observed = snapshot.get_array("trace").map(Vec::len).unwrap_or(0);
        Ok(NodePartial::new()
            .with("join_observed", json!(observed))
            .with("join_runs", json!(1)))
    }
}

/// Suspends once for an approval value, then records it.
pub struct Gate;

#[async_trait]
impl Node for Gate {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let decision = ctx.interrupt(json!({"question": "proceed?"}))?;
        Ok(NodePartial::new()
            .with("approval", decision)
            .with("trace", json!(["gate"])))
    }
}

/// Like [`Gate`] but with the approval available synchronously; the
/// replay-equivalence baseline.
pub struct InstantGate {
    pub decision: &'static str,
}

#[async_trait]
impl Node for InstantGate {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new()
            .with("approval", json!(self.decision))
            .with("trace", json!(["gate"])))
    }
}

/// Suspends twice; records both resume values.
pub struct DoubleGate;

#[async_trait]
impl Node for DoubleGate {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        let first = ctx.interrupt(json!({"stage": 1}))?;
        let second = ctx.interrupt(json!({"stage": 2}))?;
        Ok(NodePartial::new().with("approval", json!([first, second])))
    }
}

/// Always fails with a missing-input error.
pub struct Failing;

#[async_trait]
impl Node for Failing {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Err(NodeError::MissingInput { what: "test_key" })
    }
}

/// Sleeps long enough to trip superstep timeouts.
pub struct Slow {
    pub millis: u64,
}

#[async_trait]
impl Node for Slow {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        tokio::time::sleep(std::time::Duration::from_millis(self.millis)).await;
        Ok(NodePartial::new().with("trace", json!(["slow"])))
    }
}

/// Emits message fragments and one custom payload while running.
pub struct Chatter;

#[async_trait]
impl Node for Chatter {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        for i in 0..3 {
            ctx.emit_message(format!("tok{i}"));
        }
        ctx.emit_custom(json!({"progress": 1.0}));
        Ok(NodePartial::new().with("trace", json!(["chatter"])))
    }
}

/// Writes a value into a channel the graph never declared.
pub struct RogueWriter;

#[async_trait]
impl Node for RogueWriter {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::new().with("undeclared", json!(1)))
    }
}

/// Does nothing.
pub struct Noop;

#[async_trait]
impl Node for Noop {
    async fn run(
        &self,
        _snapshot: StateSnapshot,
        _ctx: NodeContext,
    ) -> Result<NodePartial, NodeError> {
        Ok(NodePartial::default())
    }
}
