//! # Graphloom: superstep-driven workflow graphs
//!
//! Graphloom executes directed, possibly cyclic, graphs of computation
//! nodes over a shared, channel-typed state. Execution proceeds in
//! *supersteps*: the active node set runs concurrently against a frozen
//! snapshot, a barrier joins the results, a deterministic merge folds
//! every partial update into the state through per-channel reducers, and
//! routing computes the next active set. Checkpoints at each boundary
//! make runs durable; a node can suspend mid-execution for external
//! (human) input and the thread resumes exactly where it left off, even
//! across process restarts.
//!
//! ## Core concepts
//!
//! - **Channels** ([`channels`]): named state slots, each with a default
//!   value and a merge rule ([`reducers`])
//! - **Nodes** ([`node`]): opaque async units reading a snapshot and
//!   returning a partial update
//! - **Graph** ([`graph`]): builder + compile-time validation of nodes,
//!   edges, and conditional routing
//! - **App** ([`app`]): the compiled graph with `invoke`, `stream`, `resume`
//! - **Runtime** ([`runtime`]): the superstep scheduler, session runner,
//!   and checkpoint backends
//! - **Streaming** ([`stream`]): values / updates / messages / custom
//!   observation modes
//!
//! ## Example
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use graphloom::app::InvokeOptions;
//! use graphloom::channels::Channel;
//! use graphloom::graph::GraphBuilder;
//! use graphloom::node::{Node, NodeContext, NodeError, NodePartial};
//! use graphloom::runtime::InMemoryCheckpointer;
//! use graphloom::state::StateSnapshot;
//! use graphloom::types::NodeKind;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Node for Greet {
//!     async fn run(
//!         &self,
//!         snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         let name = snapshot.get_str("input").unwrap_or("world");
//!         Ok(NodePartial::new()
//!             .with("output", json!(format!("hello, {name}")))
//!             .with("history", json!(["greeted"])))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = GraphBuilder::new()
//!     .add_channel(Channel::new("input"))
//!     .add_channel(Channel::new("output"))
//!     .add_channel(Channel::appending("history"))
//!     .add_node("greet", Greet)
//!     .add_edge(NodeKind::Start, "greet")
//!     .add_edge("greet", NodeKind::End)
//!     .compile_with_checkpointer(Arc::new(InMemoryCheckpointer::new()))?;
//!
//! let outcome = app
//!     .invoke_with(
//!         NodePartial::new().with("input", json!("graphs")),
//!         InvokeOptions {
//!             thread_id: Some("session-1".into()),
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! let final_state = outcome.into_state().expect("no interrupts in this graph");
//! assert_eq!(final_state.get_str("output"), Some("hello, graphs"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Determinism
//!
//! Nodes in one superstep run concurrently with no ordering guarantee,
//! but the barrier merge applies their partials in node-name order and
//! walks channels in sorted name order, so two nodes writing the same
//! channel produce the same merged value on every run. Routing,
//! interrupt selection, and error reporting use the same tie-break, so
//! an entire run is reproducible modulo the nodes' own behavior.
//!
//! ## Cycles
//!
//! Loops are legal and carry no implicit iteration cap; termination is
//! the graph author's routing condition. For safety,
//! [`RuntimeConfig`](runtime::RuntimeConfig) offers an optional step
//! budget that fails the run without corrupting the last committed
//! checkpoint.

pub mod app;
pub mod channels;
pub mod graph;
pub mod node;
pub mod reducers;
pub mod runtime;
pub mod state;
pub mod stream;
pub mod telemetry;
pub mod types;
pub mod utils;
