//! Workflow graph definition and compilation.
//!
//! The entry point is [`GraphBuilder`]: declare the state channels,
//! register nodes, wire static and conditional edges, and compile into an
//! executable [`App`](crate::app::App). Compilation validates the whole
//! structure (endpoints, conditional label maps, reachability), so
//! malformed graphs fail before the first invocation, never during one.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use graphloom::channels::Channel;
//! use graphloom::graph::GraphBuilder;
//! use graphloom::node::{Node, NodeContext, NodeError, NodePartial};
//! use graphloom::state::StateSnapshot;
//! use graphloom::types::NodeKind;
//! use serde_json::json;
//!
//! struct Shout;
//!
//! #[async_trait]
//! impl Node for Shout {
//!     async fn run(
//!         &self,
//!         snapshot: StateSnapshot,
//!         _ctx: NodeContext,
//!     ) -> Result<NodePartial, NodeError> {
//!         let input = snapshot.get_str("input").unwrap_or_default();
//!         Ok(NodePartial::new().with("output", json!(input.to_uppercase())))
//!     }
//! }
//!
//! # fn main() -> Result<(), graphloom::graph::GraphCompileError> {
//! let app = GraphBuilder::new()
//!     .add_channel(Channel::new("input"))
//!     .add_channel(Channel::new("output"))
//!     .add_node("shout", Shout)
//!     .add_edge(NodeKind::Start, "shout")
//!     .add_edge("shout", NodeKind::End)
//!     .compile()?;
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

mod builder;
mod compile;
mod edges;

pub use builder::{GraphBuildError, GraphBuilder};
pub use compile::GraphCompileError;
pub use edges::{ConditionalEdge, RouterFn};
