//! Fluent construction of workflow graphs.
//!
//! [`GraphBuilder`] accumulates channels, nodes, and edges, then
//! [`compile`](GraphBuilder::compile)s into an executable
//! [`App`](crate::app::App). The builder itself stays infallible for
//! fluency; misuse (duplicate names, reserved endpoints) is recorded and
//! surfaces as the first error at compile time, together with the
//! structural validation.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use super::edges::{ConditionalEdge, RouterFn};
use crate::channels::Channel;
use crate::node::Node;
use crate::runtime::RuntimeConfig;
use crate::types::NodeKind;

/// Builder misuse detected while assembling a graph.
///
/// Recorded at the offending call and raised by `compile`, so
/// construction keeps its fluent shape while still failing before any
/// invocation can observe a malformed graph.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum GraphBuildError {
    /// Two nodes were registered under the same name.
    #[error("duplicate node: {name}")]
    #[diagnostic(code(graphloom::graph::duplicate_node))]
    DuplicateNode { name: String },

    /// Two channels were declared under the same name.
    #[error("duplicate channel: {name}")]
    #[diagnostic(code(graphloom::graph::duplicate_channel))]
    DuplicateChannel { name: String },

    /// `Start`/`End` are virtual and cannot carry an implementation.
    #[error("cannot register a node for virtual endpoint {kind}")]
    #[diagnostic(
        code(graphloom::graph::reserved_node),
        help("Start and End exist only for edge topology; register work under a Custom name.")
    )]
    ReservedNode { kind: NodeKind },
}

/// Builder for workflow graphs.
///
/// Declare the state shape with [`add_channel`](Self::add_channel),
/// register nodes, wire edges (static and conditional), then `compile`.
/// `Start` and `End` are virtual endpoints: valid in edges, never
/// registered.
pub struct GraphBuilder {
    pub(super) channels: Vec<Channel>,
    pub(super) nodes: FxHashMap<NodeKind, Arc<dyn Node>>,
    pub(super) edges: FxHashMap<NodeKind, Vec<NodeKind>>,
    pub(super) conditional_edges: Vec<ConditionalEdge>,
    pub(super) violations: Vec<GraphBuildError>,
    pub(super) runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            conditional_edges: Vec::new(),
            violations: Vec::new(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Declare one state channel. Channel names must be unique.
    #[must_use]
    pub fn add_channel(mut self, channel: Channel) -> Self {
        if self.channels.iter().any(|c| c.name() == channel.name()) {
            self.violations.push(GraphBuildError::DuplicateChannel {
                name: channel.name().to_string(),
            });
            return self;
        }
        self.channels.push(channel);
        self
    }

    /// Register an executable node under a unique name.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeKind>, node: impl Node + 'static) -> Self {
        let id = id.into();
        match &id {
            NodeKind::Start | NodeKind::End => {
                self.violations
                    .push(GraphBuildError::ReservedNode { kind: id });
            }
            NodeKind::Custom(name) => {
                if self.nodes.contains_key(&id) {
                    self.violations
                        .push(GraphBuildError::DuplicateNode { name: name.clone() });
                } else {
                    self.nodes.insert(id, Arc::new(node));
                }
            }
        }
        self
    }

    /// Add a static edge. Multiple edges from one node fan execution out;
    /// multiple edges into one node fan it in (the destination still runs
    /// once per superstep).
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeKind>, to: impl Into<NodeKind>) -> Self {
        self.edges.entry(from.into()).or_default().push(to.into());
        self
    }

    /// Add a conditional edge whose router output names destinations
    /// directly (`"End"` exits the graph).
    #[must_use]
    pub fn add_conditional_edge(mut self, from: impl Into<NodeKind>, router: RouterFn) -> Self {
        self.conditional_edges.push(ConditionalEdge::new(from, router));
        self
    }

    /// Add a conditional edge with a label map: the router's labels are
    /// resolved through `targets`, each of which must name a registered
    /// node or `End` (validated at compile time).
    #[must_use]
    pub fn add_conditional_edges<L, T>(
        mut self,
        from: impl Into<NodeKind>,
        router: RouterFn,
        targets: impl IntoIterator<Item = (L, T)>,
    ) -> Self
    where
        L: Into<String>,
        T: Into<NodeKind>,
    {
        self.conditional_edges.push(ConditionalEdge::with_targets(
            from,
            router,
            targets
                .into_iter()
                .map(|(label, to)| (label.into(), to.into())),
        ));
        self
    }

    /// Override the runtime configuration for the compiled graph.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }
}
