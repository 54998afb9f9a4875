//! Graph compilation: structural validation and conversion to an
//! executable [`App`].
//!
//! Everything that can be wrong with a graph's shape is caught here:
//! builder misuse, dangling edge endpoints, unmapped conditional targets,
//! unreachable nodes. Invocation never trips over a structural
//! defect. Cycles are not rejected: loops are a first-class
//! execution pattern, bounded by the graph author's routing conditions
//! (and optionally by a runtime step budget).

use std::collections::VecDeque;
use std::sync::Arc;

use miette::Diagnostic;
use rustc_hash::FxHashSet;
use thiserror::Error;

use super::builder::{GraphBuildError, GraphBuilder};
use crate::app::App;
use crate::channels::StateSchema;
use crate::runtime::Checkpointer;
use crate::types::NodeKind;

/// Structural defects detected at compile time, never at invoke time.
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum GraphCompileError {
    /// A builder call was invalid (duplicate or reserved name).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] GraphBuildError),

    /// No edge (static or conditional) leaves `Start`.
    #[error("graph has no entry edges from Start")]
    #[diagnostic(
        code(graphloom::graph::no_entry_edges),
        help("Add at least one edge out of NodeKind::Start.")
    )]
    NoEntryEdges,

    /// An edge originates from a node that was never registered.
    #[error("edge source {from} is not a registered node")]
    #[diagnostic(code(graphloom::graph::unknown_edge_source))]
    UnknownEdgeSource { from: NodeKind },

    /// An edge targets a node that was never registered.
    #[error("edge {from} -> {to} targets an unregistered node")]
    #[diagnostic(code(graphloom::graph::unknown_edge_target))]
    UnknownEdgeTarget { from: NodeKind, to: NodeKind },

    /// A conditional-edge label maps to a node that was never registered.
    #[error("conditional edge from {from}: label {label:?} maps to unregistered node {target}")]
    #[diagnostic(
        code(graphloom::graph::unknown_label_target),
        help("Every label in the map must resolve to a registered node or End.")
    )]
    UnknownLabelTarget {
        from: NodeKind,
        label: String,
        target: NodeKind,
    },

    /// A registered node cannot be reached from `Start`.
    #[error("node {node} is unreachable from Start")]
    #[diagnostic(code(graphloom::graph::unreachable_node))]
    Unreachable { node: NodeKind },
}

impl GraphBuilder {
    /// Compile into an executable [`App`] without persistence.
    pub fn compile(self) -> Result<App, GraphCompileError> {
        self.compile_inner(None)
    }

    /// Compile with a checkpointer, enabling durable supersteps and
    /// suspend/resume for threads invoked with a thread id.
    ///
    /// The checkpointer's lifecycle belongs to the caller: open it at
    /// startup, inject it here, close it at shutdown. Sharing one instance
    /// across graphs is fine; entries are keyed by thread id.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer>,
    ) -> Result<App, GraphCompileError> {
        self.compile_inner(Some(checkpointer))
    }

    fn compile_inner(
        self,
        checkpointer: Option<Arc<dyn Checkpointer>>,
    ) -> Result<App, GraphCompileError> {
        if let Some(violation) = self.violations.first() {
            return Err(GraphCompileError::Build(violation.clone()));
        }

        let registered = |kind: &NodeKind| self.nodes.contains_key(kind);

        for (from, tos) in &self.edges {
            match from {
                NodeKind::Start => {}
                NodeKind::End => {
                    return Err(GraphCompileError::UnknownEdgeSource { from: from.clone() });
                }
                NodeKind::Custom(_) if registered(from) => {}
                NodeKind::Custom(_) => {
                    return Err(GraphCompileError::UnknownEdgeSource { from: from.clone() });
                }
            }
            for to in tos {
                match to {
                    NodeKind::End => {}
                    NodeKind::Start => {
                        return Err(GraphCompileError::UnknownEdgeTarget {
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                    NodeKind::Custom(_) if registered(to) => {}
                    NodeKind::Custom(_) => {
                        return Err(GraphCompileError::UnknownEdgeTarget {
                            from: from.clone(),
                            to: to.clone(),
                        });
                    }
                }
            }
        }

        for edge in &self.conditional_edges {
            let from = edge.from();
            if !from.is_start() && !registered(from) {
                return Err(GraphCompileError::UnknownEdgeSource { from: from.clone() });
            }
            if let Some(targets) = edge.targets() {
                for (label, target) in targets {
                    if !target.is_end() && !registered(target) {
                        return Err(GraphCompileError::UnknownLabelTarget {
                            from: from.clone(),
                            label: label.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        let has_static_entry = self
            .edges
            .get(&NodeKind::Start)
            .map(|tos| !tos.is_empty())
            .unwrap_or(false);
        let has_conditional_entry = self
            .conditional_edges
            .iter()
            .any(|edge| edge.from().is_start());
        if !has_static_entry && !has_conditional_entry {
            return Err(GraphCompileError::NoEntryEdges);
        }

        self.check_reachability()?;

        let GraphBuilder {
            channels,
            nodes,
            edges,
            conditional_edges,
            runtime_config,
            ..
        } = self;

        Ok(App::from_parts(
            nodes,
            edges,
            conditional_edges,
            StateSchema::from_channels(channels),
            runtime_config,
            checkpointer,
        ))
    }

    /// Breadth-first walk from `Start` over static edges and conditional
    /// targets. A conditional edge without a label map is opaque (its
    /// router could name any node), so it marks every registered node
    /// reachable from its source.
    fn check_reachability(&self) -> Result<(), GraphCompileError> {
        let mut seen: FxHashSet<NodeKind> = FxHashSet::default();
        let mut queue: VecDeque<NodeKind> = VecDeque::new();
        queue.push_back(NodeKind::Start);
        seen.insert(NodeKind::Start);

        while let Some(current) = queue.pop_front() {
            let mut successors: Vec<NodeKind> = Vec::new();
            if let Some(tos) = self.edges.get(&current) {
                successors.extend(tos.iter().cloned());
            }
            for edge in self
                .conditional_edges
                .iter()
                .filter(|edge| *edge.from() == current)
            {
                match edge.targets() {
                    Some(targets) => successors.extend(targets.values().cloned()),
                    None => successors.extend(self.nodes.keys().cloned()),
                }
            }
            for next in successors {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }

        let mut unreachable: Vec<&NodeKind> =
            self.nodes.keys().filter(|k| !seen.contains(k)).collect();
        unreachable.sort_by_key(|k| k.encode());
        match unreachable.first() {
            Some(node) => Err(GraphCompileError::Unreachable {
                node: (*node).clone(),
            }),
            None => Ok(()),
        }
    }
}
