//! Edge types and routing functions for dynamic graph flow.
//!
//! Static edges live as an adjacency map on the builder; this module
//! holds the conditional form: an opaque router evaluated against the
//! post-merge state, optionally resolved through a label map.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

use crate::state::StateSnapshot;
use crate::types::NodeKind;

/// Routing function for conditional edges.
///
/// Evaluated against the state snapshot taken after the barrier merge of
/// the step in which the source node ran. Returns one or more labels;
/// returning several fans execution out. With a label map the labels are
/// looked up; without one they are taken directly as node names (`"End"`
/// routes to the exit).
pub type RouterFn = Arc<dyn Fn(&StateSnapshot) -> Vec<String> + Send + Sync + 'static>;

/// A conditional edge: source node, router, optional label map.
#[derive(Clone)]
pub struct ConditionalEdge {
    from: NodeKind,
    router: RouterFn,
    targets: Option<FxHashMap<String, NodeKind>>,
}

impl ConditionalEdge {
    /// Conditional edge whose router output names destinations directly.
    pub fn new(from: impl Into<NodeKind>, router: RouterFn) -> Self {
        Self {
            from: from.into(),
            router,
            targets: None,
        }
    }

    /// Conditional edge whose router output is resolved through a label
    /// map. Every label the router can produce should have an entry; at
    /// compile time each mapped target is checked for existence.
    pub fn with_targets(
        from: impl Into<NodeKind>,
        router: RouterFn,
        targets: impl IntoIterator<Item = (String, NodeKind)>,
    ) -> Self {
        Self {
            from: from.into(),
            router,
            targets: Some(targets.into_iter().collect()),
        }
    }

    /// The source node of this edge.
    #[must_use]
    pub fn from(&self) -> &NodeKind {
        &self.from
    }

    /// The label map, when one was supplied.
    #[must_use]
    pub fn targets(&self) -> Option<&FxHashMap<String, NodeKind>> {
        self.targets.as_ref()
    }

    /// Evaluate the router and resolve its labels to destinations.
    ///
    /// A label missing from the map is skipped with a warning rather than
    /// failing the run; compile-time validation already covered every
    /// mapped target, so this only fires for router outputs the author
    /// never mapped.
    #[must_use]
    pub fn route(&self, snapshot: &StateSnapshot) -> Vec<NodeKind> {
        let labels = (self.router)(snapshot);
        let mut routed = Vec::with_capacity(labels.len());
        for label in labels {
            match &self.targets {
                Some(map) => match map.get(&label) {
                    Some(target) => routed.push(target.clone()),
                    None => {
                        tracing::warn!(
                            from = %self.from,
                            label = %label,
                            "router produced unmapped label; skipping"
                        );
                    }
                },
                None => routed.push(NodeKind::from(label.as_str())),
            }
        }
        routed
    }
}

impl fmt::Debug for ConditionalEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalEdge")
            .field("from", &self.from)
            .field("targets", &self.targets)
            .finish()
    }
}
