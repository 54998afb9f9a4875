//! Core identifier types for workflow graphs.
//!
//! A graph is addressed by [`NodeKind`]: the two virtual endpoints
//! (`Start`, `End`) plus named computation nodes. The endpoints are purely
//! structural (never registered or executed), but edges may
//! reference them freely to describe where execution enters and leaves the
//! graph.
//!
//! `NodeKind` also defines the string encoding used when frontiers and
//! checkpoints are persisted, so the format is part of the storage
//! contract: `Start`, `End`, and `Node:<name>`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual: they carry no implementation and are
/// skipped by the scheduler, existing only so edges can describe entry and
/// exit points. Every executable node is a `Custom` with a caller-chosen
/// name, unique within its graph.
///
/// # Examples
///
/// ```rust
/// use graphloom::types::NodeKind;
///
/// let planner = NodeKind::Custom("planner".to_string());
/// assert_eq!(planner.encode(), "Node:planner");
/// assert_eq!(NodeKind::decode("Node:planner"), planner);
/// assert_eq!(NodeKind::decode("End"), NodeKind::End);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point. Has no implementation; its outgoing edges form
    /// the first frontier of every run.
    Start,

    /// Virtual exit point. Routing to `End` (or producing an empty
    /// frontier) terminates the run.
    End,

    /// An executable node registered under a user-chosen name.
    Custom(String),
}

impl NodeKind {
    /// Encode into the persisted string form (`Start`, `End`,
    /// `Node:<name>`).
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(name) => format!("Node:{name}"),
        }
    }

    /// Decode a persisted string form.
    ///
    /// Unrecognized input decodes as `Custom(input)` so older encodings and
    /// bare node names round-trip instead of failing.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Node:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` for the virtual `Start` endpoint.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` for the virtual `End` endpoint.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for an executable (non-virtual) node.
    #[must_use]
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Lets call sites pass string literals wherever a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from(s.as_str())
    }
}
