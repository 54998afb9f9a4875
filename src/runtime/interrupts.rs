//! Suspension primitives: the token handed to callers and the pending
//! record carried by checkpoints.
//!
//! A node suspends by calling
//! [`NodeContext::interrupt`](crate::node::NodeContext::interrupt). The
//! scheduler intercepts the signal, the runner discards the superstep's
//! outputs (the checkpoint is pre-completion by construction), records a
//! [`PendingInterrupt`], and surfaces an [`Interrupt`] token. Resuming the
//! thread replays the same superstep with the resume value queued for the
//! suspended node.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::types::NodeKind;

/// Resume values recorded per node, consumed in call-site order on
/// replay. Survives in checkpoints so resumption works across process
/// restarts, and is cleared for a node once it completes a superstep.
pub(crate) type ResumeLog = FxHashMap<NodeKind, Vec<Value>>;

/// The token returned to the caller when a run suspends.
#[derive(Clone, Debug, PartialEq)]
pub struct Interrupt {
    /// Thread to resume.
    pub thread_id: String,
    /// Node that suspended.
    pub node: NodeKind,
    /// Payload the node handed to its `interrupt` call.
    pub payload: Value,
}

/// The suspension recorded inside a checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingInterrupt {
    pub node: NodeKind,
    pub payload: Value,
}

/// A suspension observed by the scheduler during one superstep.
#[derive(Clone, Debug)]
pub(crate) struct InterruptCapture {
    pub node: NodeKind,
    pub payload: Value,
}

/// Pick the capture that becomes the caller-visible token when several
/// nodes suspended in the same superstep. Node-name order keeps the
/// choice independent of task completion order.
pub(crate) fn select_capture(mut captures: Vec<InterruptCapture>) -> Option<InterruptCapture> {
    captures.sort_by_key(|c| c.node.encode());
    captures.into_iter().next()
}
