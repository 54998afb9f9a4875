/*!
Persistence primitives: serde-friendly shapes for checkpoints and the
conversions between them and the in-memory runtime types.

Design goals:
- Keep the persisted shapes explicit and decoupled from in-memory
  representations, so storage formats do not drift when runtime types
  evolve.
- Localize conversion logic in `From`/`TryFrom` impls so backend code
  stays lean and declarative.
- Stay forward compatible: unknown node encodings round-trip as
  `NodeKind::Custom(encoded)`.

This module performs no I/O; it is pure data transformation and
(de)serialization glue shared by every checkpoint backend.
*/

use std::collections::BTreeMap;

use chrono::Utc;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::runtime::checkpointer::Checkpoint;
use crate::runtime::interrupts::PendingInterrupt;
use crate::state::{ChannelSlot, StateStore};
use crate::types::NodeKind;
use crate::utils::json_ext::JsonSerializable;

/// Conversion and serialization errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("missing field: {0}")]
    #[diagnostic(
        code(graphloom::persistence::missing_field),
        help("Populate the field in the persisted JSON before conversion.")
    )]
    MissingField(&'static str),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(graphloom::persistence::serde),
        help("Ensure the JSON structure matches the persisted checkpoint shape.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Blanket `JsonSerializable` for all serde types using `PersistenceError`.
impl<T> JsonSerializable<PersistenceError> for T
where
    T: serde::Serialize + for<'de> serde::de::DeserializeOwned,
{
    fn to_json_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PersistenceError::Serde { source: e })
    }

    fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| PersistenceError::Serde { source: e })
    }
}

/// Persisted form of the state store: channel name → value + version.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PersistedState {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelSlot>,
}

/// Persisted form of a pending interrupt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedInterrupt {
    /// Encoded `NodeKind` of the suspended node.
    pub node: String,
    pub payload: Value,
}

/// Full persisted checkpoint representation. Step-history tables store
/// one instance of this shape per boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    pub thread_id: String,
    pub step: u64,
    pub state: PersistedState,
    /// Frontier encoded as strings via `NodeKind::encode()`.
    pub frontier: Vec<String>,
    /// Resume values keyed by encoded node name.
    #[serde(default)]
    pub resume_values: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub pending_interrupt: Option<PersistedInterrupt>,
    /// RFC 3339 creation time (keeps `chrono::DateTime` out of the
    /// serialized shape).
    pub created_at: String,
}

/* ---------- StateStore <-> PersistedState ---------- */

impl From<&StateStore> for PersistedState {
    fn from(store: &StateStore) -> Self {
        PersistedState {
            channels: store.slots().clone(),
        }
    }
}

impl From<PersistedState> for StateStore {
    fn from(persisted: PersistedState) -> Self {
        StateStore::from_slots(persisted.channels)
    }
}

/* ---------- Checkpoint <-> PersistedCheckpoint ---------- */

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            thread_id: cp.thread_id.clone(),
            step: cp.step,
            state: PersistedState::from(&cp.state),
            frontier: cp.frontier.iter().map(NodeKind::encode).collect(),
            resume_values: cp
                .resume_log
                .iter()
                .map(|(node, values)| (node.encode(), values.clone()))
                .collect(),
            pending_interrupt: cp.pending_interrupt.as_ref().map(|p| PersistedInterrupt {
                node: p.node.encode(),
                payload: p.payload.clone(),
            }),
            created_at: cp.created_at.to_rfc3339(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(p: PersistedCheckpoint) -> Result<Self> {
        let created_at = chrono::DateTime::parse_from_rfc3339(&p.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Ok(Checkpoint {
            thread_id: p.thread_id,
            step: p.step,
            state: StateStore::from(p.state),
            frontier: p.frontier.iter().map(|s| NodeKind::decode(s)).collect(),
            resume_log: p
                .resume_values
                .into_iter()
                .map(|(node, values)| (NodeKind::decode(&node), values))
                .collect(),
            pending_interrupt: p.pending_interrupt.map(|pi| PendingInterrupt {
                node: NodeKind::decode(&pi.node),
                payload: pi.payload,
            }),
            created_at,
        })
    }
}
