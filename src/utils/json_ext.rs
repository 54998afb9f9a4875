//! JSON serialization glue shared by persistence backends.

/// String (de)serialization with a caller-chosen error type.
///
/// Persistence models get this via a blanket impl (see
/// [`crate::runtime::persistence`]), keeping backend code free of direct
/// `serde_json` plumbing.
pub trait JsonSerializable<E>: Sized {
    fn to_json_string(&self) -> Result<String, E>;
    fn from_json_str(s: &str) -> Result<Self, E>;
}
