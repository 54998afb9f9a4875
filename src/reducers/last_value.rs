use serde_json::Value;

use super::Reducer;

/// Overwrite semantics: the incoming value replaces the current one.
///
/// This is the implicit reducer for channels declared without one. A null
/// incoming value is treated as "no opinion" and keeps the current value,
/// so nodes can omit fields from structured updates without clearing them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LastValue;

impl Reducer for LastValue {
    fn apply(&self, current: Value, incoming: Value) -> Value {
        if incoming.is_null() { current } else { incoming }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overwrites_current() {
        assert_eq!(LastValue.apply(json!(1), json!(2)), json!(2));
        assert_eq!(LastValue.apply(json!("a"), json!("b")), json!("b"));
    }

    #[test]
    fn null_keeps_current() {
        assert_eq!(LastValue.apply(json!(5), Value::Null), json!(5));
    }
}
