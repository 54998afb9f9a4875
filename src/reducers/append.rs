use serde_json::Value;

use super::Reducer;

/// List concatenation: the incoming elements are appended to the current
/// list.
///
/// Non-array operands are coerced: a scalar current value becomes a
/// single-element list, a scalar incoming value is pushed as one element,
/// and nulls contribute nothing. Channels using this reducer typically
/// declare `json!([])` as their default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendList;

fn into_elements(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

impl Reducer for AppendList {
    fn apply(&self, current: Value, incoming: Value) -> Value {
        let mut items = into_elements(current);
        items.extend(into_elements(incoming));
        Value::Array(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn concatenates_lists() {
        let merged = AppendList.apply(json!(["a"]), json!(["b", "c"]));
        assert_eq!(merged, json!(["a", "b", "c"]));
    }

    #[test]
    fn coerces_scalars() {
        assert_eq!(AppendList.apply(json!([]), json!("x")), json!(["x"]));
        assert_eq!(AppendList.apply(json!("x"), json!(["y"])), json!(["x", "y"]));
    }

    #[test]
    fn null_contributes_nothing() {
        assert_eq!(AppendList.apply(json!(["a"]), Value::Null), json!(["a"]));
    }
}
