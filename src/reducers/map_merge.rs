use serde_json::Value;

use super::Reducer;

/// Shallow JSON object merge: incoming keys overwrite current keys,
/// untouched keys survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapMerge;

impl Reducer for MapMerge {
    fn apply(&self, current: Value, incoming: Value) -> Value {
        match (current, incoming) {
            (Value::Object(mut base), Value::Object(update)) => {
                for (k, v) in update {
                    base.insert(k, v);
                }
                Value::Object(base)
            }
            // Anything that is not a pair of objects degrades to overwrite.
            (current, Value::Null) => current,
            (_, incoming) => incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_objects_shallowly() {
        let merged = MapMerge.apply(json!({"a": 1, "b": 2}), json!({"b": 3, "c": 4}));
        assert_eq!(merged, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn non_objects_overwrite() {
        assert_eq!(MapMerge.apply(json!({"a": 1}), json!(7)), json!(7));
    }
}
