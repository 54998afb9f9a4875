//! Property: barrier merges are independent of partial submission order.

use graphloom::channels::{Channel, StateSchema};
use graphloom::node::NodePartial;
use graphloom::state::StateStore;
use graphloom::types::NodeKind;
use proptest::prelude::*;
use serde_json::{Value, json};

fn schema() -> StateSchema {
    StateSchema::from_channels([Channel::appending("log"), Channel::summing("total")])
}

fn merge_in_order(pairs: &[(String, String, i64)]) -> StateStore {
    let schema = schema();
    let mut store = StateStore::seed(&schema, &NodePartial::new()).unwrap();
    let partials: Vec<(NodeKind, NodePartial)> = pairs
        .iter()
        .map(|(node, word, amount)| {
            (
                NodeKind::Custom(node.clone()),
                NodePartial::new()
                    .with("log", json!([word]))
                    .with("total", json!(amount)),
            )
        })
        .collect();
    store.merge(&schema, &partials).unwrap();
    store
}

proptest! {
    #[test]
    fn merge_is_submission_order_independent(
        entries in proptest::collection::vec(("[a-e]{1,4}", "[w-z]{1,4}", -100i64..100), 1..6)
    ) {
        // Unique node names; the scheduler never produces two partials
        // from the same node in one superstep.
        let pairs: Vec<(String, String, i64)> = entries
            .into_iter()
            .enumerate()
            .map(|(i, (node, word, amount))| (format!("{node}{i}"), word, amount))
            .collect();

        let forward = merge_in_order(&pairs);
        let mut reversed_pairs = pairs.clone();
        reversed_pairs.reverse();
        let reversed = merge_in_order(&reversed_pairs);

        prop_assert_eq!(forward.get("log"), reversed.get("log"));
        prop_assert_eq!(forward.get("total"), reversed.get("total"));

        // And the list order matches the node-name sort of contributors.
        let mut sorted = pairs.clone();
        sorted.sort_by(|a, b| {
            NodeKind::Custom(a.0.clone())
                .encode()
                .cmp(&NodeKind::Custom(b.0.clone()).encode())
        });
        let expected: Vec<Value> = sorted.iter().map(|(_, word, _)| json!(word)).collect();
        prop_assert_eq!(forward.get("log"), Some(&Value::Array(expected)));
    }
}
