use ludus_grants::Grant;
use ludus_types::Args;
use proptest::prelude::*;
use serde_json::json;
use std::collections::BTreeMap;

fn to_args(map: &BTreeMap<String, i64>) -> Args {
    map.iter().map(|(k, v)| (k.clone(), json!(v))).collect()
}

fn keys() -> impl Strategy<Value = BTreeMap<String, i64>> {
    prop::collection::btree_map("[a-e]", any::<i64>(), 0..5)
}

proptest! {
    #[test]
    fn resolved_args_follow_precedence(supplied in keys(), forced in keys(), defaults in keys()) {
        let mut grant = Grant::new("act");
        for (k, v) in &forced {
            grant = grant.with_kwarg(k.clone(), json!(v));
        }
        for (k, v) in &defaults {
            grant = grant.with_default(k.clone(), json!(v));
        }
        let resolved = grant.resolve_args(to_args(&supplied));

        for (k, v) in &forced {
            prop_assert_eq!(&resolved[k], &json!(v));
        }
        for (k, v) in &supplied {
            if !forced.contains_key(k) {
                prop_assert_eq!(&resolved[k], &json!(v));
            }
        }
        for (k, v) in &defaults {
            if !forced.contains_key(k) && !supplied.contains_key(k) {
                prop_assert_eq!(&resolved[k], &json!(v));
            }
        }
        let expected_len = supplied
            .keys()
            .chain(forced.keys())
            .chain(defaults.keys())
            .collect::<std::collections::BTreeSet<_>>()
            .len();
        prop_assert_eq!(resolved.len(), expected_len);
    }
}
