//! Property tests over generated paths

use proptest::prelude::*;
use serde_json::{Map, Value, json};

use super::create_mock;
use lazymock::{Handle, Key};

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,5}"
}

fn arb_key() -> impl Strategy<Value = Key> {
    prop_oneof![
        arb_name().prop_map(Key::from),
        (0u32..4).prop_map(Key::from),
    ]
}

fn navigate(handle: &Handle, path: &[Key]) -> Handle {
    path.iter()
        .fold(handle.clone(), |current, key| current.get(key))
}

/// `{"a": {"b": leaf}}` for the path `["a", "b"]`
fn nested_json(path: &[String], leaf: Value) -> Value {
    path.iter().rev().fold(leaf, |inner, name| {
        let mut map = Map::new();
        map.insert(name.clone(), inner);
        Value::Object(map)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Navigating the same path twice yields the same handle
    #[test]
    fn prop_navigation_is_idempotent(path in prop::collection::vec(arb_key(), 1..6)) {
        let (_session, mock) = create_mock();
        let first = navigate(&mock, &path);
        let second = navigate(&mock, &path);
        prop_assert!(first.ptr_eq(&second));
    }

    /// Writing a leaf at the end of a path builds exactly that nesting
    #[test]
    fn prop_path_creation(
        path in prop::collection::vec(arb_name(), 1..6),
        leaf in any::<i32>(),
    ) {
        let (_session, mock) = create_mock();
        let keys: Vec<Key> = path.iter().map(|name| Key::from(name.as_str())).collect();
        let (last, parents) = match keys.split_last() {
            Some(split) => split,
            None => return Ok(()),
        };
        navigate(&mock, parents).assign(last, leaf).unwrap();
        prop_assert_eq!(mock.value().to_json(), nested_json(&path, json!(leaf)));
    }

    /// Detaching and reattaching a subtree restores the tree exactly
    #[test]
    fn prop_detach_reattach_round_trip(
        path in prop::collection::vec(arb_name(), 1..5),
        sibling in arb_name(),
    ) {
        let (_session, mock) = create_mock();
        let keys: Vec<Key> = path.iter().map(|name| Key::from(name.as_str())).collect();
        let sub = navigate(&mock, &keys);
        sub.assign("leaf", true).unwrap();
        mock.assign(format!("{}_sibling", sibling), 1).unwrap();
        let before = mock.value().to_json();

        sub.detach().unwrap();
        prop_assert_ne!(mock.value().to_json(), before.clone());
        sub.reattach().unwrap();
        prop_assert_eq!(mock.value().to_json(), before);
    }
}
