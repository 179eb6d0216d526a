//! Path navigation and plain assignment

use super::create_mock;
use lazymock::{MockValue, NodeRef};
use serde_json::json;

#[test]
fn test_navigation_is_idempotent() {
    let (_session, mock) = create_mock();
    let first = mock.get("a").get("b");
    let second = mock.get("a").get("b");
    assert!(first.ptr_eq(&second));
    assert!(mock.get("a").ptr_eq(&mock.get("a")));
}

#[test]
fn test_path_creation() {
    let (_session, mock) = create_mock();
    mock.get("a").get("b").assign("c", 5).unwrap();
    assert_eq!(mock.value().to_json(), json!({"a": {"b": {"c": 5}}}));
    assert_eq!(mock.value(), MockValue::from(json!({"a": {"b": {"c": 5}}})));
}

#[test]
fn test_navigation_alone_creates_empty_objects() {
    let (_session, mock) = create_mock();
    mock.get("x").get("y");
    assert_eq!(mock.value().to_json(), json!({"x": {"y": {}}}));
}

#[test]
fn test_navigation_over_primitives_replaces_them() {
    let (_session, mock) = create_mock();
    mock.assign("zero", 0).unwrap();
    mock.assign("name", "set").unwrap();
    mock.get("zero").assign("k", 1).unwrap();
    mock.get("name").assign("k", 2).unwrap();
    assert_eq!(
        mock.value().to_json(),
        json!({"zero": {"k": 1}, "name": {"k": 2}})
    );
}

#[test]
fn test_assign_merges_into_same_shape() {
    let (_session, mock) = create_mock();
    let obj = mock.get("obj");
    obj.assign("old", 1).unwrap();

    mock.assign("obj", json!({"new": 2})).unwrap();
    obj.assign("more", 3).unwrap();

    assert!(mock.get("obj").ptr_eq(&obj));
    assert_eq!(
        mock.value().to_json(),
        json!({"obj": {"new": 2, "more": 3}})
    );
}

#[test]
fn test_assign_opposite_shape_replaces() {
    let (_session, mock) = create_mock();
    let list = mock.get("v");
    list.assign(0, 1).unwrap();

    mock.assign("v", json!({"a": 1})).unwrap();
    list.assign(1, 2).unwrap();

    assert_eq!(mock.value().to_json(), json!({"v": {"a": 1}}));
    assert!(!mock.get("v").ptr_eq(&list));
}

#[test]
fn test_assigned_composite_is_navigable() {
    let (_session, mock) = create_mock();
    mock.assign("cfg", json!({"db": {"host": "localhost"}})).unwrap();
    mock.get("cfg").get("db").assign("port", 5432).unwrap();
    assert_eq!(
        mock.value().to_json(),
        json!({"cfg": {"db": {"host": "localhost", "port": 5432}}})
    );
}

#[test]
fn test_name_key_turns_array_into_object() {
    let (_session, mock) = create_mock();
    let v = mock.get("v");
    v.assign(0, 1).unwrap();
    v.get("name").assign("x", 1).unwrap();
    assert_eq!(mock.value().to_json(), json!({"v": {"name": {"x": 1}}}));
}

#[test]
fn test_numeric_string_keys_are_indices() {
    let (_session, mock) = create_mock();
    mock.get("items").get("0").assign("id", 7).unwrap();
    mock.get("items").assign("01", "not an index").unwrap();
    assert_eq!(
        mock.value().to_json(),
        json!({"items": {"01": "not an index"}})
    );
}

#[test]
fn test_handle_for_existing_root() {
    let (session, _) = create_mock();
    let root = MockValue::from(json!({"a": {"b": 1}}));
    let node: NodeRef = root.as_node().cloned().unwrap();

    let first = session.handle_for(&node);
    let second = session.handle_for(&node);
    assert!(first.ptr_eq(&second));
    assert!(first.is_root());

    first.get("a").assign("c", 2).unwrap();
    assert_eq!(root.to_json(), json!({"a": {"b": 1, "c": 2}}));
}

#[test]
fn test_separate_roots_do_not_share_state() {
    let (session, first) = create_mock();
    let second = session.create_handle();
    first.get("a").assign("x", 1).unwrap();
    second.get("a").assign("y", 2).unwrap();
    assert_eq!(first.value().to_json(), json!({"a": {"x": 1}}));
    assert_eq!(second.value().to_json(), json!({"a": {"y": 2}}));
}
