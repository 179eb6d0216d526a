//! In-place replacement with set

use super::{call_at, create_mock};
use lazymock::{MockValue, Operator};
use serde_json::json;

#[test]
fn test_set_primitive_then_object() {
    let (_session, mock) = create_mock();
    mock.get("outer").set(6).unwrap();
    assert_eq!(mock.value().to_json(), json!({"outer": 6}));

    mock.get("outer").set(json!({"first": 5})).unwrap();
    assert_eq!(mock.value().to_json(), json!({"outer": {"first": 5}}));
}

#[test]
fn test_set_through_the_same_handle() {
    let (_session, mock) = create_mock();
    let outer = mock.get("outer");
    outer.set(6).unwrap();
    outer.set(json!({"first": 5})).unwrap();
    outer.assign("second", 2).unwrap();

    assert_eq!(
        mock.value().to_json(),
        json!({"outer": {"first": 5, "second": 2}})
    );
    assert!(mock.get("outer").ptr_eq(&outer));
}

#[test]
fn test_set_same_shape_merges() {
    let (_session, mock) = create_mock();
    let outer = mock.get("outer");
    outer.assign("a", 1).unwrap();
    let alias = mock.get("outer");

    outer.set(json!({"b": 2})).unwrap();
    alias.assign("c", 3).unwrap();

    assert!(alias.ptr_eq(&outer));
    assert_eq!(mock.value().to_json(), json!({"outer": {"b": 2, "c": 3}}));
}

#[test]
fn test_set_changes_shape() {
    let (_session, mock) = create_mock();
    let outer = mock.get("outer");
    outer.assign("a", 1).unwrap();

    outer.set(json!([1, 2])).unwrap();
    outer.assign(2, 3).unwrap();
    assert_eq!(mock.value().to_json(), json!({"outer": [1, 2, 3]}));
}

#[test]
fn test_stale_handle_after_plain_assignment() {
    let (_session, mock) = create_mock();
    let outer = mock.get("outer");
    mock.assign("outer", 6).unwrap();
    outer.assign("inner", 5).unwrap();

    assert_ne!(mock.value(), MockValue::from(json!({"outer": {"inner": 5}})));
    assert_eq!(mock.value().to_json(), json!({"outer": 6}));
}

#[test]
fn test_set_on_detached_node_merges_without_reattaching() {
    let (_session, mock) = create_mock();
    let a = mock.get("a");
    a.detach().unwrap();
    a.set(json!({"z": 1})).unwrap();
    assert_eq!(mock.value().to_json(), json!({}));

    a.reattach().unwrap();
    assert_eq!(mock.value().to_json(), json!({"a": {"z": 1}}));
}

#[test]
fn test_set_on_return_value() {
    let (_session, mock) = create_mock();
    let fun = mock.get("fun");
    fun.set_returns(json!({"a": 1})).unwrap();
    let returned = call_at(&mock.value(), &["fun"]);

    fun.set(json!({"b": 2})).unwrap();
    assert_eq!(returned.to_json(), json!({"b": 2}));
    assert!(returned.strict_equals(&call_at(&mock.value(), &["fun"])));

    fun.set(7).unwrap();
    assert_eq!(call_at(&mock.value(), &["fun"]), MockValue::from(7));
}

#[test]
fn test_set_through_operator_dispatch() {
    let (_session, mock) = create_mock();
    let outer = mock.get("outer");
    let same = outer.apply(Operator::Set).unwrap().into_handle();
    assert!(same.is_some_and(|handle| handle.ptr_eq(&outer)));

    outer.apply_assign(Operator::Set, "text").unwrap();
    assert_eq!(mock.value().to_json(), json!({"outer": "text"}));
}
