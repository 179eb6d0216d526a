//! Spy installation, reuse and passthroughs

use std::cell::Cell;
use std::rc::Rc;

use super::{call_at, create_mock};
use lazymock::spy::same_spy;
use lazymock::{Config, MockValue, Recorder, Session, SpyRef};
use serde_json::json;

#[test]
fn test_spy_reuse_across_references() {
    let (_session, mock) = create_mock();
    let f1 = mock.get("fun").returns_spy().unwrap();
    let f2 = mock.get("fun").returns_spy().unwrap();
    assert!(f1.ptr_eq(&f2));

    let fun = mock.value().get("fun");
    fun.call(&[]).unwrap();
    fun.call(&[]).unwrap();

    let s1 = f1.spy().unwrap();
    let s2 = f2.spy().unwrap();
    assert!(same_spy(&s1, &s2));
    assert_eq!(s1.call_count(), 2);
    assert_eq!(s2.call_count(), 2);
}

#[test]
fn test_call_is_returns_spy() {
    let (_session, mock) = create_mock();
    mock.get("fun").call().unwrap().assign("field", 1).unwrap();

    assert_eq!(call_at(&mock.value(), &["fun"]).to_json(), json!({"field": 1}));
    assert_eq!(mock.get("fun").spy().unwrap().call_count(), 1);
}

#[test]
fn test_spy_upgrades_plain_function_in_place() {
    let (_session, mock) = create_mock();
    mock.get("fun").set_returns(3).unwrap();
    let before = mock.value().get("fun");

    let spy = mock.get("fun").spy().unwrap();
    let after = mock.value().get("fun");

    assert!(before.strict_equals(&after));
    assert_eq!(before.call(&[]), Ok(MockValue::from(3)));
    assert_eq!(spy.call_count(), 1);
}

#[test]
fn test_set_returns_spy_reaches_the_spy() {
    let (_session, mock) = create_mock();
    let fun = mock.get("fun");
    fun.set_returns_spy(4).unwrap();
    fun.mock_return_value_once(5).unwrap();

    let installed = mock.value().get("fun");
    assert_eq!(installed.call(&[]), Ok(MockValue::from(5)));
    assert_eq!(installed.call(&[]), Ok(MockValue::from(4)));

    fun.set_returns_spy(6).unwrap();
    assert_eq!(installed.call(&[]), Ok(MockValue::from(6)));
    assert_eq!(fun.spy().unwrap().call_count(), 3);
}

#[test]
fn test_spy_records_arguments() {
    let (_session, mock) = create_mock();
    let spy = mock.get("log").spy().unwrap();
    let log = mock.value().get("log");
    log.call(&[MockValue::from("a")]).unwrap();
    log.call(&[MockValue::from(1), MockValue::Null]).unwrap();

    assert_eq!(
        spy.calls(),
        vec![
            vec![MockValue::from("a")],
            vec![MockValue::from(1), MockValue::Null]
        ]
    );
    assert_eq!(spy.last_call(), Some(vec![MockValue::from(1), MockValue::Null]));

    spy.mock_clear();
    assert_eq!(spy.call_count(), 0);
}

#[test]
fn test_resolved_and_rejected_passthroughs() {
    let (_session, mock) = create_mock();
    let load = mock.get("load");
    load.mock_resolved_value(json!({"id": 1})).unwrap();
    load.mock_rejected_value_once("boom").unwrap();

    let installed = mock.value().get("load");
    assert_eq!(
        installed.call(&[]).unwrap().to_json(),
        json!({"rejected": "boom"})
    );
    assert_eq!(
        installed.call(&[]).unwrap().to_json(),
        json!({"resolved": {"id": 1}})
    );

    load.mock_resolved_value_once(2).unwrap();
    load.mock_rejected_value(3).unwrap();
    assert_eq!(installed.call(&[]), Ok(MockValue::resolved(2)));
    assert_eq!(installed.call(&[]), Ok(MockValue::rejected(3)));
}

#[test]
fn test_implementation_passthroughs() {
    let (_session, mock) = create_mock();
    let add = mock.get("math").get("add");
    add.mock_implementation(|args| {
        MockValue::from(args.iter().filter_map(MockValue::as_number).sum::<f64>())
    })
    .unwrap();
    add.mock_implementation_once(|_| MockValue::from("first")).unwrap();

    let installed = mock.value().get("math").get("add");
    let args = [MockValue::from(1), MockValue::from(2)];
    assert_eq!(installed.call(&args), Ok(MockValue::from("first")));
    assert_eq!(installed.call(&args), Ok(MockValue::from(3)));
}

#[test]
fn test_passthroughs_return_the_spy() {
    let (_session, mock) = create_mock();
    let fun = mock.get("fun");
    let returned: SpyRef = fun.mock_return_value(1).unwrap();
    assert!(same_spy(&returned, &fun.spy().unwrap()));
}

#[test]
fn test_spy_constructor_runs_once_per_function() {
    let built = Rc::new(Cell::new(0));
    let counter = built.clone();
    let session = Session::with_config(Config::new().with_spy(move |body| {
        counter.set(counter.get() + 1);
        Rc::new(Recorder::new(body)) as SpyRef
    }));
    let mock = session.create_handle();

    mock.get("fun").returns_spy().unwrap();
    mock.get("fun").returns_spy().unwrap();
    mock.get("fun").spy().unwrap();
    mock.get("fun").mock_return_value(1).unwrap();
    assert_eq!(built.get(), 1);

    mock.get("other").call().unwrap();
    assert_eq!(built.get(), 2);
}

#[test]
fn test_configure_enables_spies_later() {
    let session = Session::new();
    let mock = session.create_handle();
    assert!(mock.get("fun").spy().is_err());

    session.configure(Config::new().with_recorder());
    assert!(mock.get("fun").spy().is_ok());
    assert!(mock.value().get("fun").is_callable());
}
