//! Side-table bookkeeping as trees and handles are dropped

use super::create_test_session;
use lazymock::{Config, Session, SessionStats};

#[test]
fn test_dropped_scenarios_are_swept() {
    let session = Session::with_config(Config::new().with_recorder().with_sweep_threshold(0));
    {
        let mock = session.create_handle();
        mock.get("a").get("b").assign("c", 1).unwrap();
        mock.get("fun").returns_spy().unwrap().assign("x", 1).unwrap();
        assert!(session.stats().functions.live_entries > 0);
    }

    let stats = session.stats();
    assert_eq!(stats.attachments.live_entries, 0);
    assert_eq!(stats.functions.live_entries, 0);
    assert!(stats.attachments.dead_entries > 0);

    session.sweep();
    assert_eq!(session.stats(), SessionStats::default());
}

#[test]
fn test_live_tree_survives_aggressive_sweeps() {
    let session = create_test_session();
    let mock = session.create_handle();
    let deep = mock.get("a").get("b");
    deep.assign("c", 1).unwrap();

    for i in 0..32 {
        mock.get(format!("noise{}", i)).assign("v", i).unwrap();
    }
    session.sweep();

    assert!(mock.get("a").get("b").ptr_eq(&deep));
    deep.detach().unwrap();
    deep.reattach().unwrap();
    assert_eq!(mock.value().get("a").get("b").get("c").as_number(), Some(1.0));
}

#[test]
fn test_registry_entries_follow_handles() {
    let session = Session::with_config(Config::new().with_sweep_threshold(0));
    let mock = session.create_handle();
    {
        let _a = mock.get("a");
        assert_eq!(session.stats().handles.live_entries, 2);
    }
    assert_eq!(session.stats().handles.live_entries, 1);
    assert_eq!(session.stats().handles.dead_entries, 1);

    session.configure(Config::new().with_sweep_threshold(1));
    let _b = mock.get("b");
    assert_eq!(session.stats().handles.dead_entries, 0);
}
