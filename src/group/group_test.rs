use std::thread::sleep;

use serde_json::json;

use super::*;

#[test]
fn test_new_group_starts_empty() {
    let group = Group::new();
    let guard = group.lock_handle();

    assert!(guard.state().is_empty());
    assert!(!guard.is_evicted());
    assert!(!guard.completion_handle().is_released());
    assert!(!group.has_custom_should_conclude());
}

#[test]
fn test_should_conclude_respects_window_boundary() {
    let window = Duration::from_millis(100);
    let group = Group::new();

    assert!(!group.should_conclude(window));

    sleep(Duration::from_millis(110));
    assert!(group.should_conclude(window));
}

#[test]
fn test_custom_predicate_overrides_window() {
    let group = Group::new();

    group.set_custom_should_conclude(Arc::new(|_| true));
    assert!(group.should_conclude(Duration::from_secs(3600)));

    group.set_custom_should_conclude(Arc::new(|_| false));
    assert!(!group.should_conclude(Duration::ZERO));
}

#[test]
fn test_custom_predicate_receives_elapsed_time() {
    let group = Group::new();
    group.set_custom_should_conclude(Arc::new(|elapsed| elapsed >= Duration::from_millis(20)));

    assert!(!group.should_conclude(Duration::ZERO));
    sleep(Duration::from_millis(30));
    assert!(group.should_conclude(Duration::ZERO));
}

#[test]
fn test_reset_starts_fresh_window() {
    let group = Group::new();
    let first_start = group.started_at();
    group.set_custom_should_conclude(Arc::new(|_| true));

    let old_handle = {
        let mut guard = group.lock_handle();
        guard.state.insert("count".to_string(), json!(3));
        let old_handle = guard.completion_handle().clone();

        sleep(Duration::from_millis(5));
        guard.reset();

        assert!(guard.state().is_empty());
        assert!(!guard.completion_handle().ptr_eq(&old_handle));
        old_handle
    };

    assert!(group.started_at() > first_start);
    assert!(!group.has_custom_should_conclude());
    // Reset does not release the previous window's handle
    assert!(!old_handle.is_released());
}

#[test]
fn test_conclude_gate_try_lock_is_exclusive() {
    let group = Group::new();

    let first = group.try_lock_conclude();
    assert!(first.is_some());
    assert!(group.try_lock_conclude().is_none());

    drop(first);
    assert!(group.try_lock_conclude().is_some());
}

#[test]
fn test_turnstile_passes_when_gate_is_free() {
    let group = Group::new();
    group.pass_conclude_turnstile();
    // Gate is not kept by the turnstile
    assert!(group.try_lock_conclude().is_some());
}

#[test]
fn test_group_state_derefs_to_map() {
    let mut state = GroupState::new();
    state.insert("a".to_string(), json!(1));

    assert_eq!(state.get("a"), Some(&json!(1)));
    assert_eq!(state.len(), 1);
    assert_eq!(state.into_map(), json!({"a": 1}).as_object().cloned().unwrap());
}
