use std::collections::HashSet;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use d_aggregate::ActionConfig;
use serde_json::json;
use serde_json::Value;

use crate::commons::drain;
use crate::commons::processor;
use crate::commons::random_batch;
use crate::commons::record;
use crate::commons::run_concurrently;
use crate::commons::unique_batch;
use crate::commons::BATCH_SIZE;
use crate::commons::NUM_THREADS;
use crate::enable_logger;

fn key_of(value: &d_aggregate::Event) -> (Value, Value) {
    (
        value.get("first_key").cloned().unwrap_or(Value::Null),
        value.get("second_key").cloned().unwrap_or(Value::Null),
    )
}

#[test]
fn remove_duplicates_forwards_each_key_once_across_threads() {
    enable_logger();
    let processor = Arc::new(processor(ActionConfig::new("remove_duplicates"), Duration::from_secs(300)));

    let out = run_concurrently(&processor, || unique_batch(BATCH_SIZE));

    assert_eq!(out.len(), BATCH_SIZE);
    let keys: HashSet<_> = out.iter().map(|r| key_of(r.event())).collect();
    assert_eq!(keys.len(), BATCH_SIZE);
    assert_eq!(processor.metrics().handle_out.get(), BATCH_SIZE as u64);
    assert_eq!(
        processor.metrics().handle_dropped.get(),
        ((NUM_THREADS - 1) * BATCH_SIZE) as u64
    );
    assert!(drain(&processor).is_empty());
}

#[test]
fn count_never_loses_events_across_threads() {
    let processor = Arc::new(processor(ActionConfig::new("count"), Duration::from_secs(300)));
    let distinct_keys = 5;

    let out = run_concurrently(&processor, || random_batch(BATCH_SIZE, distinct_keys));
    assert!(out.is_empty());

    let concluded = drain(&processor);
    assert!(concluded.len() <= distinct_keys);
    let keys: HashSet<_> = concluded.iter().map(|r| key_of(r.event())).collect();
    assert_eq!(keys.len(), concluded.len());

    let total: u64 = concluded
        .iter()
        .map(|r| r.event().get("aggr._count").and_then(Value::as_u64).unwrap_or(0))
        .sum();
    assert_eq!(total, (NUM_THREADS * BATCH_SIZE) as u64);
}

#[test]
fn count_with_short_window_concludes_every_event_exactly_once() {
    let processor = Arc::new(processor(ActionConfig::new("count"), Duration::from_millis(5)));
    let rounds = 5;

    let mut concluded = Vec::new();
    for _ in 0..rounds {
        concluded.extend(run_concurrently(&processor, || random_batch(BATCH_SIZE, 3)));
        sleep(Duration::from_millis(10));
    }
    concluded.extend(drain(&processor));

    let total: u64 = concluded
        .iter()
        .map(|r| r.event().get("aggr._count").and_then(Value::as_u64).unwrap_or(0))
        .sum();
    assert_eq!(total, (rounds * NUM_THREADS * BATCH_SIZE) as u64);
    assert_eq!(processor.group_count(), 0);
}

#[test]
fn put_all_merges_fields_from_every_thread() {
    let processor = Arc::new(processor(ActionConfig::new("put_all"), Duration::from_secs(300)));

    let out = run_concurrently(&processor, || {
        let field = format!("field-{}", rand::random::<u64>());
        vec![record(json!({"first_key": "a", "second_key": 1, field: true}))]
    });
    assert!(out.is_empty());

    let concluded = drain(&processor);
    assert_eq!(concluded.len(), 1);
    let merged = concluded[0].event().data();
    // first_key, second_key and one field per thread
    assert_eq!(merged.len(), 2 + NUM_THREADS);
}

#[test]
fn append_collects_one_value_per_thread() {
    let processor = Arc::new(processor(
        ActionConfig::new("append").with_setting("keys_to_append", json!(["source"])),
        Duration::from_secs(300),
    ));

    let mut next = 0;
    let out = run_concurrently(&processor, || {
        next += 1;
        vec![record(json!({"first_key": "a", "second_key": 1, "source": next}))]
    });
    assert!(out.is_empty());

    let concluded = drain(&processor);
    assert_eq!(concluded.len(), 1);
    let sources = concluded[0].event().get("source").and_then(Value::as_array).cloned().unwrap();
    let distinct: HashSet<String> = sources.iter().map(|v| v.to_string()).collect();
    assert_eq!(sources.len(), NUM_THREADS);
    assert_eq!(distinct.len(), NUM_THREADS);
}
