use serde_json::Map;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::AggregateActionInput;
use crate::Event;
use crate::Group;
use crate::GroupKey;
use crate::Record;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// Event from a `json!({...})` literal
pub fn event(value: Value) -> Event {
    Event::from_map(object(value))
}

pub fn record(value: Value) -> Record {
    Record::new(event(value))
}

/// Group key from a `json!({...})` literal; fields end up sorted by name
pub fn group_key(value: Value) -> GroupKey {
    GroupKey::new(object(value).into_iter().collect())
}

/// Runs `f` with an action input over `group`, holding its handle gate.
pub fn with_input<R>(
    key: &GroupKey,
    group: &Group,
    f: impl FnOnce(&mut AggregateActionInput<'_>) -> R,
) -> R {
    let mut guard = group.lock_handle();
    let mut input = AggregateActionInput::new(key, &mut guard);
    f(&mut input)
}
