use std::sync::Arc;
use std::time::Duration;

use d_aggregate::ActionConfig;
use d_aggregate::AggregateAction;
use d_aggregate::AggregateActionInput;
use d_aggregate::AggregateActionOutput;
use d_aggregate::AggregateActionResponse;
use d_aggregate::ActionFactory;
use d_aggregate::ActionResult;
use d_aggregate::AggregateProcessor;
use d_aggregate::AggregateProcessorConfig;
use d_aggregate::CompletionHandle;
use d_aggregate::Event;
use d_aggregate::Record;
use d_aggregate::ShutdownState;
use serde_json::json;

use crate::commons::drain;
use crate::commons::processor;
use crate::commons::record;

/// Emits one event per window listing the `n` values it saw, and concludes
/// as soon as three events arrived.
struct BatchOfThree;

impl AggregateAction for BatchOfThree {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        let state = input.group_state_mut();
        let mut seen = state.get("seen").and_then(|v| v.as_array()).cloned().unwrap_or_default();
        seen.push(event.get("n").cloned().unwrap_or_default());
        let full = seen.len() >= 3;
        state.insert("seen".to_string(), json!(seen));
        if full {
            input.set_custom_should_conclude(|_| true);
        }
        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        let mut data = input.identification_keys().to_map();
        data.extend(input.group_state().to_map());
        Ok(AggregateActionOutput::new(vec![
            Event::from_map(data).with_handle(input.completion_handle().clone()),
        ]))
    }

    fn holds_events(&self) -> bool {
        true
    }
}

#[test]
fn custom_action_registered_in_factory_concludes_on_its_own_condition() {
    let mut factory = ActionFactory::with_builtins();
    factory.register("batch_of_three", |_| {
        let action: Arc<dyn AggregateAction> = Arc::new(BatchOfThree);
        Ok(action)
    });
    let processor = AggregateProcessor::builder(AggregateProcessorConfig {
        group_by_keys: vec!["user".to_string()],
        window: Duration::from_secs(3600),
        action: ActionConfig::new("batch_of_three"),
        ..Default::default()
    })
    .action_factory(factory)
    .build()
    .unwrap();

    let batch = |from: i64| -> Vec<Record> { (from..from + 3).map(|n| record(json!({"user": "a", "n": n}))).collect() };

    assert!(processor.execute(batch(0)).unwrap().is_empty());
    let out = processor.execute(batch(3)).unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].event().get("seen"), Some(&json!([0, 1, 2])));
    // The second batch landed in a fresh window
    assert_eq!(processor.group_count(), 1);
    let rest = drain(&processor);
    assert_eq!(rest[0].event().get("seen"), Some(&json!([3, 4, 5])));
}

#[test]
fn input_acknowledgements_wait_for_aggregated_output() {
    let processor = processor(ActionConfig::new("count"), Duration::from_secs(3600));
    let handles: Vec<_> = (0..4).map(|_| CompletionHandle::new()).collect();

    let records = handles
        .iter()
        .map(|h| Record::new(Event::from_value(json!({"first_key": "a", "second_key": 1})).with_handle(h.clone())))
        .collect();
    processor.execute(records).unwrap();
    assert!(handles.iter().all(|h| !h.is_released()));

    let out = drain(&processor);
    assert_eq!(out.len(), 1);
    out[0].event().event_handle().unwrap().release(false);

    assert!(handles.iter().all(|h| h.outcome() == Some(false)));
}

#[test]
fn shutdown_protocol_moves_through_all_states() {
    let processor = processor(ActionConfig::new("put_all"), Duration::from_secs(3600));
    processor
        .execute(vec![
            record(json!({"first_key": "a", "second_key": 1})),
            record(json!({"first_key": "b", "second_key": 2})),
        ])
        .unwrap();

    assert_eq!(processor.shutdown_state(), ShutdownState::Running);
    processor.prepare_for_shutdown();
    assert_eq!(processor.shutdown_state(), ShutdownState::Draining);
    assert!(!processor.is_ready_for_shutdown());

    // Events arriving while draining are concluded by the next sweep
    let out = processor.execute(vec![record(json!({"first_key": "c", "second_key": 3}))]).unwrap();
    assert_eq!(out.len(), 2);
    assert!(!processor.is_ready_for_shutdown());

    let out = processor.execute(Vec::new()).unwrap();
    assert_eq!(out.len(), 1);
    assert!(processor.is_ready_for_shutdown());
    assert_eq!(processor.shutdown_state(), ShutdownState::Ready);
    processor.shutdown();
}

#[test]
fn processor_builds_from_override_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("aggregate.toml");
    std::fs::write(
        &config_path,
        r#"
        group_by_keys = ["/request/user"]
        window = "PT1M"

        [action]
        name = "count"

        [action.settings]
        count_key = "requests"
        "#,
    )
    .unwrap();

    let config = AggregateProcessorConfig::default()
        .with_override_config(config_path.to_str().unwrap())
        .unwrap();
    let processor = AggregateProcessor::builder(config).build().unwrap();

    processor
        .execute(vec![
            record(json!({"request": {"user": "a"}})),
            record(json!({"request": {"user": "a"}})),
            record(json!({"request": {"user": "b"}})),
        ])
        .unwrap();
    let mut out = drain(&processor);
    out.sort_by_key(|r| r.event().get("/request/user").map(|v| v.to_string()));

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].event().get("/request/user"), Some(&json!("a")));
    assert_eq!(out[0].event().get("requests"), Some(&json!(2)));
    assert_eq!(out[1].event().get("requests"), Some(&json!(1)));
}
