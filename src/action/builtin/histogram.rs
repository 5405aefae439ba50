use std::time::SystemTime;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use super::attach_event_handle;
use super::concluded_event;
use crate::constants::DEFAULT_GENERATED_KEY_PREFIX;
use crate::utils::time::system_time_to_millis;
use crate::ActionError;
use crate::ActionResult;
use crate::AggregateAction;
use crate::AggregateActionInput;
use crate::AggregateActionOutput;
use crate::AggregateActionResponse;
use crate::Event;
use crate::GroupState;

pub const HISTOGRAM_ACTION: &str = "histogram";

/// Outer bounds of the first and last bucket
const BUCKET_LIMIT: f64 = f32::MAX as f64;

fn default_generated_key_prefix() -> String {
    DEFAULT_GENERATED_KEY_PREFIX.to_string()
}

/// Settings of the `histogram` action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistogramActionConfig {
    /// Field holding the numeric value to record
    pub key: String,

    /// Upper bounds of the buckets, strictly increasing. Values below the
    /// first bound and at or above the last get a bucket of their own.
    pub buckets: Vec<f64>,

    /// Unit of the recorded values, copied to the output when set
    #[serde(default)]
    pub units: Option<String>,

    /// Prefix of every field the action writes
    #[serde(default = "default_generated_key_prefix")]
    pub generated_key_prefix: String,

    /// Also track the smallest and largest value
    #[serde(default)]
    pub record_minmax: bool,
}

impl HistogramActionConfig {
    pub fn validate(&self) -> ActionResult<()> {
        let invalid = |reason: &str| ActionError::InvalidSettings {
            action: HISTOGRAM_ACTION.to_string(),
            reason: reason.to_string(),
        };
        if self.key.trim().is_empty() {
            return Err(invalid("key cannot be empty"));
        }
        if self.buckets.is_empty() {
            return Err(invalid("buckets must contain at least one bound"));
        }
        if self.buckets.iter().any(|bound| !bound.is_finite()) {
            return Err(invalid("bucket bounds must be finite"));
        }
        if self.buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(invalid("bucket bounds must be strictly increasing"));
        }
        Ok(())
    }

    fn generated_key(
        &self,
        name: &str,
    ) -> String {
        format!("{}{}", self.generated_key_prefix, name)
    }
}

/// Running totals of one window, kept in the group state as JSON.
#[derive(Debug)]
struct HistogramState {
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    bucket_counts: Vec<u64>,
}

/// Summarizes a numeric field over each window: count, sum, optional
/// min/max and per-bucket counts. Events lacking a numeric value are
/// skipped but still acknowledged with the window.
#[derive(Debug, Clone)]
pub struct HistogramAction {
    config: HistogramActionConfig,
}

impl HistogramAction {
    pub fn new(config: HistogramActionConfig) -> Self {
        Self { config }
    }

    /// Index of the bucket `value` falls into
    fn bucket_index(
        &self,
        value: f64,
    ) -> usize {
        self.config.buckets.partition_point(|bound| *bound <= value)
    }

    fn load(
        &self,
        state: &GroupState,
    ) -> HistogramState {
        let number = |name: &str| state.get(&self.config.generated_key(name)).and_then(Value::as_f64);
        let bucket_counts = state
            .get(&self.config.generated_key("bucket_counts"))
            .and_then(Value::as_array)
            .map(|counts| counts.iter().map(|c| c.as_u64().unwrap_or(0)).collect())
            .unwrap_or_else(|| vec![0; self.config.buckets.len() + 1]);

        HistogramState {
            count: state.get(&self.config.generated_key("count")).and_then(Value::as_u64).unwrap_or(0),
            sum: number("sum").unwrap_or(0.0),
            min: number("min").unwrap_or(f64::INFINITY),
            max: number("max").unwrap_or(f64::NEG_INFINITY),
            bucket_counts,
        }
    }

    fn store(
        &self,
        histogram: &HistogramState,
        state: &mut GroupState,
    ) {
        state.insert(self.config.generated_key("count"), Value::from(histogram.count));
        state.insert(self.config.generated_key("sum"), Value::from(histogram.sum));
        if self.config.record_minmax {
            state.insert(self.config.generated_key("min"), Value::from(histogram.min));
            state.insert(self.config.generated_key("max"), Value::from(histogram.max));
        }
        state.insert(self.config.generated_key("bucket_counts"), json!(histogram.bucket_counts));
    }

    /// `{min, max, count}` per bucket, the outer buckets bounded by `±f32::MAX`.
    fn buckets(
        &self,
        bucket_counts: &[u64],
    ) -> Value {
        let bounds = &self.config.buckets;
        let buckets: Vec<Value> = bucket_counts
            .iter()
            .enumerate()
            .map(|(i, count)| {
                let min = if i == 0 { -BUCKET_LIMIT } else { bounds[i - 1] };
                let max = bounds.get(i).copied().unwrap_or(BUCKET_LIMIT);
                json!({"min": min, "max": max, "count": count})
            })
            .collect();
        Value::Array(buckets)
    }
}

impl AggregateAction for HistogramAction {
    fn handle_event(
        &self,
        event: &Event,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionResponse> {
        attach_event_handle(event, input);

        let Some(value) = event.get(&self.config.key).and_then(Value::as_f64).filter(|v| v.is_finite()) else {
            debug!(key = %self.config.key, "event has no numeric value for histogram, skipping");
            return Ok(AggregateActionResponse::null_event());
        };

        let started_at = system_time_to_millis(input.window_started_at());
        let mut histogram = self.load(input.group_state());
        histogram.count += 1;
        histogram.sum += value;
        histogram.min = histogram.min.min(value);
        histogram.max = histogram.max.max(value);
        let bucket = self.bucket_index(value);
        histogram.bucket_counts[bucket] += 1;

        let state = input.group_state_mut();
        self.store(&histogram, state);
        state
            .entry(self.config.generated_key("start_time"))
            .or_insert_with(|| Value::from(started_at));

        Ok(AggregateActionResponse::null_event())
    }

    fn conclude_group(
        &self,
        input: &mut AggregateActionInput<'_>,
    ) -> ActionResult<AggregateActionOutput> {
        if input.group_state().is_empty() {
            return Ok(AggregateActionOutput::empty());
        }

        let histogram = self.load(input.group_state());
        let started_at = system_time_to_millis(input.window_started_at());
        let duration = system_time_to_millis(SystemTime::now()).saturating_sub(started_at);

        let mut event = Event::from_map(Map::new());
        for (field, value) in input.identification_keys().iter() {
            event.put(field, value.clone());
        }
        let mut data = event.into_map();
        data.extend(input.group_state().to_map());
        data.insert(self.config.generated_key("key"), Value::from(self.config.key.clone()));
        data.insert(self.config.generated_key("buckets"), self.buckets(&histogram.bucket_counts));
        data.insert(self.config.generated_key("duration"), Value::from(duration));
        if let Some(units) = &self.config.units {
            data.insert(self.config.generated_key("units"), Value::from(units.clone()));
        }

        Ok(AggregateActionOutput::new(vec![concluded_event(data, input)]))
    }

    fn holds_events(&self) -> bool {
        true
    }
}
