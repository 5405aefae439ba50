//! Events and records flowing through the aggregation engine.
//!
//! An [`Event`] is a JSON object payload with a type, a set of tags and an
//! optional [`CompletionHandle`]. A [`Record`] wraps an event together with
//! pass-through metadata owned by the surrounding pipeline.

mod handle;
pub use handle::*;


use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

fn default_event_type() -> String {
    crate::constants::AGGREGATED_EVENT_TYPE.to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default = "default_event_type")]
    event_type: String,

    data: Map<String, Value>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    tags: BTreeSet<String>,

    #[serde(skip)]
    handle: Option<CompletionHandle>,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            tags: BTreeSet::new(),
            handle: None,
        }
    }

    /// Builds an event of the default type from a JSON object
    pub fn from_map(data: Map<String, Value>) -> Self {
        Self::new(default_event_type(), data)
    }

    /// Builds an event from any JSON value; non-object values are stored under `message`.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(data) => Self::from_map(data),
            other => {
                let mut data = Map::new();
                data.insert("message".to_string(), other);
                Self::from_map(data)
            }
        }
    }

    pub fn with_handle(
        mut self,
        handle: CompletionHandle,
    ) -> Self {
        self.handle = Some(handle);
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_map(&self) -> Map<String, Value> {
        self.data.clone()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    /// Looks up a field. `key` is either a top-level name or a `/`-separated
    /// path into nested objects (`/request/user`).
    pub fn get(
        &self,
        key: &str,
    ) -> Option<&Value> {
        let mut segments = path_segments(key);
        let first = segments.next()?;
        let mut current = self.data.get(&first)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(&segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn contains_key(
        &self,
        key: &str,
    ) -> bool {
        self.get(key).is_some()
    }

    /// Writes a field, creating intermediate objects along a `/`-separated path.
    /// Non-object intermediates are replaced.
    pub fn put(
        &mut self,
        key: &str,
        value: Value,
    ) {
        let segments: Vec<String> = path_segments(key).collect();
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.data;
        for segment in parents {
            let slot = current
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return;
            };
            current = map;
        }
        current.insert(last.clone(), value);
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn add_tags<I, S>(
        &mut self,
        tags: I,
    ) where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
    }

    pub fn has_tag(
        &self,
        tag: &str,
    ) -> bool {
        self.tags.contains(tag)
    }

    pub fn event_handle(&self) -> Option<&CompletionHandle> {
        self.handle.as_ref()
    }

    pub fn set_event_handle(
        &mut self,
        handle: CompletionHandle,
    ) {
        self.handle = Some(handle);
    }
}

/// Splits a field key into path segments, unescaping `~1` and `~0`.
fn path_segments(key: &str) -> impl Iterator<Item = String> + '_ {
    key.strip_prefix('/')
        .unwrap_or(key)
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
}

impl PartialEq for Event {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.event_type == other.event_type && self.data == other.data && self.tags == other.tags
    }
}

impl fmt::Debug for Event {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Event")
            .field("event_type", &self.event_type)
            .field("data", &self.data)
            .field("tags", &self.tags)
            .field("handle", &self.handle.as_ref().map(CompletionHandle::id))
            .finish()
    }
}

/// Pass-through metadata attached to a record by the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMetadata {
    attributes: BTreeMap<String, String>,
}

impl RecordMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

/// Unit of work exchanged with the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    event: Event,
    metadata: RecordMetadata,
}

impl Record {
    pub fn new(event: Event) -> Self {
        Self {
            event,
            metadata: RecordMetadata::default(),
        }
    }

    pub fn with_metadata(
        event: Event,
        metadata: RecordMetadata,
    ) -> Self {
        Self { event, metadata }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn metadata(&self) -> &RecordMetadata {
        &self.metadata
    }

    pub fn into_event(self) -> Event {
        self.event
    }

    pub fn into_parts(self) -> (Event, RecordMetadata) {
        (self.event, self.metadata)
    }
}
