//! Group keys.
//!
//! A [`GroupKey`] is the structural identity of a group: for every configured
//! field, the event's value (or `null` when absent). Two events land in the
//! same group iff all of their configured fields compare equal.


use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use serde_json::Map;
use serde_json::Value;

use crate::Event;

#[derive(Clone, PartialEq, Eq)]
pub struct GroupKey {
    fields: Vec<(String, Value)>,
}

impl GroupKey {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    /// Value for a configured field. `Some(Value::Null)` when the event lacked it.
    pub fn get(
        &self,
        field: &str,
    ) -> Option<&Value> {
        self.fields.iter().find(|(name, _)| name == field).map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field name to value mapping. Path-style names (`/a/b`) are kept verbatim.
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields.iter().map(|(name, value)| (name.clone(), value.clone())).collect()
    }
}

impl Hash for GroupKey {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.fields.len().hash(state);
        for (name, value) in &self.fields {
            name.hash(state);
            hash_value(value, state);
        }
    }
}

/// `serde_json::Value` is `Eq` but not `Hash`; hash it structurally so that
/// equal values always hash alike.
fn hash_value<H: Hasher>(
    value: &Value,
    state: &mut H,
) {
    match value {
        Value::Null => 0u8.hash(state),
        Value::Bool(b) => {
            1u8.hash(state);
            b.hash(state);
        }
        Value::Number(n) => {
            2u8.hash(state);
            n.to_string().hash(state);
        }
        Value::String(s) => {
            3u8.hash(state);
            s.hash(state);
        }
        Value::Array(items) => {
            4u8.hash(state);
            items.len().hash(state);
            for item in items {
                hash_value(item, state);
            }
        }
        Value::Object(map) => {
            5u8.hash(state);
            map.len().hash(state);
            for (k, v) in map {
                k.hash(state);
                hash_value(v, state);
            }
        }
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_map().entries(self.fields.iter().map(|(k, v)| (k, v))).finish()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", Value::Object(self.to_map()))
    }
}

/// Derives [`GroupKey`]s from events using the configured `group_by_keys`.
#[derive(Debug, Clone)]
pub struct GroupKeyBuilder {
    fields: Vec<String>,
}

impl GroupKeyBuilder {
    pub fn new(fields: Vec<String>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Never fails: missing fields contribute `null`.
    pub fn build(
        &self,
        event: &Event,
    ) -> GroupKey {
        let fields = self
            .fields
            .iter()
            .map(|field| (field.clone(), event.get(field).cloned().unwrap_or(Value::Null)))
            .collect();
        GroupKey::new(fields)
    }
}
