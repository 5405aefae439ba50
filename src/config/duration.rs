//! Window length parsing.
//!
//! Accepted forms: bare integer seconds (`180`), integer with a unit suffix
//! (`250ms`, `30s`, `5m`, `2h`) and ISO-8601 time durations (`PT30S`, `PT5M`,
//! `PT1H`). Values always serialize as `<millis>ms`.

use std::fmt;
use std::time::Duration;

use serde::de;
use serde::de::Visitor;
use serde::Deserializer;
use serde::Serializer;

/// Parses a window length. Returns a description of the problem on failure.
pub fn parse_duration(input: &str) -> std::result::Result<Duration, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("duration cannot be empty".to_string());
    }

    if let Some(iso) = trimmed.strip_prefix("PT").or_else(|| trimmed.strip_prefix("pt")) {
        return parse_with_unit(iso, true).ok_or_else(|| format!("invalid ISO-8601 duration: {input}"));
    }

    parse_with_unit(trimmed, false).ok_or_else(|| format!("invalid duration: {input}"))
}

fn parse_with_unit(
    value: &str,
    iso: bool,
) -> Option<Duration> {
    let split = value.find(|c: char| !c.is_ascii_digit()).unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let number: u64 = number.parse().ok()?;

    let duration = match (unit.to_ascii_lowercase().as_str(), iso) {
        ("", false) | ("s", _) => Duration::from_secs(number),
        ("ms", false) => Duration::from_millis(number),
        ("m", _) => Duration::from_secs(number.checked_mul(60)?),
        ("h", _) => Duration::from_secs(number.checked_mul(3600)?),
        _ => return None,
    };
    Some(duration)
}

pub fn serialize<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
    deserializer.deserialize_any(DurationVisitor)
}

struct DurationVisitor;

impl Visitor<'_> for DurationVisitor {
    type Value = Duration;

    fn expecting(
        &self,
        f: &mut fmt::Formatter,
    ) -> fmt::Result {
        f.write_str("integer seconds or a duration string such as \"30s\" or \"PT30S\"")
    }

    fn visit_u64<E: de::Error>(
        self,
        v: u64,
    ) -> std::result::Result<Duration, E> {
        Ok(Duration::from_secs(v))
    }

    fn visit_i64<E: de::Error>(
        self,
        v: i64,
    ) -> std::result::Result<Duration, E> {
        u64::try_from(v)
            .map(Duration::from_secs)
            .map_err(|_| E::custom(format!("duration cannot be negative: {v}")))
    }

    fn visit_str<E: de::Error>(
        self,
        v: &str,
    ) -> std::result::Result<Duration, E> {
        parse_duration(v).map_err(E::custom)
    }
}
