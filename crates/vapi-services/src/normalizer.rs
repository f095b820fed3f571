//! Record normalizer
//!
//! Maps one upstream payload, whatever its shape, onto a [`NewCallRecord`].
//! Normalization never fails: each field is resolved independently through
//! an ordered alias table and degrades to `None` when nothing usable is found.
//!
//! Alias order is first-non-null-wins. The first alias holding a non-null
//! value decides the field even if that value turns out to be unusable
//! (e.g. an unparseable timestamp); later aliases are not consulted.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;
use tracing::debug;
use vapi_core::models::payload::identifier;
use vapi_core::models::{NewCallRecord, UpstreamPayload};

/// Path into a JSON object, one key per nesting level
pub type FieldPath = &'static [&'static str];

pub const ASSISTANT_ID_ALIASES: &[FieldPath] = &[&["assistantId"], &["parentId"]];

pub const START_TIME_ALIASES: &[FieldPath] = &[
    &["startedAt"],
    &["startTime"],
    &["requestStartedAt"],
    &["createdAt"],
    &["requestBody", "startedAt"],
];

pub const END_TIME_ALIASES: &[FieldPath] = &[
    &["endedAt"],
    &["endTime"],
    &["requestFinishedAt"],
    &["responseBody", "endedAt"],
];

pub const FROM_ALIASES: &[FieldPath] = &[
    &["customer", "number"],
    &["from"],
    &["requestBody", "customer", "number"],
];

pub const TO_ALIASES: &[FieldPath] = &[&["to"], &["requestBody", "to"], &["phoneNumber", "number"]];

pub const DURATION_ALIASES: &[FieldPath] = &[&["durationSeconds"]];

pub const RECORDING_URL_ALIASES: &[FieldPath] = &[
    &["recordingUrl"],
    &["responseBody", "recordingUrl"],
    &["media", "recordingUrl"],
];

pub const TRANSCRIPT_ALIASES: &[FieldPath] = &[
    &["transcript"],
    &["responseBody", "transcript"],
    &["analysis", "transcript"],
];

pub const STATUS_ALIASES: &[FieldPath] = &[&["status"]];

pub const ENDED_REASON_ALIASES: &[FieldPath] = &[&["endedReason"]];

/// Result of normalizing one payload
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: NewCallRecord,
    /// Optional fields that could not be derived from the payload
    pub underived: Vec<&'static str>,
}

/// Follow `path` into `body`, treating JSON `null` as absent
pub fn lookup<'a>(body: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = body;
    for key in path {
        current = current.get(*key)?;
    }
    (!current.is_null()).then_some(current)
}

/// The first alias that holds a non-null value
pub fn first_present<'a>(body: &'a Value, aliases: &[FieldPath]) -> Option<&'a Value> {
    aliases.iter().find_map(|path| lookup(body, path))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Parse an ISO-8601 string or epoch milliseconds
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        }
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Drop U+0000 from every string and key; Postgres text and jsonb reject it
pub fn strip_nul(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(without_nul(s)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nul).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (without_nul(key), strip_nul(value)))
                .collect(),
        ),
        other => other,
    }
}

fn without_nul(s: String) -> String {
    if s.contains('\0') {
        s.replace('\0', "")
    } else {
        s
    }
}

/// An explicit upstream duration, floored to whole non-negative seconds
fn explicit_duration(value: &Value) -> Option<i64> {
    let secs = value.as_f64().filter(|f| f.is_finite())?;
    Some(secs.floor().max(0.0) as i64)
}

/// Whole elapsed seconds between two instants, never negative
pub fn elapsed_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    ((end - start).num_milliseconds() / 1000).max(0)
}

/// Normalize a call-shaped payload.
///
/// `fallback_assistant_id` is used when the payload names no assistant.
pub fn normalize(payload: UpstreamPayload, fallback_assistant_id: &str) -> Normalized {
    let variant = payload.variant();
    let id = without_nul(payload.id().to_string());
    let body = strip_nul(payload.into_body());

    let assistant_id = ASSISTANT_ID_ALIASES
        .iter()
        .find_map(|path| identifier(lookup(&body, path)))
        .unwrap_or_else(|| without_nul(fallback_assistant_id.to_string()));

    let start_time = first_present(&body, START_TIME_ALIASES).and_then(timestamp);
    let end_time = first_present(&body, END_TIME_ALIASES).and_then(timestamp);

    let duration_seconds = match first_present(&body, DURATION_ALIASES) {
        Some(value) if value.is_number() => explicit_duration(value),
        _ => match (start_time, end_time) {
            (Some(start), Some(end)) => Some(elapsed_seconds(start, end)),
            _ => None,
        },
    };

    let text_field = |aliases: &[FieldPath]| first_present(&body, aliases).and_then(text);

    let record = NewCallRecord {
        status: text_field(STATUS_ALIASES),
        ended_reason: text_field(ENDED_REASON_ALIASES),
        from_number: text_field(FROM_ALIASES),
        to_number: text_field(TO_ALIASES),
        start_time,
        end_time,
        duration_seconds,
        recording_url: text_field(RECORDING_URL_ALIASES),
        transcript: text_field(TRANSCRIPT_ALIASES),
        ..NewCallRecord::bare(id, assistant_id, Value::Null)
    };

    let underived = underived_fields(&record);
    if !underived.is_empty() {
        debug!(
            call_id = %record.id,
            variant = variant.as_str(),
            "Fields not derivable from payload: {:?}",
            underived
        );
    }

    Normalized {
        record: NewCallRecord { raw: body, ..record },
        underived,
    }
}

fn underived_fields(record: &NewCallRecord) -> Vec<&'static str> {
    [
        ("status", record.status.is_none()),
        ("endedReason", record.ended_reason.is_none()),
        ("from", record.from_number.is_none()),
        ("to", record.to_number.is_none()),
        ("startTime", record.start_time.is_none()),
        ("endTime", record.end_time.is_none()),
        ("durationSeconds", record.duration_seconds.is_none()),
        ("recordingUrl", record.recording_url.is_none()),
        ("transcript", record.transcript.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, missing)| missing.then_some(name))
    .collect()
}
