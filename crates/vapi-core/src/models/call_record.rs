//! Canonical call record model
//!
//! One record per upstream call, keyed by the upstream call id. Every
//! ingestion path (pull-sync and webhook) produces the same shape.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized call, ready to be merged into storage.
///
/// Carries no bookkeeping timestamps: `created_at`/`updated_at` belong to
/// the writer, which knows whether the record already exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCallRecord {
    /// Upstream call identifier, the storage key
    pub id: String,

    /// Owning assistant; partition key for range queries
    pub assistant_id: String,

    /// Upstream lifecycle state
    pub status: Option<String>,

    pub ended_reason: Option<String>,

    /// Caller number
    #[serde(rename = "from")]
    pub from_number: Option<String>,

    /// Callee / line number
    #[serde(rename = "to")]
    pub to_number: Option<String>,

    pub start_time: Option<DateTime<Utc>>,

    pub end_time: Option<DateTime<Utc>>,

    /// Whole seconds, never negative
    pub duration_seconds: Option<i64>,

    pub recording_url: Option<String>,

    pub transcript: Option<String>,

    /// The full upstream payload this record was derived from
    pub raw: Value,
}

impl NewCallRecord {
    /// A record with only the identity fields and the raw payload set
    pub fn bare(id: impl Into<String>, assistant_id: impl Into<String>, raw: Value) -> Self {
        Self {
            id: id.into(),
            assistant_id: assistant_id.into(),
            status: None,
            ended_reason: None,
            from_number: None,
            to_number: None,
            start_time: None,
            end_time: None,
            duration_seconds: None,
            recording_url: None,
            transcript: None,
            raw,
        }
    }

    /// Stamp as a first insert at `now`
    pub fn into_inserted(self, now: DateTime<Utc>) -> CallRecord {
        CallRecord {
            record: self,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A stored call record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    #[serde(flatten)]
    pub record: NewCallRecord,

    /// Set once, on first write
    pub created_at: DateTime<Utc>,

    /// Advances on every write
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    #[inline]
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Merge a newer normalization of the same call into this record.
    ///
    /// Present fields overwrite, absent fields keep the stored value, `raw`
    /// always overwrites and `created_at` never changes.
    pub fn merge(&mut self, incoming: NewCallRecord, now: DateTime<Utc>) {
        let stored = &mut self.record;
        stored.assistant_id = incoming.assistant_id;
        merge_field(&mut stored.status, incoming.status);
        merge_field(&mut stored.ended_reason, incoming.ended_reason);
        merge_field(&mut stored.from_number, incoming.from_number);
        merge_field(&mut stored.to_number, incoming.to_number);
        merge_field(&mut stored.start_time, incoming.start_time);
        merge_field(&mut stored.end_time, incoming.end_time);
        merge_field(&mut stored.duration_seconds, incoming.duration_seconds);
        merge_field(&mut stored.recording_url, incoming.recording_url);
        merge_field(&mut stored.transcript, incoming.transcript);
        stored.raw = incoming.raw;
        self.updated_at = next_update_stamp(self.updated_at, now);
    }

    /// Format duration as MM:SS for display
    pub fn display_duration(&self) -> Option<String> {
        self.record
            .duration_seconds
            .map(|secs| format!("{:02}:{:02}", secs / 60, secs % 60))
    }
}

fn merge_field<T>(stored: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *stored = incoming;
    }
}

/// Next `updated_at` value: `now`, but always strictly after `previous`
pub fn next_update_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::microseconds(1);
    if now > previous {
        now
    } else {
        floor
    }
}

/// Range query over stored records for one assistant
#[derive(Debug, Clone)]
pub struct CallRecordFilter {
    pub assistant_id: String,
    /// Inclusive lower bound on `start_time`
    pub start: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `start_time`
    pub end: Option<DateTime<Utc>>,
    pub limit: i64,
}
