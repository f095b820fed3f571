//! Call record DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;
use vapi_core::models::CallRecord;

/// Query parameters of `GET /calls`
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CallListParams {
    #[validate(length(min = 1, max = 128))]
    pub assistant_id: String,

    /// Inclusive lower bound on start time (ISO 8601)
    #[serde(default)]
    pub start: Option<String>,

    /// Inclusive upper bound on start time (ISO 8601)
    #[serde(default)]
    pub end: Option<String>,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 1000))]
    pub limit: i64,
}

fn default_limit() -> i64 {
    200
}

/// Call record as returned to the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecordResponse {
    #[serde(flatten)]
    pub record: CallRecord,

    /// Duration as MM:SS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_display: Option<String>,
}

impl From<CallRecord> for CallRecordResponse {
    fn from(record: CallRecord) -> Self {
        Self {
            duration_display: record.display_duration(),
            record,
        }
    }
}
