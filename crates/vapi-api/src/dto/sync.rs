//! Ingress DTOs for pull-sync and webhook delivery

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Query parameters of `GET /vapi/sync`
///
/// Every field is optional at the wire level so a missing `assistantId`
/// surfaces as a validation error rather than a query parse failure.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SyncParams {
    #[validate(length(max = 128))]
    pub assistant_id: Option<String>,

    /// Inclusive lower bound (ISO 8601)
    #[validate(length(max = 64))]
    pub start: Option<String>,

    /// Inclusive upper bound (ISO 8601)
    #[validate(length(max = 64))]
    pub end: Option<String>,
}

/// Pull-sync result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResponse {
    pub upserted: usize,
}

/// Webhook acknowledgment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookAck {
    pub ok: bool,
}

impl WebhookAck {
    pub fn accepted() -> Self {
        Self { ok: true }
    }
}
