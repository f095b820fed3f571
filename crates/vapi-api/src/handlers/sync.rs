//! Pull-sync handler
//!
//! Caller-triggered synchronization of one assistant's calls from the
//! upstream platform into storage.

use crate::dto::{SyncParams, SyncResponse};
use actix_web::{
    web::{self, Data, Json, Query},
    Result,
};
use tracing::{info, instrument, warn};
use validator::Validate;
use vapi_core::AppError;
use vapi_services::{CallSyncService, SyncWindow};

/// Sync calls for an assistant
///
/// Upstream emptiness or failure is reported as `{"upserted": 0}`.
///
/// # Errors
///
/// 400 for a missing `assistantId` or malformed bounds, 500 when the upstream
/// credential is not configured or the storage write fails.
///
/// # Examples
///
/// ```text
/// GET /api/v1/vapi/sync?assistantId=A1&start=2025-08-01T00:00:00Z
/// ```
#[instrument(skip(service, query))]
pub async fn sync_calls(
    query: Query<SyncParams>,
    service: Data<CallSyncService>,
) -> Result<Json<SyncResponse>> {
    query.validate().map_err(|e| {
        warn!("Invalid sync parameters: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let window = SyncWindow::parse(
        query.assistant_id.as_deref(),
        query.start.as_deref(),
        query.end.as_deref(),
    )?;

    let report = service.pull_sync(&window).await?;

    info!(
        "Sync for assistant {} upserted {} records",
        window.assistant_id, report.upserted
    );

    Ok(Json(SyncResponse {
        upserted: report.upserted,
    }))
}

/// Configure pull-sync routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/vapi/sync", web::get().to(sync_calls));
}
