//! Call record query handlers
//!
//! Read side consumed by the dashboard.

use crate::dto::{ApiResponse, CallListParams, CallRecordResponse};
use actix_web::{
    web::{self, Data, Json, Path, Query},
    Result,
};
use tracing::{debug, info, instrument, warn};
use validator::Validate;
use vapi_core::{models::CallRecordFilter, AppError};
use vapi_services::{reconciler::parse_bound, CallSyncService};

/// List stored calls for an assistant, newest first
///
/// # Errors
///
/// 400 for invalid parameters or malformed bounds.
///
/// # Examples
///
/// ```text
/// GET /api/v1/calls?assistantId=A1&start=2025-08-01T00:00:00Z&limit=50
/// ```
#[instrument(skip(service, query))]
pub async fn list_calls(
    query: Query<CallListParams>,
    service: Data<CallSyncService>,
) -> Result<Json<ApiResponse<Vec<CallRecordResponse>>>> {
    query.validate().map_err(|e| {
        warn!("Invalid query parameters: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let filter = CallRecordFilter {
        assistant_id: query.assistant_id.clone(),
        start: parse_bound("start", query.start.as_deref())?,
        end: parse_bound("end", query.end.as_deref())?,
        limit: query.limit,
    };
    debug!("Listing calls: {:?}", filter);

    let calls: Vec<CallRecordResponse> = service
        .list_calls(&filter)
        .await?
        .into_iter()
        .map(CallRecordResponse::from)
        .collect();

    info!("Retrieved {} calls for assistant {}", calls.len(), filter.assistant_id);

    Ok(Json(ApiResponse::success(calls)))
}

/// Get a single call by upstream id
///
/// # Errors
///
/// 404 if the call was never ingested.
#[instrument(skip(service))]
pub async fn get_call(
    path: Path<String>,
    service: Data<CallSyncService>,
) -> Result<Json<ApiResponse<CallRecordResponse>>> {
    let call_id = path.into_inner();
    let call = service.get_call(&call_id).await?;
    Ok(Json(ApiResponse::success(CallRecordResponse::from(call))))
}

/// Configure call query routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/calls")
            .route("", web::get().to(list_calls))
            .route("/{id}", web::get().to(get_call)),
    );
}
