//! Webhook handler
//!
//! Push delivery of a single call from the upstream platform. The sender
//! retries on any non-success response.

use super::WEBHOOK_SECRET_HEADER;
use crate::dto::WebhookAck;
use actix_web::{
    web::{self, Bytes, Data, Json},
    HttpRequest, Result,
};
use tracing::{debug, instrument};
use vapi_services::CallSyncService;

/// Receive one call
///
/// The body is taken raw so the shared secret can be checked before it is
/// parsed.
///
/// # Errors
///
/// 401 on secret mismatch, 400 when `id` or `assistantId` is missing,
/// 500 when the storage write fails.
#[instrument(skip(req, body, service))]
pub async fn receive_webhook(
    req: HttpRequest,
    body: Bytes,
    service: Data<CallSyncService>,
) -> Result<Json<WebhookAck>> {
    let secret = req
        .headers()
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());

    let stored = service.ingest_webhook(secret, &body).await?;
    debug!("Webhook stored call {}", stored.id());

    Ok(Json(WebhookAck::accepted()))
}

/// Configure webhook routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/vapi/webhook", web::post().to(receive_webhook));
}
