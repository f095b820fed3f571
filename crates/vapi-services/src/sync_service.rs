//! Call sync service
//!
//! Entry points behind the ingress handlers. Pull-sync goes through the
//! reconciler; webhook deliveries skip it. Both end in the normalizer and a
//! single batch write.

use crate::normalizer::normalize;
use crate::reconciler::{SourceOrigin, SourceReconciler, SyncWindow};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use vapi_core::config::UpstreamConfig;
use vapi_core::models::payload::identifier;
use vapi_core::models::{CallRecord, CallRecordFilter, NewCallRecord, UpstreamPayload};
use vapi_core::traits::{CallRecordRepository, CallSource};
use vapi_core::{AppError, AppResult};

/// Outcome of one pull-sync
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub upserted: usize,
    pub origin: SourceOrigin,
}

/// Orchestrates ingestion and read access for call records
pub struct CallSyncService {
    reconciler: SourceReconciler,
    repository: Arc<dyn CallRecordRepository>,
    webhook_secret: Option<String>,
}

impl CallSyncService {
    /// Create a new sync service
    ///
    /// The webhook secret and page size are taken from `config` once, here.
    pub fn new(
        source: Arc<dyn CallSource>,
        repository: Arc<dyn CallRecordRepository>,
        config: &UpstreamConfig,
    ) -> Self {
        Self {
            reconciler: SourceReconciler::new(source, config.effective_page_size()),
            repository,
            webhook_secret: config.webhook_secret().map(str::to_string),
        }
    }

    /// Fetch, normalize and upsert the calls of one assistant.
    ///
    /// Upstream emptiness or failure is a successful sync of zero records.
    ///
    /// # Errors
    ///
    /// `AppError::Config` when no upstream credential is configured, a
    /// storage error when the batch write fails.
    #[instrument(skip(self), fields(assistant_id = %window.assistant_id))]
    pub async fn pull_sync(&self, window: &SyncWindow) -> AppResult<SyncReport> {
        info!("Starting pull-sync: start={:?}, end={:?}", window.start, window.end);

        let reconciled = self.reconciler.collect(window).await.map_err(|e| {
            error!("Pull-sync aborted: {}", e);
            e
        })?;

        let records: Vec<NewCallRecord> = reconciled
            .payloads
            .into_iter()
            .map(|payload| normalize(payload, &window.assistant_id).record)
            .collect();

        let upserted = self.repository.upsert_batch(&records).await?;

        info!(
            "Pull-sync completed: {} records upserted from {:?}",
            upserted, reconciled.origin
        );

        Ok(SyncReport {
            upserted,
            origin: reconciled.origin,
        })
    }

    /// Check the shared secret of a webhook delivery.
    ///
    /// Without a configured secret every delivery is accepted.
    pub fn verify_webhook_secret(&self, presented: Option<&str>) -> AppResult<()> {
        let Some(expected) = self.webhook_secret.as_deref() else {
            return Ok(());
        };

        match presented {
            Some(secret) if secret == expected => Ok(()),
            Some(_) => {
                warn!("Webhook rejected: secret mismatch");
                Err(AppError::Unauthorized("invalid webhook secret".to_string()))
            }
            None => {
                warn!("Webhook rejected: secret header missing");
                Err(AppError::Unauthorized("missing webhook secret".to_string()))
            }
        }
    }

    /// Ingest one pushed call.
    ///
    /// The secret is checked before the body is looked at; a body without
    /// both `id` and `assistantId` is rejected without writing anything.
    #[instrument(skip(self, secret, body), fields(bytes = body.len()))]
    pub async fn ingest_webhook(&self, secret: Option<&str>, body: &[u8]) -> AppResult<CallRecord> {
        self.verify_webhook_secret(secret)?;

        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| AppError::Validation(format!("body is not valid JSON: {}", e)))?;
        if !payload.is_object() {
            return Err(AppError::Validation("body must be a JSON object".to_string()));
        }

        let assistant_id = identifier(payload.get("assistantId"))
            .ok_or_else(|| AppError::MissingField("assistantId".to_string()))?;
        let payload = UpstreamPayload::from_call(payload)
            .ok_or_else(|| AppError::MissingField("id".to_string()))?;

        let normalized = normalize(payload, &assistant_id);
        let id = normalized.record.id.clone();
        debug!("Webhook call {} normalized", id);

        self.repository.upsert_batch(&[normalized.record]).await?;

        let stored = self
            .repository
            .find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("call {} missing after write", id)))?;

        info!("Webhook call {} stored", id);
        Ok(stored)
    }

    /// Stored records for one assistant, newest first
    #[instrument(skip(self))]
    pub async fn list_calls(&self, filter: &CallRecordFilter) -> AppResult<Vec<CallRecord>> {
        self.repository.list_by_assistant(filter).await
    }

    /// One stored record
    ///
    /// # Errors
    ///
    /// `AppError::NotFound` if no call with this id was ever ingested.
    #[instrument(skip(self))]
    pub async fn get_call(&self, id: &str) -> AppResult<CallRecord> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("call {} not found", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{InMemoryCallRecordRepository, StaticCallSource};
    use serde_json::json;
    use vapi_core::UpstreamError;

    fn service(
        source: StaticCallSource,
        secret: Option<&str>,
    ) -> (CallSyncService, Arc<InMemoryCallRecordRepository>) {
        let repo = Arc::new(InMemoryCallRecordRepository::new());
        let config = UpstreamConfig {
            api_key: Some("test-key".to_string()),
            webhook_secret: secret.map(str::to_string),
            ..Default::default()
        };
        let service = CallSyncService::new(Arc::new(source), repo.clone(), &config);
        (service, repo)
    }

    fn service_with_repo(
        source: StaticCallSource,
        repo: Arc<InMemoryCallRecordRepository>,
    ) -> (CallSyncService, Arc<InMemoryCallRecordRepository>) {
        let config = UpstreamConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let service = CallSyncService::new(Arc::new(source), repo.clone(), &config);
        (service, repo)
    }

    fn window(assistant_id: &str) -> SyncWindow {
        SyncWindow::parse(Some(assistant_id), None, None).unwrap()
    }

    fn log_entry() -> Value {
        json!({
            "callId": "c1",
            "startedAt": "2025-08-20T16:36:17Z",
            "endedAt": "2025-08-20T16:37:26Z",
            "customer": {"number": "+1555"}
        })
    }

    #[tokio::test]
    async fn test_pull_sync_end_to_end() {
        let (service, repo) = service(StaticCallSource::new(Ok(vec![log_entry()]), Ok(vec![])), None);

        let report = service.pull_sync(&window("A1")).await.unwrap();
        assert_eq!(report.upserted, 1);
        assert_eq!(report.origin, SourceOrigin::Logs);

        let stored = repo.get("c1").unwrap();
        assert_eq!(stored.record.assistant_id, "A1");
        assert_eq!(stored.record.from_number.as_deref(), Some("+1555"));
        assert_eq!(stored.record.duration_seconds, Some(69));
        assert_eq!(stored.record.raw, log_entry());
    }

    #[tokio::test]
    async fn test_repeated_sync_is_idempotent() {
        let (service, repo) = service(StaticCallSource::new(Ok(vec![log_entry()]), Ok(vec![])), None);

        service.pull_sync(&window("A1")).await.unwrap();
        let first = repo.get("c1").unwrap();
        service.pull_sync(&window("A1")).await.unwrap();
        let second = repo.get("c1").unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(second.record, first.record);
    }

    #[tokio::test]
    async fn test_empty_upstream_syncs_nothing() {
        let source = StaticCallSource::new(
            Err(UpstreamError::Http {
                status: 401,
                body: "unauthorized".to_string(),
            }),
            Err(UpstreamError::Transport("timeout".to_string())),
        );
        let (service, repo) = service(source, None);

        let report = service.pull_sync(&window("A1")).await.unwrap();
        assert_eq!(report.upserted, 0);
        assert_eq!(report.origin, SourceOrigin::None);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let (service, repo) = service(StaticCallSource::unconfigured(), None);

        let err = service.pull_sync(&window("A1")).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let (service, repo) = service(StaticCallSource::new(Ok(vec![log_entry()]), Ok(vec![])), None);
        repo.fail_writes(true);

        let err = service.pull_sync(&window("A1")).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.public_message(), "storage error");
    }

    #[tokio::test]
    async fn test_fallback_records_use_requested_assistant() {
        let source = StaticCallSource::new(
            Ok(vec![]),
            Ok(vec![json!({"id": "c7", "customer": {"number": "+1999"}})]),
        );
        let (service, repo) = service(source, None);

        let report = service.pull_sync(&window("A2")).await.unwrap();
        assert_eq!(report.origin, SourceOrigin::Calls);
        assert_eq!(repo.get("c7").unwrap().record.assistant_id, "A2");
    }

    #[tokio::test]
    async fn test_call_entry_merges_with_record_seen_in_logs() {
        let (service, repo) = service(StaticCallSource::new(Ok(vec![log_entry()]), Ok(vec![])), None);
        service.pull_sync(&window("A1")).await.unwrap();

        let (fallback, _) = service_with_repo(
            StaticCallSource::new(
                Ok(vec![]),
                Ok(vec![json!({"id": "row-7", "callId": "c1", "status": "ended"})]),
            ),
            repo.clone(),
        );
        fallback.pull_sync(&window("A1")).await.unwrap();

        assert_eq!(repo.len(), 1);
        let stored = repo.get("c1").unwrap();
        assert_eq!(stored.record.status.as_deref(), Some("ended"));
        assert_eq!(stored.record.from_number.as_deref(), Some("+1555"));
    }

    #[tokio::test]
    async fn test_webhook_requires_secret_when_configured() {
        let (service, repo) = service(StaticCallSource::empty(), Some("s3cret"));
        let body = br#"{"id": "c1", "assistantId": "A1"}"#;

        let err = service.ingest_webhook(None, body).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = service.ingest_webhook(Some("wrong"), body).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(repo.is_empty());

        let stored = service.ingest_webhook(Some("s3cret"), body).await.unwrap();
        assert_eq!(stored.id(), "c1");
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn test_webhook_rejects_before_parsing_when_unauthorized() {
        let (service, _repo) = service(StaticCallSource::empty(), Some("s3cret"));

        let err = service.ingest_webhook(None, b"not json").await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_webhook_validates_identity_fields() {
        let (service, repo) = service(StaticCallSource::empty(), None);

        let err = service
            .ingest_webhook(None, br#"{"id": "c1"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        let err = service
            .ingest_webhook(None, br#"{"assistantId": "A1"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        let err = service.ingest_webhook(None, b"[1, 2]").await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400);

        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_webhook_redelivery_merges() {
        let (service, repo) = service(StaticCallSource::empty(), None);

        service
            .ingest_webhook(None, br#"{"id": "c1", "assistantId": "A1", "status": "in-progress"}"#)
            .await
            .unwrap();
        let stored = service
            .ingest_webhook(None, br#"{"id": "c1", "assistantId": "A1", "status": "ended"}"#)
            .await
            .unwrap();

        assert_eq!(repo.len(), 1);
        assert_eq!(stored.record.status.as_deref(), Some("ended"));
    }

    #[tokio::test]
    async fn test_get_call_not_found() {
        let (service, _repo) = service(StaticCallSource::empty(), None);
        let err = service.get_call("nope").await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 404);
    }
}
