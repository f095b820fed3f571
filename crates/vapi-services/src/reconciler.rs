//! Source reconciler
//!
//! Decides which upstream endpoint supplies the payloads for a pull-sync.
//! The logs endpoint is asked first; the calls endpoint is asked only when
//! the logs endpoint produced nothing call-shaped. Both requests are strictly
//! sequential and each asks for a single page.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use vapi_core::models::UpstreamPayload;
use vapi_core::traits::{CallSource, SourceQuery};
use vapi_core::{AppError, AppResult, UpstreamError};

/// Assistant and optional time window of one pull-sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncWindow {
    pub assistant_id: String,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl SyncWindow {
    /// Validate raw request parameters
    ///
    /// # Errors
    ///
    /// `AppError::Validation` when the assistant id is missing, a bound is not
    /// an ISO-8601 timestamp, or `start` is after `end`.
    pub fn parse(
        assistant_id: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> AppResult<Self> {
        let assistant_id = assistant_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::Validation("assistantId required".to_string()))?;

        let start = parse_bound("start", start)?;
        let end = parse_bound("end", end)?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(AppError::Validation(
                    "start must not be after end".to_string(),
                ));
            }
        }

        Ok(Self {
            assistant_id: assistant_id.to_string(),
            start,
            end,
        })
    }
}

/// Parse an optional ISO-8601 bound; blank counts as absent
pub fn parse_bound(name: &str, raw: Option<&str>) -> AppResult<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|e| AppError::Validation(format!("{} is not an ISO-8601 timestamp: {}", name, e))),
    }
}

/// Endpoint the reconciled payloads came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    Logs,
    Calls,
    /// Neither endpoint produced anything usable
    None,
}

/// Payloads selected for normalization
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub origin: SourceOrigin,
    pub payloads: Vec<UpstreamPayload>,
}

/// Chooses between the primary (logs) and fallback (calls) endpoints
pub struct SourceReconciler {
    source: Arc<dyn CallSource>,
    page_size: u32,
}

impl SourceReconciler {
    pub fn new(source: Arc<dyn CallSource>, page_size: u32) -> Self {
        Self { source, page_size }
    }

    /// Collect the payloads to sync for `window`.
    ///
    /// Upstream failures are absorbed: a failed primary triggers the
    /// fallback, a failed fallback yields an empty result. Only a missing
    /// credential is surfaced, as a configuration error.
    #[instrument(skip(self), fields(assistant_id = %window.assistant_id))]
    pub async fn collect(&self, window: &SyncWindow) -> AppResult<Reconciled> {
        if window.assistant_id.is_empty() {
            return Err(AppError::Validation("assistantId required".to_string()));
        }

        let query = SourceQuery {
            assistant_id: window.assistant_id.clone(),
            start: window.start,
            end: window.end,
            limit: self.page_size,
        };

        let primary = match self.source.fetch_logs(&query).await {
            Ok(items) => {
                self.warn_if_truncated("logs", items.len());
                let total = items.len();
                let payloads: Vec<_> = items
                    .into_iter()
                    .filter_map(UpstreamPayload::from_log)
                    .collect();
                debug!("Logs endpoint: {} entries, {} call-shaped", total, payloads.len());
                payloads
            }
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!("Logs endpoint failed, falling back to calls: {}", e);
                Vec::new()
            }
        };

        if !primary.is_empty() {
            info!("Reconciled {} payloads from logs", primary.len());
            return Ok(Reconciled {
                origin: SourceOrigin::Logs,
                payloads: primary,
            });
        }

        let fallback = match self.source.fetch_calls(&query).await {
            Ok(items) => {
                self.warn_if_truncated("calls", items.len());
                items
                    .into_iter()
                    .filter_map(UpstreamPayload::from_call)
                    .collect::<Vec<_>>()
            }
            Err(e) => return self.fallback_failed(e),
        };

        if fallback.is_empty() {
            info!("No calls found for assistant");
            return Ok(Reconciled {
                origin: SourceOrigin::None,
                payloads: fallback,
            });
        }

        info!("Reconciled {} payloads from calls", fallback.len());
        Ok(Reconciled {
            origin: SourceOrigin::Calls,
            payloads: fallback,
        })
    }

    fn fallback_failed(&self, err: UpstreamError) -> AppResult<Reconciled> {
        if err.is_fatal() {
            return Err(err.into());
        }
        error!("Calls endpoint failed, nothing to sync: {}", err);
        Ok(Reconciled {
            origin: SourceOrigin::None,
            payloads: Vec::new(),
        })
    }

    // A full page means older calls in the window were not fetched.
    fn warn_if_truncated(&self, endpoint: &str, received: usize) {
        if received >= self.page_size as usize {
            warn!(
                "{} endpoint returned a full page of {}; older calls in the window are not synced",
                endpoint, self.page_size
            );
        }
    }
}
