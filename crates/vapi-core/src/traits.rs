//! Common traits for storage and upstream access
//!
//! Services depend on these abstractions so they can be exercised without
//! a database or network.

use crate::error::{AppError, UpstreamError};
use crate::models::{CallRecord, CallRecordFilter, NewCallRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Call record store with merge-write semantics
#[async_trait]
pub trait CallRecordRepository: Send + Sync {
    /// Merge every record into storage as one all-or-nothing batch.
    ///
    /// Returns the number of records written. An empty slice is a no-op.
    async fn upsert_batch(&self, records: &[NewCallRecord]) -> Result<usize, AppError>;

    /// Find a record by upstream call id
    async fn find_by_id(&self, id: &str) -> Result<Option<CallRecord>, AppError>;

    /// Records for one assistant, newest `start_time` first
    async fn list_by_assistant(
        &self,
        filter: &CallRecordFilter,
    ) -> Result<Vec<CallRecord>, AppError>;
}

/// Query sent to either upstream list endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub assistant_id: String,
    /// Inclusive `createdAt` lower bound
    pub start: Option<DateTime<Utc>>,
    /// Inclusive `createdAt` upper bound
    pub end: Option<DateTime<Utc>>,
    /// Page size; only one page is requested
    pub limit: u32,
}

/// The upstream call platform
#[async_trait]
pub trait CallSource: Send + Sync {
    /// Call-type entries from the logs endpoint, newest first
    async fn fetch_logs(&self, query: &SourceQuery) -> Result<Vec<Value>, UpstreamError>;

    /// Entries from the calls list endpoint
    async fn fetch_calls(&self, query: &SourceQuery) -> Result<Vec<Value>, UpstreamError>;
}
