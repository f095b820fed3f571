//! In-memory fakes of the storage and upstream traits
//!
//! Used by the unit tests in this crate and, through the `test-support`
//! feature, by the handler tests in `vapi-api`.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use vapi_core::models::{CallRecord, CallRecordFilter, NewCallRecord};
use vapi_core::traits::{CallRecordRepository, CallSource, SourceQuery};
use vapi_core::{AppError, AppResult, UpstreamError};

/// Call record store backed by a map, with the same merge rules as Postgres
#[derive(Default)]
pub struct InMemoryCallRecordRepository {
    records: Mutex<BTreeMap<String, CallRecord>>,
    fail_writes: AtomicBool,
}

impl InMemoryCallRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following batch fail as a storage error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<CallRecord> {
        self.records.lock().get(id).cloned()
    }
}

#[async_trait]
impl CallRecordRepository for InMemoryCallRecordRepository {
    async fn upsert_batch(&self, records: &[NewCallRecord]) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("write rejected".to_string()));
        }

        let now = Utc::now();
        let mut stored = self.records.lock();
        for record in records {
            match stored.get_mut(&record.id) {
                Some(existing) => existing.merge(record.clone(), now),
                None => {
                    stored.insert(record.id.clone(), record.clone().into_inserted(now));
                }
            }
        }

        Ok(records.len())
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<CallRecord>> {
        Ok(self.get(id))
    }

    async fn list_by_assistant(&self, filter: &CallRecordFilter) -> AppResult<Vec<CallRecord>> {
        let mut matches: Vec<CallRecord> = self
            .records
            .lock()
            .values()
            .filter(|r| r.record.assistant_id == filter.assistant_id)
            .filter(|r| match (filter.start, r.record.start_time) {
                (Some(start), Some(t)) => t >= start,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .filter(|r| match (filter.end, r.record.start_time) {
                (Some(end), Some(t)) => t <= end,
                (Some(_), None) => false,
                (None, _) => true,
            })
            .cloned()
            .collect();

        // Newest first, records without a start time last
        matches.sort_by(|a, b| b.record.start_time.cmp(&a.record.start_time));
        matches.truncate(filter.limit.max(0) as usize);
        Ok(matches)
    }
}

/// Upstream with canned responses per endpoint
pub struct StaticCallSource {
    logs: Result<Vec<Value>, UpstreamError>,
    calls: Result<Vec<Value>, UpstreamError>,
    log_requests: AtomicUsize,
    call_requests: AtomicUsize,
}

impl StaticCallSource {
    pub fn new(
        logs: Result<Vec<Value>, UpstreamError>,
        calls: Result<Vec<Value>, UpstreamError>,
    ) -> Self {
        Self {
            logs,
            calls,
            log_requests: AtomicUsize::new(0),
            call_requests: AtomicUsize::new(0),
        }
    }

    /// Both endpoints empty
    pub fn empty() -> Self {
        Self::new(Ok(Vec::new()), Ok(Vec::new()))
    }

    /// No credential configured
    pub fn unconfigured() -> Self {
        Self::new(
            Err(UpstreamError::MissingCredential),
            Err(UpstreamError::MissingCredential),
        )
    }

    pub fn log_requests(&self) -> usize {
        self.log_requests.load(Ordering::SeqCst)
    }

    pub fn call_requests(&self) -> usize {
        self.call_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CallSource for StaticCallSource {
    async fn fetch_logs(&self, _query: &SourceQuery) -> Result<Vec<Value>, UpstreamError> {
        self.log_requests.fetch_add(1, Ordering::SeqCst);
        self.logs.clone()
    }

    async fn fetch_calls(&self, _query: &SourceQuery) -> Result<Vec<Value>, UpstreamError> {
        self.call_requests.fetch_add(1, Ordering::SeqCst);
        self.calls.clone()
    }
}
