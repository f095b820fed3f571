//! Call record repository implementation
//!
//! PostgreSQL-backed storage for canonical call records. Writes are merges
//! keyed by the upstream call id, so replayed syncs and webhook redeliveries
//! converge on one row per call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info, instrument};
use vapi_core::{
    models::{CallRecord, CallRecordFilter, NewCallRecord},
    traits::CallRecordRepository,
    AppError, AppResult,
};

/// PostgreSQL implementation of CallRecordRepository
#[derive(Clone)]
pub struct PgCallRecordRepository {
    pool: PgPool,
}

impl PgCallRecordRepository {
    /// Create a new call record repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CALL_RECORD_SELECT_COLUMNS: &str = r#"
    id, assistant_id, status, ended_reason,
    from_number, to_number,
    start_time, end_time, duration_seconds,
    recording_url, transcript, raw,
    created_at, updated_at
"#;

// Absent optional fields keep the stored value; raw always overwrites;
// created_at is only written by the INSERT arm.
const UPSERT_SQL: &str = r#"
    INSERT INTO call_records (
        id, assistant_id, status, ended_reason,
        from_number, to_number,
        start_time, end_time, duration_seconds,
        recording_url, transcript, raw,
        created_at, updated_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $13)
    ON CONFLICT (id) DO UPDATE SET
        assistant_id = EXCLUDED.assistant_id,
        status = COALESCE(EXCLUDED.status, call_records.status),
        ended_reason = COALESCE(EXCLUDED.ended_reason, call_records.ended_reason),
        from_number = COALESCE(EXCLUDED.from_number, call_records.from_number),
        to_number = COALESCE(EXCLUDED.to_number, call_records.to_number),
        start_time = COALESCE(EXCLUDED.start_time, call_records.start_time),
        end_time = COALESCE(EXCLUDED.end_time, call_records.end_time),
        duration_seconds = COALESCE(EXCLUDED.duration_seconds, call_records.duration_seconds),
        recording_url = COALESCE(EXCLUDED.recording_url, call_records.recording_url),
        transcript = COALESCE(EXCLUDED.transcript, call_records.transcript),
        raw = EXCLUDED.raw,
        updated_at = GREATEST(
            EXCLUDED.updated_at,
            call_records.updated_at + INTERVAL '1 microsecond'
        )
"#;

/// Batch in primary key order so concurrent batches take row locks in the
/// same order. The sort is stable: a repeated id is applied in input order.
fn lock_order(records: &[NewCallRecord]) -> Vec<&NewCallRecord> {
    let mut ordered: Vec<&NewCallRecord> = records.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));
    ordered
}

#[async_trait]
impl CallRecordRepository for PgCallRecordRepository {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert_batch(&self, records: &[NewCallRecord]) -> AppResult<usize> {
        if records.is_empty() {
            debug!("Nothing to upsert");
            return Ok(0);
        }

        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        for record in lock_order(records) {
            sqlx::query(UPSERT_SQL)
                .bind(&record.id)
                .bind(&record.assistant_id)
                .bind(&record.status)
                .bind(&record.ended_reason)
                .bind(&record.from_number)
                .bind(&record.to_number)
                .bind(record.start_time)
                .bind(record.end_time)
                .bind(record.duration_seconds)
                .bind(&record.recording_url)
                .bind(&record.transcript)
                .bind(&record.raw)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    error!("Database error upserting call {}: {}", record.id, e);
                    AppError::Database(format!("Failed to upsert call record: {}", e))
                })?;
        }

        tx.commit().await.map_err(|e| {
            error!("Failed to commit transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!("Upserted {} call records", records.len());

        Ok(records.len())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: &str) -> AppResult<Option<CallRecord>> {
        debug!("Finding call record by id: {}", id);

        let query = format!(
            "SELECT {} FROM call_records WHERE id = $1",
            CALL_RECORD_SELECT_COLUMNS
        );

        let result = sqlx::query_as::<Postgres, CallRecordRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error finding call record {}: {}", id, e);
                AppError::Database(format!("Failed to find call record: {}", e))
            })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_by_assistant(&self, filter: &CallRecordFilter) -> AppResult<Vec<CallRecord>> {
        debug!(
            "Listing call records: assistant_id={}, start={:?}, end={:?}, limit={}",
            filter.assistant_id, filter.start, filter.end, filter.limit
        );

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM call_records WHERE assistant_id = ",
            CALL_RECORD_SELECT_COLUMNS
        ));
        builder.push_bind(&filter.assistant_id);

        if let Some(start) = filter.start {
            builder.push(" AND start_time >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            builder.push(" AND start_time <= ").push_bind(end);
        }

        builder
            .push(" ORDER BY start_time DESC NULLS LAST LIMIT ")
            .push_bind(filter.limit);

        let rows = builder
            .build_query_as::<CallRecordRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error listing call records: {}", e);
                AppError::Database(format!("Failed to fetch call records: {}", e))
            })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows to domain model
#[derive(Debug, sqlx::FromRow)]
struct CallRecordRow {
    id: String,
    assistant_id: String,
    status: Option<String>,
    ended_reason: Option<String>,
    from_number: Option<String>,
    to_number: Option<String>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    recording_url: Option<String>,
    transcript: Option<String>,
    raw: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRecordRow> for CallRecord {
    fn from(row: CallRecordRow) -> Self {
        CallRecord {
            record: NewCallRecord {
                id: row.id,
                assistant_id: row.assistant_id,
                status: row.status,
                ended_reason: row.ended_reason,
                from_number: row.from_number,
                to_number: row.to_number,
                start_time: row.start_time,
                end_time: row.end_time,
                duration_seconds: row.duration_seconds,
                recording_url: row.recording_url,
                transcript: row.transcript,
                raw: row.raw,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::run_migrations;
    use serde_json::json;

    async fn test_repo() -> PgCallRecordRepository {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/vapi_sync".to_string());
        let pool = PgPool::connect(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        PgCallRecordRepository::new(pool)
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgresql://localhost/unused")
            .unwrap();
        let repo = PgCallRecordRepository::new(pool);
        assert_eq!(repo.upsert_batch(&[]).await.unwrap(), 0);
    }

    #[test]
    fn test_lock_order_sorts_by_id_and_keeps_duplicates_in_input_order() {
        let batch = vec![
            NewCallRecord::bare("c3", "A1", json!({"n": 1})),
            NewCallRecord::bare("c1", "A1", json!({"n": 2})),
            NewCallRecord::bare("c3", "A1", json!({"n": 3})),
            NewCallRecord::bare("c2", "A1", json!({"n": 4})),
        ];

        let ordered: Vec<(&str, i64)> = lock_order(&batch)
            .into_iter()
            .map(|r| (r.id.as_str(), r.raw["n"].as_i64().unwrap_or_default()))
            .collect();
        assert_eq!(ordered, vec![("c1", 2), ("c2", 4), ("c3", 1), ("c3", 3)]);
    }

    #[tokio::test]
    #[ignore] // Requires database
    async fn test_upsert_twice_merges_into_one_row() {
        let repo = test_repo().await;
        let id = format!("test-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default());

        let mut first = NewCallRecord::bare(&id, "A1", json!({"n": 1}));
        first.from_number = Some("+1555".to_string());
        repo.upsert_batch(&[first]).await.unwrap();
        let stored_first = repo.find_by_id(&id).await.unwrap().unwrap();

        let second = NewCallRecord::bare(&id, "A1", json!({"n": 2}));
        repo.upsert_batch(&[second]).await.unwrap();
        let stored_second = repo.find_by_id(&id).await.unwrap().unwrap();

        assert_eq!(stored_second.created_at, stored_first.created_at);
        assert!(stored_second.updated_at > stored_first.updated_at);
        assert_eq!(stored_second.record.from_number.as_deref(), Some("+1555"));
        assert_eq!(stored_second.record.raw, json!({"n": 2}));
    }
}
