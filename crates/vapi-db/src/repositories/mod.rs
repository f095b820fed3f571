//! Repository implementations
//!
//! Concrete implementations of the storage traits defined in vapi-core,
//! using sqlx for PostgreSQL access.

pub mod call_record_repo;

pub use call_record_repo::PgCallRecordRepository;
