//! Call Sync Database Layer
//!
//! This crate provides PostgreSQL access for the call sync service:
//!
//! - Connection pool management with sqlx
//! - Embedded schema migrations
//! - The merge-write call record repository

pub mod pool;
pub mod repositories;

pub use pool::{create_pool, run_migrations};
pub use repositories::*;

// Re-export commonly used types
pub use sqlx::PgPool;
pub use vapi_core::{AppError, AppResult};
