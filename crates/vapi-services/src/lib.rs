//! Call sync pipeline services
//!
//! This crate holds the logic between the ingress handlers and storage:
//! turning heterogeneous upstream payloads into canonical call records and
//! deciding which upstream endpoint to trust.
//!
//! # Services
//!
//! - `normalizer` - Payload to `NewCallRecord` mapping with ordered field aliases
//! - `SourceReconciler` - Logs endpoint first, calls endpoint as fallback
//! - `CallSyncService` - Pull-sync, webhook ingestion and record queries
//!
//! Services own their collaborators behind the `vapi_core::traits` seams so
//! they can run against the in-memory fakes in `testing`.

pub mod normalizer;
pub mod reconciler;
pub mod sync_service;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use normalizer::{normalize, Normalized};
pub use reconciler::{Reconciled, SourceOrigin, SourceReconciler, SyncWindow};
pub use sync_service::{CallSyncService, SyncReport};
