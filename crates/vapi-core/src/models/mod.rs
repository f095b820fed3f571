//! Domain models for the call sync service

pub mod call_record;
pub mod payload;

pub use call_record::{CallRecord, CallRecordFilter, NewCallRecord};
pub use payload::{PayloadVariant, UpstreamPayload};
