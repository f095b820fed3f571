//! Data Transfer Objects for API requests and responses

pub mod call;
pub mod common;
pub mod sync;

pub use call::{CallListParams, CallRecordResponse};
pub use common::ApiResponse;
pub use sync::{SyncParams, SyncResponse, WebhookAck};
