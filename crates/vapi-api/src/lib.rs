//! API layer for the Vapi call sync service
//!
//! HTTP handlers for pull-sync, webhook delivery and call record queries.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

pub use dto::ApiResponse;
pub use handlers::{configure_calls, configure_sync, configure_webhook, WEBHOOK_SECRET_HEADER};
