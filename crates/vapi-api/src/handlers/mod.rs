//! HTTP request handlers

pub mod calls;
pub mod sync;
pub mod webhook;

pub use calls::configure as configure_calls;
pub use sync::configure as configure_sync;
pub use webhook::configure as configure_webhook;

/// Header carrying the webhook shared secret
pub const WEBHOOK_SECRET_HEADER: &str = "x-vapi-secret";
