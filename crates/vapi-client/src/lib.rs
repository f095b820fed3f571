//! Vapi platform client
//!
//! Thin HTTP client over the two list endpoints the sync pipeline reads:
//! `GET /logs` (call-type log entries) and `GET /call` (the call list).

pub mod client;
pub mod types;

pub use client::VapiClient;
pub use types::ListEnvelope;
