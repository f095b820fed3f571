//! Vapi Call Sync Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the call sync service. It includes:
//!
//! - Domain models (canonical call records, upstream payload variants)
//! - Traits for the call record store and the upstream call platform
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::{AppError, UpstreamError};

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
