//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use crate::error::AppError;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

/// Upper bound accepted by the upstream list endpoints
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma separated list of origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9001
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// Database configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection acquire timeout in seconds
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,

    /// Idle connection timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

/// Upstream call platform configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UpstreamConfig {
    /// Bearer credential for the platform API. Required by pull-sync only.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Page size requested from both list endpoints
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Shared secret expected in `x-vapi-secret` on webhook deliveries
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Client-side request timeout; unset means wait for the transport
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "https://api.vapi.ai".to_string()
}

fn default_page_size() -> u32 {
    200
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            page_size: default_page_size(),
            webhook_secret: None,
            request_timeout_secs: None,
        }
    }
}

impl UpstreamConfig {
    /// The API credential, or a configuration error when it is not set
    pub fn api_key(&self) -> Result<&str, AppError> {
        self.api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AppError::Config("VAPI_API_KEY missing".to_string()))
    }

    /// Configured webhook secret, treating an empty value as unset
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
    }

    /// Page size clamped to what the upstream accepts
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Fill unset credentials from the unprefixed variable names
    fn apply_legacy_env(&mut self) {
        if self.api_key.is_none() {
            self.api_key = env::var("VAPI_API_KEY").ok();
        }
        if self.webhook_secret.is_none() {
            self.webhook_secret = env::var("VAPI_WEBHOOK_SECRET").ok();
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9001)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("database.max_connections", 10)?
            .set_default("upstream.base_url", default_base_url())?
            .set_default("upstream.page_size", 200)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with VAPI_SYNC_ prefix
            .add_source(
                Environment::with_prefix("VAPI_SYNC")
                    .separator("__")
                    .try_parsing(true),
            );

        // Support the plain DATABASE_URL used by sqlx tooling
        let builder = match env::var("DATABASE_URL") {
            Ok(url) => builder.set_default("database.url", url)?,
            Err(_) => builder,
        };

        let mut config: AppConfig = builder.build()?.try_deserialize()?;
        config.upstream.apply_legacy_env();
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("VAPI_SYNC").separator("__"))
            .build()?;

        let mut config: AppConfig = config.try_deserialize()?;
        config.upstream.apply_legacy_env();
        Ok(config)
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
