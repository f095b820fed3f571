//! HTTP client for the Vapi API
//!
//! Provides bearer-authenticated access to the list endpoints.

use crate::types::ListEnvelope;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, ClientBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use vapi_core::config::UpstreamConfig;
use vapi_core::traits::{CallSource, SourceQuery};
use vapi_core::UpstreamError;

/// Client for the call platform API
pub struct VapiClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl VapiClient {
    /// Create a new client
    ///
    /// A missing credential is not an error here; every fetch reports
    /// `UpstreamError::MissingCredential` instead.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let client = VapiClient::new(&config.upstream)?;
    /// ```
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut builder = ClientBuilder::new()
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60));

        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let http_client = builder
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
        })
    }

    /// Configured API base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Issue a GET against `path` and return the decoded JSON body
    #[instrument(skip(self, params), fields(path = %path))]
    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value, UpstreamError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::MissingCredential)?;

        let url = format!("{}{}", self.base_url, path);
        debug!("Upstream request: url={}, params={:?}", url, params);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(api_key)
            .query(params)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Upstream HTTP error: status={}, url={}, body={}", status, url, body);
            return Err(UpstreamError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await.map_err(|e| {
            UpstreamError::Decode(format!("Failed to read response body: {}", e))
        })?;

        serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Decode(format!("Failed to parse JSON: {}", e)))
    }
}

#[async_trait]
impl CallSource for VapiClient {
    async fn fetch_logs(&self, query: &SourceQuery) -> Result<Vec<Value>, UpstreamError> {
        let body = self.get_json("/logs", &logs_params(query)).await?;
        Ok(ListEnvelope::parse(body).into_log_items())
    }

    async fn fetch_calls(&self, query: &SourceQuery) -> Result<Vec<Value>, UpstreamError> {
        let body = self.get_json("/call", &calls_params(query)).await?;
        Ok(ListEnvelope::parse(body).into_call_items())
    }
}

/// Query string for `GET /logs`
pub fn logs_params(query: &SourceQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("type", "Call".to_string()),
        ("assistantId", query.assistant_id.clone()),
        ("limit", query.limit.to_string()),
        ("sortOrder", "DESC".to_string()),
    ];
    push_window(&mut params, query);
    params
}

/// Query string for `GET /call`
pub fn calls_params(query: &SourceQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("assistantId", query.assistant_id.clone()),
        ("limit", query.limit.to_string()),
    ];
    push_window(&mut params, query);
    params
}

fn push_window(params: &mut Vec<(&'static str, String)>, query: &SourceQuery) {
    if let Some(start) = query.start {
        params.push(("createdAtGe", iso(start)));
    }
    if let Some(end) = query.end {
        params.push(("createdAtLe", iso(end)));
    }
}

fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
