use crate::api::{QueryApi, QueryResult, QueryValue};
use crate::config::ScoringConfig;
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Envelope shared by every Prometheus HTTP API response
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    data: Option<QueryValue>,
    #[serde(default, rename = "errorType")]
    error_type: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

/// HTTP client for the Prometheus instant query endpoint
pub struct PrometheusClient {
    base_url: String,
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl PrometheusClient {
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.query_timeout)
            .build()
            .map_err(|e| {
                MetricsError::invalid_config(
                    format!("failed to build HTTP client: {}", e),
                    "Check the TLS setup of the scheduler host",
                )
            })?;

        Ok(Self {
            base_url: config.backend_address.as_str().trim_end_matches('/').to_string(),
            client,
            timeout: config.query_timeout,
            max_retries: config.max_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /api/v1/query, a single attempt
    async fn query_once(&self, query: &str, time: DateTime<Utc>) -> Result<QueryResult> {
        let url = format!("{}/api/v1/query", self.base_url);
        let time_param = format!("{:.3}", time.timestamp_millis() as f64 / 1000.0);
        debug!("GET {} query={}", url, query);

        let resp = self
            .client
            .get(&url)
            .query(&[("query", query), ("time", time_param.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MetricsError::transport(format!("request timed out after {:?}", self.timeout))
                } else {
                    MetricsError::transport(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| MetricsError::transport(format!("Failed to read response body: {}", e)))?;

        let envelope = match serde_json::from_str::<ApiResponse>(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(MetricsError::decode_error(e.to_string()));
            }
            Err(_) => {
                return Err(MetricsError::backend_error(
                    format!("http {}", status.as_u16()),
                    body.trim().to_string(),
                ));
            }
        };

        if !status.is_success() || envelope.status != "success" {
            let api_type = envelope.error_type.unwrap_or_else(|| "unknown".to_string());
            let message = envelope.error.unwrap_or_default();
            let error_type = if status.is_server_error() {
                format!("http {}", status.as_u16())
            } else {
                api_type
            };
            return Err(MetricsError::backend_error(error_type, message));
        }

        let value = envelope
            .data
            .ok_or_else(|| MetricsError::decode_error("success response without data"))?;

        Ok(QueryResult::new(value).with_warnings(envelope.warnings))
    }
}

#[async_trait]
impl QueryApi for PrometheusClient {
    async fn query(&self, query: &str, time: DateTime<Utc>) -> Result<QueryResult> {
        let mut attempt = 0;
        loop {
            match self.query_once(query, time).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Backend query failed, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}
