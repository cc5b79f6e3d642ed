use crate::error::{MetricsError, Result};
use reqwest::Url;
use std::time::Duration;

/// Default per-request timeout for backend queries
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of retries after a failed backend query
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Configuration for a bandwidth metric source
///
/// Validated once at construction and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// Base URL of the Prometheus-compatible backend
    pub backend_address: Url,
    /// Network device whose received bytes are measured (e.g. `eth0`)
    pub device_name: String,
    /// Trailing window the bytes are accumulated over
    pub window: Duration,
    /// Timeout applied to every backend request
    pub query_timeout: Duration,
    /// Retries after a transport failure or 5xx response
    pub max_retries: u32,
}

impl ScoringConfig {
    /// Create a new configuration, validating the address and window
    pub fn new(backend_address: &str, device_name: impl Into<String>, window: Duration) -> Result<Self> {
        let backend_address = parse_backend_address(backend_address)?;
        let device_name = device_name.into();

        if device_name.is_empty() {
            return Err(MetricsError::invalid_config(
                "device name is empty",
                "Set deviceName to the network interface to measure, e.g. eth0",
            ));
        }

        if window.as_secs() == 0 {
            return Err(MetricsError::invalid_config(
                format!("window must be at least one second, got {:?}", window),
                "Set timeRange to a positive number of minutes",
            ));
        }

        Ok(Self {
            backend_address,
            device_name,
            window,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Override the per-request timeout
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Override the retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Window length in whole seconds, as used in the range selector
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }
}

fn parse_backend_address(address: &str) -> Result<Url> {
    let url = Url::parse(address.trim())
        .map_err(|e| MetricsError::invalid_backend_address(address, e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MetricsError::invalid_backend_address(
                address,
                format!("unsupported scheme '{}'", other),
            ))
        }
    }

    if url.host_str().is_none() {
        return Err(MetricsError::invalid_backend_address(address, "missing host"));
    }

    Ok(url)
}
