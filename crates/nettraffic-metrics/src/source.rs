use crate::api::{QueryApi, QueryValue};
use crate::config::ScoringConfig;
use crate::error::{MetricsError, Result};
use crate::prometheus::PrometheusClient;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Received bytes of `device` summed over the trailing window, joined on
/// `node_uname_info` so the series is picked by node name rather than by
/// the scrape instance label.
///
/// Placeholders, in order: device name, window seconds, node name.
pub fn build_query(device_name: &str, window_secs: u64, node_name: &str) -> String {
    format!(
        "sum_over_time(node_network_receive_bytes_total{{device=\"{}\"}}[{}s]) * on(instance) group_left(nodename) (node_uname_info{{nodename=\"{}\"}})",
        device_name, window_secs, node_name
    )
}

/// Bandwidth measured for one node in one scheduling cycle
#[derive(Debug, Clone, PartialEq)]
pub struct BandwidthSample {
    pub node_name: String,
    /// Received bytes accumulated over the window, never negative
    pub bytes_over_window: f64,
    pub timestamp: DateTime<Utc>,
}

/// Fetches per-node bandwidth from a time-series backend
pub struct MetricSource {
    config: ScoringConfig,
    api: Arc<dyn QueryApi>,
}

impl MetricSource {
    /// Create a metric source backed by the Prometheus HTTP API
    pub fn new(config: ScoringConfig) -> Result<Self> {
        let api = Arc::new(PrometheusClient::new(&config)?);
        Ok(Self::with_api(config, api))
    }

    /// Create a metric source over any query backend
    pub fn with_api(config: ScoringConfig, api: Arc<dyn QueryApi>) -> Self {
        Self { config, api }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Query string used for `node_name`
    pub fn query_for(&self, node_name: &str) -> String {
        build_query(&self.config.device_name, self.config.window_secs(), node_name)
    }

    /// Fetch the bandwidth sample of a single node
    ///
    /// Exactly one series must match; anything else is reported as an
    /// error instead of a zero reading.
    pub async fn fetch_bandwidth(&self, node_name: &str) -> Result<BandwidthSample> {
        let query = self.query_for(node_name);
        debug!("Querying bandwidth for node {}: {}", node_name, query);

        let result = self.api.query(&query, Utc::now()).await?;

        if !result.warnings.is_empty() {
            warn!(
                node = node_name,
                warnings = ?result.warnings,
                "Backend returned warnings"
            );
        }

        let samples = match result.value {
            QueryValue::Vector(samples) => samples,
            other => {
                return Err(MetricsError::UnexpectedResultType {
                    result_type: other.type_name().to_string(),
                })
            }
        };

        if samples.len() != 1 {
            return Err(MetricsError::AmbiguousMeasurement {
                node_name: node_name.to_string(),
                count: samples.len(),
            });
        }

        let sample = &samples[0];
        let bytes = sample
            .value
            .value()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .ok_or_else(|| MetricsError::InvalidSampleValue {
                node_name: node_name.to_string(),
                value: sample.value.value().to_string(),
            })?;

        Ok(BandwidthSample {
            node_name: node_name.to_string(),
            bytes_over_window: bytes,
            timestamp: sample.value.timestamp(),
        })
    }
}
