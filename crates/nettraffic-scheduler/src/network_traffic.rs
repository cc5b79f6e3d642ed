use crate::error::{Result, SchedulerError};
use crate::framework::{
    CycleState, NodeScore, Plugin, ScoreExtensions, ScorePlugin, Status, MAX_NODE_SCORE,
};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use nettraffic_metrics::{MetricSource, ScoringConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Name of the plugin in scheduler profiles
pub const NAME: &str = "NetworkTraffic";

/// Arguments of the NetworkTraffic plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkTrafficArgs {
    /// Address of the Prometheus-compatible backend
    pub ip: String,
    /// Network device to measure
    pub device_name: String,
    /// Window in minutes
    pub time_range: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

impl NetworkTrafficArgs {
    /// Decode from a raw plugin payload
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| SchedulerError::invalid_plugin_args(NAME, e.to_string()))
    }

    /// Metric source configuration for these arguments
    pub fn scoring_config(&self) -> Result<ScoringConfig> {
        if self.time_range <= 0 {
            return Err(SchedulerError::invalid_plugin_args(
                NAME,
                format!("timeRange must be a positive number of minutes, got {}", self.time_range),
            ));
        }

        let window_secs = (self.time_range as u64).checked_mul(60).ok_or_else(|| {
            SchedulerError::invalid_plugin_args(
                NAME,
                format!("timeRange of {} minutes is too large", self.time_range),
            )
        })?;
        let window = Duration::from_secs(window_secs);
        let mut config = ScoringConfig::new(&self.ip, self.device_name.clone(), window)?;

        if let Some(secs) = self.timeout_seconds {
            if secs == 0 {
                return Err(SchedulerError::invalid_plugin_args(
                    NAME,
                    "timeoutSeconds must be positive",
                ));
            }
            config = config.with_query_timeout(Duration::from_secs(secs));
        }
        if let Some(retries) = self.max_retries {
            config = config.with_max_retries(retries);
        }

        Ok(config)
    }
}

/// Prefers nodes that received less network traffic over the window
pub struct NetworkTraffic {
    source: MetricSource,
}

impl NetworkTraffic {
    /// Create the plugin with a Prometheus-backed metric source
    pub fn new(args: &NetworkTrafficArgs) -> Result<Self> {
        info!(
            "[{}] args received. Device: {}; TimeRange: {}, Address: {}",
            NAME, args.device_name, args.time_range, args.ip
        );

        let source = MetricSource::new(args.scoring_config()?)?;
        Ok(Self::with_source(source))
    }

    /// Create the plugin over an existing metric source
    pub fn with_source(source: MetricSource) -> Self {
        Self { source }
    }

    /// Registry factory
    pub fn factory(args: serde_json::Value) -> Result<Box<dyn ScorePlugin>> {
        let args = NetworkTrafficArgs::from_value(args)?;
        Ok(Box::new(Self::new(&args)?))
    }

    pub fn source(&self) -> &MetricSource {
        &self.source
    }
}

impl Plugin for NetworkTraffic {
    fn name(&self) -> &str {
        NAME
    }
}

#[async_trait]
impl ScorePlugin for NetworkTraffic {
    async fn score(
        &self,
        ctx: &CancellationToken,
        state: &CycleState,
        _pod: &Pod,
        node_name: &str,
    ) -> (i64, Status) {
        let measured = tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                return (
                    0,
                    Status::error(format!("scoring node {} cancelled", node_name)),
                );
            }
            result = self.source.fetch_bandwidth(node_name) => result,
        };

        match measured {
            Ok(sample) => {
                let bandwidth = sample.bytes_over_window as i64;
                info!(
                    cycle = state.id(),
                    "[{}] node '{}' bandwidth: {}",
                    NAME, node_name, bandwidth
                );
                (bandwidth, Status::success())
            }
            Err(e) => (
                0,
                Status::error(format!("error getting node bandwidth measure: {}", e)),
            ),
        }
    }

    fn score_extensions(&self) -> Option<&dyn ScoreExtensions> {
        Some(self)
    }
}

impl ScoreExtensions for NetworkTraffic {
    fn normalize_score(
        &self,
        _ctx: &CancellationToken,
        state: &CycleState,
        _pod: &Pod,
        scores: &mut [NodeScore],
    ) -> Status {
        normalize_scores(scores);
        info!(cycle = state.id(), "[{}] Nodes final score: {:?}", NAME, scores);
        Status::success()
    }
}

/// Rescale raw bandwidth into `[MAX_NODE_SCORE - 100, MAX_NODE_SCORE]`,
/// inverted so the busiest node of the batch scores lowest.
///
/// `final = MAX_NODE_SCORE - raw * 100 / max(raw)`; a batch whose maximum
/// is zero scores every node `MAX_NODE_SCORE`.
pub fn normalize_scores(scores: &mut [NodeScore]) {
    let highest = scores.iter().map(|s| s.score.max(0)).max().unwrap_or(0);

    if highest == 0 {
        debug!("All nodes report zero bandwidth, scoring them equally");
        for node in scores.iter_mut() {
            node.score = MAX_NODE_SCORE;
        }
        return;
    }

    for node in scores.iter_mut() {
        let raw = i128::from(node.score.max(0));
        let share = raw * 100 / i128::from(highest);
        node.score = MAX_NODE_SCORE - share as i64;
    }
}
