use crate::error::{Result, SchedulerError};
use crate::framework::{CycleState, NodeScore, ScorePlugin, Status, MIN_NODE_SCORE};
use futures_util::future::join_all;
use k8s_openapi::api::core::v1::Pod;
use std::collections::{BTreeMap, BTreeSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A node that could not be scored by one plugin
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFailure {
    pub node_name: String,
    pub plugin: String,
    pub status: Status,
}

/// Final scores of one scheduling cycle
#[derive(Debug, Clone, Default)]
pub struct CycleScores {
    /// One entry per candidate node, in input order
    pub scores: Vec<NodeScore>,
    /// Nodes that failed at least one plugin; their score is `MIN_NODE_SCORE`
    pub failures: Vec<NodeFailure>,
}

impl CycleScores {
    /// Whether `node_name` failed scoring in this cycle
    pub fn is_failed(&self, node_name: &str) -> bool {
        self.failures.iter().any(|f| f.node_name == node_name)
    }

    /// Highest-scoring eligible node; ties go to the earlier node
    pub fn best(&self) -> Option<&NodeScore> {
        self.scores
            .iter()
            .filter(|s| !self.is_failed(&s.name))
            .fold(None, |best: Option<&NodeScore>, candidate| match best {
                Some(b) if b.score >= candidate.score => Some(b),
                _ => Some(candidate),
            })
    }
}

struct WeightedPlugin {
    plugin: Box<dyn ScorePlugin>,
    weight: i64,
}

/// Drives score plugins through one cycle the way a scheduling host does
///
/// Every node is scored concurrently. Nodes that score successfully are
/// normalized together once per plugin; failed nodes are kept out of the
/// batch and end the cycle with `MIN_NODE_SCORE`.
#[derive(Default)]
pub struct ScoreRunner {
    plugins: Vec<WeightedPlugin>,
}

impl ScoreRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: Box<dyn ScorePlugin>, weight: i64) -> Self {
        self.plugins.push(WeightedPlugin { plugin, weight });
        self
    }

    pub fn plugin_names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.plugin.name()).collect()
    }

    /// Run one scoring cycle for `pod` over `nodes`
    pub async fn run(
        &self,
        ctx: &CancellationToken,
        state: &CycleState,
        pod: &Pod,
        nodes: &[String],
    ) -> Result<CycleScores> {
        let pod_name = pod.metadata.name.as_deref().unwrap_or("unknown");
        debug!(cycle = state.id(), "Scoring {} nodes for pod {}", nodes.len(), pod_name);

        let mut seen = BTreeSet::new();
        if let Some(dup) = nodes.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(SchedulerError::DuplicateNode {
                node_name: dup.clone(),
            });
        }

        let mut totals: BTreeMap<&str, i64> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
        let mut failures = Vec::new();

        for weighted in &self.plugins {
            let plugin = weighted.plugin.as_ref();

            // Phase 1: raw scores
            let results = join_all(
                nodes
                    .iter()
                    .map(|node| plugin.score(ctx, state, pod, node.as_str())),
            )
            .await;

            let mut batch = Vec::with_capacity(nodes.len());
            for (node, (score, status)) in nodes.iter().zip(results) {
                if status.is_success() {
                    batch.push(NodeScore::new(node.clone(), score));
                } else {
                    warn!(
                        cycle = state.id(),
                        "Plugin {} failed to score node {}: {}",
                        plugin.name(),
                        node,
                        status
                    );
                    failures.push(NodeFailure {
                        node_name: node.clone(),
                        plugin: plugin.name().to_string(),
                        status,
                    });
                }
            }

            // Phase 2: one normalization over the whole batch
            if let Some(extensions) = plugin.score_extensions() {
                let status = extensions.normalize_score(ctx, state, pod, &mut batch);
                if !status.is_success() {
                    return Err(SchedulerError::NormalizeFailed {
                        plugin: plugin.name().to_string(),
                        message: status.message(),
                    });
                }
            }

            for entry in batch {
                if let Some(total) = totals.get_mut(entry.name.as_str()) {
                    *total += entry.score * weighted.weight;
                }
            }
        }

        let mut cycle = CycleScores {
            scores: Vec::with_capacity(nodes.len()),
            failures,
        };
        for node in nodes {
            let score = if cycle.is_failed(node) {
                MIN_NODE_SCORE
            } else {
                totals.get(node.as_str()).copied().unwrap_or(MIN_NODE_SCORE)
            };
            cycle.scores.push(NodeScore::new(node.clone(), score));
        }

        match cycle.best() {
            Some(best) => info!(
                cycle = state.id(),
                "Best node for pod {} is {} with score {}",
                pod_name, best.name, best.score
            ),
            None => warn!(cycle = state.id(), "No node could be scored for pod {}", pod_name),
        }

        Ok(cycle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::{Plugin, ScoreExtensions, MAX_NODE_SCORE};
    use crate::network_traffic::NetworkTraffic;
    use async_trait::async_trait;
    use nettraffic_metrics::{MetricSource, MockQueryApi, MockReply, ScoringConfig};
    use std::sync::Arc;
    use std::time::Duration;

    fn node_names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn make_pod(name: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod.metadata.namespace = Some("default".to_string());
        pod
    }

    async fn make_traffic_runner(readings: &[(&str, MockReply)]) -> ScoreRunner {
        let mock = MockQueryApi::new();
        for (node, reply) in readings {
            mock.respond_for_node(node, reply.clone()).await;
        }
        let config =
            ScoringConfig::new("http://prometheus:9090", "eth0", Duration::from_secs(300)).unwrap();
        let plugin = NetworkTraffic::with_source(MetricSource::with_api(config, Arc::new(mock)));
        ScoreRunner::new().with_plugin(Box::new(plugin), 1)
    }

    /// Scores every node with a fixed value and normalizes nothing
    struct FixedScore(i64);

    impl Plugin for FixedScore {
        fn name(&self) -> &str {
            "FixedScore"
        }
    }

    #[async_trait]
    impl ScorePlugin for FixedScore {
        async fn score(
            &self,
            _ctx: &CancellationToken,
            _state: &CycleState,
            _pod: &Pod,
            _node_name: &str,
        ) -> (i64, Status) {
            (self.0, Status::success())
        }
    }

    /// Normalize hook that always fails
    struct BrokenNormalize;

    impl Plugin for BrokenNormalize {
        fn name(&self) -> &str {
            "BrokenNormalize"
        }
    }

    #[async_trait]
    impl ScorePlugin for BrokenNormalize {
        async fn score(
            &self,
            _ctx: &CancellationToken,
            _state: &CycleState,
            _pod: &Pod,
            _node_name: &str,
        ) -> (i64, Status) {
            (1, Status::success())
        }

        fn score_extensions(&self) -> Option<&dyn ScoreExtensions> {
            Some(self)
        }
    }

    impl ScoreExtensions for BrokenNormalize {
        fn normalize_score(
            &self,
            _ctx: &CancellationToken,
            _state: &CycleState,
            _pod: &Pod,
            _scores: &mut [NodeScore],
        ) -> Status {
            Status::error("refusing to normalize")
        }
    }

    #[tokio::test]
    async fn test_cycle_prefers_quiet_node() {
        let runner = make_traffic_runner(&[
            ("node-a", MockReply::vector("node-a", &[800.0])),
            ("node-b", MockReply::vector("node-b", &[400.0])),
            ("node-c", MockReply::vector("node-c", &[0.0])),
        ])
        .await;

        let cycle = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a", "node-b", "node-c"]),
            )
            .await
            .unwrap();

        assert!(cycle.failures.is_empty());
        assert_eq!(
            cycle.scores,
            vec![
                NodeScore::new("node-a", 0),
                NodeScore::new("node-b", 50),
                NodeScore::new("node-c", 100),
            ]
        );
        assert_eq!(cycle.best().unwrap().name, "node-c");
    }

    #[tokio::test]
    async fn test_failed_node_is_minimal_and_excluded_from_batch() {
        let runner = make_traffic_runner(&[
            ("node-a", MockReply::vector("node-a", &[500.0])),
            ("node-b", MockReply::TransportError("connection refused".to_string())),
            ("node-c", MockReply::vector("node-c", &[250.0])),
        ])
        .await;

        let cycle = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a", "node-b", "node-c"]),
            )
            .await
            .unwrap();

        assert_eq!(cycle.failures.len(), 1);
        assert_eq!(cycle.failures[0].node_name, "node-b");
        assert_eq!(cycle.failures[0].plugin, "NetworkTraffic");
        assert!(cycle.is_failed("node-b"));

        // Max of the surviving batch is node-a's 500
        assert_eq!(cycle.scores[0], NodeScore::new("node-a", 0));
        assert_eq!(cycle.scores[1], NodeScore::new("node-b", MIN_NODE_SCORE));
        assert_eq!(cycle.scores[2], NodeScore::new("node-c", 50));
        assert_eq!(cycle.best().unwrap().name, "node-c");
    }

    #[tokio::test]
    async fn test_all_quiet_nodes_tie_on_max() {
        let runner = make_traffic_runner(&[
            ("node-a", MockReply::vector("node-a", &[0.0])),
            ("node-b", MockReply::vector("node-b", &[0.0])),
        ])
        .await;

        let cycle = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a", "node-b"]),
            )
            .await
            .unwrap();

        assert!(cycle.scores.iter().all(|s| s.score == MAX_NODE_SCORE));
        // First node in input order wins the tie
        assert_eq!(cycle.best().unwrap().name, "node-a");
    }

    #[tokio::test]
    async fn test_all_nodes_failed() {
        let runner = make_traffic_runner(&[]).await;

        let cycle = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a", "node-b"]),
            )
            .await
            .unwrap();

        assert_eq!(cycle.failures.len(), 2);
        assert!(cycle.scores.iter().all(|s| s.score == MIN_NODE_SCORE));
        assert!(cycle.best().is_none());
    }

    #[tokio::test]
    async fn test_weights_are_summed() {
        let runner = ScoreRunner::new()
            .with_plugin(Box::new(FixedScore(10)), 2)
            .with_plugin(Box::new(FixedScore(5)), 3);

        let cycle = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a"]),
            )
            .await
            .unwrap();

        assert_eq!(cycle.scores, vec![NodeScore::new("node-a", 35)]);
    }

    #[tokio::test]
    async fn test_normalize_failure_aborts_cycle() {
        let runner = ScoreRunner::new().with_plugin(Box::new(BrokenNormalize), 1);

        let err = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a"]),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::NormalizeFailed { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_node_is_rejected() {
        let runner = make_traffic_runner(&[
            ("node-a", MockReply::vector("node-a", &[800.0])),
            ("node-b", MockReply::vector("node-b", &[400.0])),
        ])
        .await;

        let err = runner
            .run(
                &CancellationToken::new(),
                &CycleState::new(),
                &make_pod("web-0"),
                &node_names(&["node-a", "node-b", "node-b"]),
            )
            .await
            .unwrap_err();
        match err {
            SchedulerError::DuplicateNode { node_name } => assert_eq!(node_name, "node-b"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_best_of_empty_cycle() {
        assert!(CycleScores::default().best().is_none());
    }
}
