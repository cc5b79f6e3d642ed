use crate::api::{QueryApi, QueryResult, QueryValue, SamplePair, VectorSample};
use crate::error::{MetricsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Canned reply returned by `MockQueryApi`
#[derive(Debug, Clone)]
pub enum MockReply {
    Result(QueryResult),
    BackendError { error_type: String, message: String },
    TransportError(String),
}

impl MockReply {
    /// Instant vector with one sample per value, each labelled with `node_name`
    pub fn vector(node_name: &str, values: &[f64]) -> Self {
        let samples = values
            .iter()
            .enumerate()
            .map(|(i, v)| VectorSample {
                metric: BTreeMap::from([
                    ("instance".to_string(), format!("10.0.0.{}:9100", i + 1)),
                    ("nodename".to_string(), node_name.to_string()),
                ]),
                value: SamplePair(1_700_000_000.0, v.to_string()),
            })
            .collect();
        Self::Result(QueryResult::new(QueryValue::Vector(samples)))
    }

    fn into_result(self) -> Result<QueryResult> {
        match self {
            MockReply::Result(result) => Ok(result),
            MockReply::BackendError {
                error_type,
                message,
            } => Err(MetricsError::backend_error(error_type, message)),
            MockReply::TransportError(message) => Err(MetricsError::transport(message)),
        }
    }
}

/// In-memory query backend for tests
///
/// Replies are matched by substring against the incoming query, first
/// registered match wins. Every query is recorded.
#[derive(Clone, Default)]
pub struct MockQueryApi {
    replies: Arc<RwLock<Vec<(String, MockReply)>>>,
    queries: Arc<RwLock<Vec<String>>>,
    delay: Option<Duration>,
}

impl MockQueryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every reply, to exercise cancellation of in-flight queries
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Reply with `reply` to any query containing `pattern`
    pub async fn respond_to(&self, pattern: impl Into<String>, reply: MockReply) {
        self.replies.write().await.push((pattern.into(), reply));
    }

    /// Reply to the bandwidth query of `node_name`
    pub async fn respond_for_node(&self, node_name: &str, reply: MockReply) {
        self.respond_to(format!("nodename=\"{}\"", node_name), reply)
            .await;
    }

    /// All queries received so far, in order
    pub async fn queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl QueryApi for MockQueryApi {
    async fn query(&self, query: &str, _time: DateTime<Utc>) -> Result<QueryResult> {
        self.queries.write().await.push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .read()
            .await
            .iter()
            .find(|(pattern, _)| query.contains(pattern.as_str()))
            .map(|(_, reply)| reply.clone());

        debug!("Mock: query {} matched: {}", query, reply.is_some());

        match reply {
            Some(reply) => reply.into_result(),
            None => Ok(QueryResult::new(QueryValue::Vector(Vec::new()))),
        }
    }
}
