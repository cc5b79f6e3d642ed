use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

/// A `[<unix seconds>, "<value>"]` pair as encoded by the Prometheus API
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SamplePair(pub f64, pub String);

impl SamplePair {
    /// Evaluation timestamp of the pair
    pub fn timestamp(&self) -> DateTime<Utc> {
        let millis = (self.0 * 1000.0).round() as i64;
        Utc.timestamp_millis_opt(millis)
            .single()
            .unwrap_or_default()
    }

    /// Raw value string; may be `NaN`, `+Inf` or `-Inf`
    pub fn value(&self) -> &str {
        &self.1
    }
}

/// One element of an instant vector
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    pub value: SamplePair,
}

/// One series of a range vector
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RangeSeries {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

/// Evaluated query value, keyed by the backend's `resultType`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryValue {
    Vector(Vec<VectorSample>),
    Scalar(SamplePair),
    Matrix(Vec<RangeSeries>),
    String(SamplePair),
}

impl QueryValue {
    /// Name of the result type, as the backend spells it
    pub fn type_name(&self) -> &'static str {
        match self {
            QueryValue::Vector(_) => "vector",
            QueryValue::Scalar(_) => "scalar",
            QueryValue::Matrix(_) => "matrix",
            QueryValue::String(_) => "string",
        }
    }
}

/// Successful query outcome; warnings do not make a query fail
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub value: QueryValue,
    pub warnings: Vec<String>,
}

impl QueryResult {
    pub fn new(value: QueryValue) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Time-series query backend
///
/// Implemented by `PrometheusClient` over HTTP and by `MockQueryApi` for
/// tests. Implementations must be safe to call concurrently.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Evaluate `query` as an instant query at `time`
    async fn query(&self, query: &str, time: DateTime<Utc>) -> Result<QueryResult>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_vector() {
        let body = r#"{
            "resultType": "vector",
            "result": [
                {"metric": {"instance": "10.0.0.1:9100", "nodename": "node-1"}, "value": [1700000000.5, "1234"]}
            ]
        }"#;

        let value: QueryValue = serde_json::from_str(body).unwrap();
        match value {
            QueryValue::Vector(samples) => {
                assert_eq!(samples.len(), 1);
                assert_eq!(samples[0].metric["nodename"], "node-1");
                assert_eq!(samples[0].value.value(), "1234");
                assert_eq!(samples[0].value.timestamp().timestamp_millis(), 1_700_000_000_500);
            }
            other => panic!("expected vector, got {}", other.type_name()),
        }
    }

    #[test]
    fn test_decode_scalar() {
        let value: QueryValue =
            serde_json::from_str(r#"{"resultType": "scalar", "result": [1700000000, "42"]}"#).unwrap();
        assert_eq!(value, QueryValue::Scalar(SamplePair(1700000000.0, "42".to_string())));
        assert_eq!(value.type_name(), "scalar");
    }

    #[test]
    fn test_decode_matrix() {
        let body = r#"{"resultType": "matrix", "result": [{"metric": {}, "values": [[1, "1"], [2, "2"]]}]}"#;
        let value: QueryValue = serde_json::from_str(body).unwrap();
        assert_eq!(value.type_name(), "matrix");
    }
}
