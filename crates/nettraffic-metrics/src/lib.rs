//! Nettraffic Metrics - Node bandwidth from a time-series backend
//!
//! This crate provides:
//! - The bandwidth query template and `MetricSource`
//! - A `QueryApi` abstraction over instant queries
//! - A Prometheus HTTP API client with timeout and retry
//! - An in-memory mock backend for tests

// Allow unused assignments for diagnostic fields - they're used by the thiserror/miette macros
#![allow(unused_assignments)]

pub mod api;
pub mod config;
pub mod error;
pub mod mock;
pub mod prometheus;
pub mod source;

// Re-export commonly used types
pub use api::{QueryApi, QueryResult, QueryValue, SamplePair, VectorSample};
pub use config::ScoringConfig;
pub use error::{MetricsError, Result};
pub use mock::{MockQueryApi, MockReply};
pub use prometheus::PrometheusClient;
pub use source::{build_query, BandwidthSample, MetricSource};
