//! Nettraffic Scheduler - Bandwidth-aware node scoring
//!
//! This crate provides:
//! - The scoring contract between a scheduling host and its plugins
//! - The `NetworkTraffic` score plugin and its normalization
//! - A plugin registry and scheduler profile loading
//! - A score runner that drives one scheduling cycle

// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

pub mod config;
pub mod error;
pub mod framework;
pub mod network_traffic;
pub mod registry;
pub mod runner;

// Re-export commonly used types
pub use config::{PluginConfig, SchedulerProfile};
pub use error::{Result, SchedulerError};
pub use framework::{
    Code, CycleState, NodeScore, Plugin, ScoreExtensions, ScorePlugin, Status, MAX_NODE_SCORE,
    MIN_NODE_SCORE,
};
pub use network_traffic::{normalize_scores, NetworkTraffic, NetworkTrafficArgs};
pub use registry::{default_registry, PluginFactory, Registry};
pub use runner::{CycleScores, NodeFailure, ScoreRunner};
