//! Scoring contract between a scheduling host and its plugins.
//!
//! A host drives one cycle per pod: `ScorePlugin::score` once for every
//! candidate node (possibly concurrently), then exactly one
//! `ScoreExtensions::normalize_score` over the whole batch.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Upper bound of a normalized node score
pub const MAX_NODE_SCORE: i64 = 100;

/// Lower bound of a normalized node score
pub const MIN_NODE_SCORE: i64 = 0;

/// Outcome code of a plugin call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Success,
    Error,
    Unschedulable,
    Skip,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Code::Success => write!(f, "Success"),
            Code::Error => write!(f, "Error"),
            Code::Unschedulable => write!(f, "Unschedulable"),
            Code::Skip => write!(f, "Skip"),
        }
    }
}

/// Result status returned by plugins to the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: Code,
    reasons: Vec<String>,
}

impl Status {
    pub fn new(code: Code, reason: impl Into<String>) -> Self {
        Self {
            code,
            reasons: vec![reason.into()],
        }
    }

    pub fn success() -> Self {
        Self {
            code: Code::Success,
            reasons: Vec::new(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        Self::new(Code::Error, reason)
    }

    pub fn code(&self) -> Code {
        self.code
    }

    pub fn reasons(&self) -> &[String] {
        &self.reasons
    }

    pub fn is_success(&self) -> bool {
        self.code == Code::Success
    }

    /// Reasons joined into one message
    pub fn message(&self) -> String {
        self.reasons.join(", ")
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reasons.is_empty() {
            write!(f, "{}", self.code)
        } else {
            write!(f, "{}: {}", self.code, self.message())
        }
    }
}

/// Score of one node; raw before normalization, bounded after
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeScore {
    pub name: String,
    pub score: i64,
}

impl NodeScore {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

static NEXT_CYCLE_ID: AtomicU64 = AtomicU64::new(1);

/// Per-cycle state handed to every plugin call of one scheduling cycle
#[derive(Debug)]
pub struct CycleState {
    id: u64,
}

impl CycleState {
    pub fn new() -> Self {
        Self {
            id: NEXT_CYCLE_ID.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Process-unique id, used to correlate log lines of one cycle
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Default for CycleState {
    fn default() -> Self {
        Self::new()
    }
}

/// Base trait of every plugin
pub trait Plugin: Send + Sync {
    /// Name of the plugin, used in profiles and logs
    fn name(&self) -> &str;
}

/// Plugin that ranks feasible nodes
#[async_trait]
pub trait ScorePlugin: Plugin {
    /// Raw score of `node_name` for `pod`
    ///
    /// On failure the score is 0 and the status carries the cause. Calls
    /// for different nodes may run concurrently.
    async fn score(
        &self,
        ctx: &CancellationToken,
        state: &CycleState,
        pod: &Pod,
        node_name: &str,
    ) -> (i64, Status);

    /// Normalization hook, if the plugin's raw scores need rescaling
    fn score_extensions(&self) -> Option<&dyn ScoreExtensions> {
        None
    }
}

/// Cross-node hook run once per cycle after all scores are in
pub trait ScoreExtensions: Send + Sync {
    /// Rewrite `scores` in place into `[MIN_NODE_SCORE, MAX_NODE_SCORE]`
    fn normalize_score(
        &self,
        ctx: &CancellationToken,
        state: &CycleState,
        pod: &Pod,
        scores: &mut [NodeScore],
    ) -> Status;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status() {
        let ok = Status::success();
        assert!(ok.is_success());
        assert_eq!(ok.to_string(), "Success");

        let err = Status::error("backend down");
        assert!(!err.is_success());
        assert_eq!(err.code(), Code::Error);
        assert_eq!(err.reasons(), ["backend down".to_string()]);
        assert_eq!(err.to_string(), "Error: backend down");
    }

    #[test]
    fn test_cycle_ids_are_unique() {
        let a = CycleState::new();
        let b = CycleState::new();
        assert_ne!(a.id(), b.id());
    }
}
