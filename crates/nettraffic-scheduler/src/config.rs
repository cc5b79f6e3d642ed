use crate::error::{Result, SchedulerError};
use crate::registry::Registry;
use crate::runner::ScoreRunner;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

fn default_scheduler_name() -> String {
    "default-scheduler".to_string()
}

fn default_weight() -> i64 {
    1
}

/// One enabled score plugin and its arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: i64,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Scheduler profile: which score plugins run and how they are configured
///
/// ```yaml
/// schedulerName: bandwidth-aware
/// plugins:
///   - name: NetworkTraffic
///     weight: 1
///     args:
///       ip: http://prometheus:9090
///       deviceName: eth0
///       timeRange: 5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerProfile {
    #[serde(default = "default_scheduler_name")]
    pub scheduler_name: String,
    #[serde(default)]
    pub plugins: Vec<PluginConfig>,
}

impl SchedulerProfile {
    /// Parse a profile from YAML (JSON is accepted too)
    pub fn from_yaml(source: &str, data: &str) -> Result<Self> {
        serde_yaml::from_str(data).map_err(|e| SchedulerError::config_error(source, e.to_string()))
    }

    /// Load a profile from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let data = std::fs::read_to_string(path)
            .map_err(|e| SchedulerError::config_error(&display, e.to_string()))?;
        Self::from_yaml(&display, &data)
    }

    /// Arguments of the plugin named `name`, if enabled
    pub fn plugin_args(&self, name: &str) -> Option<&serde_json::Value> {
        self.plugins.iter().find(|p| p.name == name).map(|p| &p.args)
    }

    /// Instantiate every enabled plugin through `registry`
    pub fn build_runner(&self, registry: &Registry) -> Result<ScoreRunner> {
        if self.plugins.is_empty() {
            return Err(SchedulerError::config_error(
                &self.scheduler_name,
                "profile enables no score plugins",
            ));
        }

        let mut runner = ScoreRunner::new();
        for plugin in &self.plugins {
            if plugin.weight <= 0 {
                return Err(SchedulerError::invalid_plugin_args(
                    &plugin.name,
                    format!("weight must be positive, got {}", plugin.weight),
                ));
            }
            let instance = registry.instantiate(&plugin.name, plugin.args.clone())?;
            info!(
                "Enabled score plugin {} (weight {}) in profile {}",
                plugin.name, plugin.weight, self.scheduler_name
            );
            runner = runner.with_plugin(instance, plugin.weight);
        }

        Ok(runner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::default_registry;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROFILE: &str = r#"
schedulerName: bandwidth-aware
plugins:
  - name: NetworkTraffic
    args:
      ip: http://prometheus:9090
      deviceName: eth0
      timeRange: 5
"#;

    #[test]
    fn test_parse_profile() {
        let profile = SchedulerProfile::from_yaml("inline", PROFILE).unwrap();
        assert_eq!(profile.scheduler_name, "bandwidth-aware");
        assert_eq!(profile.plugins.len(), 1);
        assert_eq!(profile.plugins[0].weight, 1);

        let args = profile.plugin_args("NetworkTraffic").unwrap();
        assert_eq!(args["deviceName"], "eth0");
        assert_eq!(args["timeRange"], 5);
        assert!(profile.plugin_args("Other").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(PROFILE.as_bytes()).unwrap();

        let profile = SchedulerProfile::from_file(file.path()).unwrap();
        assert_eq!(profile.plugins[0].name, "NetworkTraffic");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = SchedulerProfile::from_file(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, SchedulerError::ConfigError { .. }));
    }

    #[test]
    fn test_json_profile_defaults() {
        let profile = SchedulerProfile::from_yaml("inline", r#"{"plugins": []}"#).unwrap();
        assert_eq!(profile.scheduler_name, "default-scheduler");
        assert!(profile.plugins.is_empty());
    }

    #[test]
    fn test_build_runner() {
        let profile = SchedulerProfile::from_yaml("inline", PROFILE).unwrap();
        let runner = profile.build_runner(&default_registry().unwrap()).unwrap();
        assert_eq!(runner.plugin_names(), vec!["NetworkTraffic"]);
    }

    #[test]
    fn test_build_runner_rejects_empty_profile() {
        let profile = SchedulerProfile::from_yaml("inline", "plugins: []").unwrap();
        assert!(profile.build_runner(&default_registry().unwrap()).is_err());
    }

    #[test]
    fn test_build_runner_rejects_bad_weight() {
        let data = PROFILE.replace("  - name: NetworkTraffic\n", "  - name: NetworkTraffic\n    weight: 0\n");
        let profile = SchedulerProfile::from_yaml("inline", &data).unwrap();
        let err = profile.build_runner(&default_registry().unwrap()).err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidPluginArgs { .. }));
    }
}
