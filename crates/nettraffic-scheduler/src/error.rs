use miette::Diagnostic;
use thiserror::Error;

/// Scheduler plugin error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Plugin arguments could not be decoded or validated
    #[error("Invalid arguments for plugin {plugin}: {message}")]
    #[diagnostic(
        code(scheduler::invalid_plugin_args),
        help("Check the args block of the plugin in the scheduler profile")
    )]
    InvalidPluginArgs {
        #[allow(unused)]
        plugin: String,
        #[allow(unused)]
        message: String,
    },

    /// No factory registered under this name
    #[error("Unknown plugin: {name}")]
    #[diagnostic(
        code(scheduler::unknown_plugin),
        help("Registered plugins: {available}")
    )]
    UnknownPlugin {
        #[allow(unused)]
        name: String,
        #[allow(unused)]
        available: String,
    },

    /// Two factories registered under the same name
    #[error("Plugin {name} is already registered")]
    #[diagnostic(code(scheduler::duplicate_plugin))]
    DuplicatePlugin {
        #[allow(unused)]
        name: String,
    },

    /// Profile file could not be read or parsed
    #[error("Failed to load scheduler profile {path}: {message}")]
    #[diagnostic(
        code(scheduler::config_error),
        help("The profile is YAML (or JSON) with a `plugins` list of name/args entries")
    )]
    ConfigError {
        #[allow(unused)]
        path: String,
        #[allow(unused)]
        message: String,
    },

    /// Host passed the same candidate node more than once
    #[error("Node {node_name} appears more than once in the candidate list")]
    #[diagnostic(
        code(scheduler::duplicate_node),
        help("Pass each candidate node once per scheduling cycle")
    )]
    DuplicateNode {
        #[allow(unused)]
        node_name: String,
    },

    /// A plugin's normalize hook rejected the batch
    #[error("Normalizing scores with plugin {plugin} failed: {message}")]
    #[diagnostic(code(scheduler::normalize_failed))]
    NormalizeFailed {
        #[allow(unused)]
        plugin: String,
        #[allow(unused)]
        message: String,
    },

    /// Metric source error
    #[error(transparent)]
    #[diagnostic(transparent)]
    MetricsError(#[from] nettraffic_metrics::MetricsError),
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create an InvalidPluginArgs error
    pub fn invalid_plugin_args(plugin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPluginArgs {
            plugin: plugin.into(),
            message: message.into(),
        }
    }

    /// Create a ConfigError
    pub fn config_error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigError {
            path: path.into(),
            message: message.into(),
        }
    }
}
