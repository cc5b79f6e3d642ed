use miette::Diagnostic;
use thiserror::Error;

/// Metric source error type
#[derive(Error, Debug, Diagnostic)]
pub enum MetricsError {
    /// Backend address could not be turned into a client configuration
    #[error("Invalid backend address '{address}': {reason}")]
    #[diagnostic(
        code(nettraffic::metrics::invalid_backend_address),
        help("Use an absolute http(s) URL such as http://prometheus:9090")
    )]
    InvalidBackendAddress {
        #[allow(unused)]
        address: String,
        #[allow(unused)]
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(nettraffic::metrics::invalid_config), help("{suggestion}"))]
    InvalidConfig {
        #[allow(unused)]
        message: String,
        #[allow(unused)]
        suggestion: String,
    },

    /// Request never produced an HTTP response
    #[error("Error querying backend: {message}")]
    #[diagnostic(
        code(nettraffic::metrics::transport),
        help("Check that the metrics backend is reachable from the scheduler host")
    )]
    Transport {
        #[allow(unused)]
        message: String,
    },

    /// Backend answered with an error
    #[error("Backend returned {error_type} error: {message}")]
    #[diagnostic(
        code(nettraffic::metrics::backend_error),
        help("Inspect the generated query and the backend logs")
    )]
    BackendError {
        #[allow(unused)]
        error_type: String,
        #[allow(unused)]
        message: String,
    },

    /// Backend answered with a body we could not decode
    #[error("Failed to decode backend response: {message}")]
    #[diagnostic(
        code(nettraffic::metrics::decode_error),
        help("Verify the backend speaks the Prometheus HTTP API")
    )]
    DecodeError {
        #[allow(unused)]
        message: String,
    },

    /// Query evaluated to something other than an instant vector
    #[error("Invalid response, expected vector result, got {result_type}")]
    #[diagnostic(code(nettraffic::metrics::unexpected_result_type))]
    UnexpectedResultType {
        #[allow(unused)]
        result_type: String,
    },

    /// Zero or several series matched the node
    #[error("Invalid response for node '{node_name}', expected 1 value, got {count}")]
    #[diagnostic(
        code(nettraffic::metrics::ambiguous_measurement),
        help("Check that node_uname_info carries a nodename label matching the node and that the device exists")
    )]
    AmbiguousMeasurement {
        #[allow(unused)]
        node_name: String,
        #[allow(unused)]
        count: usize,
    },

    /// Sample value was not a usable byte count
    #[error("Invalid sample value '{value}' for node '{node_name}'")]
    #[diagnostic(code(nettraffic::metrics::invalid_sample_value))]
    InvalidSampleValue {
        #[allow(unused)]
        node_name: String,
        #[allow(unused)]
        value: String,
    },
}

/// Result type for metric source operations
pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    /// Create an InvalidBackendAddress error
    pub fn invalid_backend_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidBackendAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidConfig error
    pub fn invalid_config(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a BackendError
    pub fn backend_error(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendError {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Create a DecodeError
    pub fn decode_error(message: impl Into<String>) -> Self {
        Self::DecodeError {
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            // Prometheus reports overload and shutdown as 503 "unavailable"
            Self::BackendError { error_type, .. } => {
                error_type == "unavailable" || error_type.starts_with("http 5")
            }
            _ => false,
        }
    }
}
