use std::path::PathBuf;

use axum::http::StatusCode;
use thiserror::Error;

use crate::plugins::HandlerError;

/// Boot-time configuration failures.
///
/// All variants are fatal: the gateway refuses to start rather than serve
/// traffic with a partially valid configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to parse configuration {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Validation(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Boot-time plugin discovery and registration failures.
#[derive(Error, Debug)]
pub enum PluginLoadError {
    #[error("Plugin file {} escapes plugin directory {}", path.display(), dir.display())]
    PathViolation { path: PathBuf, dir: PathBuf },

    #[error("Plugin name '{name}' rejected: {reason}")]
    NameRejected { name: String, reason: String },

    #[error("Plugin '{name}' does not implement the {expected} capability")]
    ContractViolation { name: String, expected: String },

    /// Lookup miss. Lists the registered names to help operators spot typos.
    #[error("{kind} plugin '{name}' not found. Available: {}", available.join(", "))]
    NotFound {
        kind: &'static str,
        name: String,
        available: Vec<String>,
    },

    #[error("Failed to load plugin {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("Failed to scan plugin directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-request failures, converted to HTTP responses at the pipeline boundary.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("IP address not allowed")]
    IpFilterDenied,

    #[error("Request body too large: exceeds limit of {limit} bytes")]
    RequestTooLarge { limit: u64 },

    /// Deliberately generic so clients cannot tell which check failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// The endpoint names a secret variable that is not set. This is an
    /// operator misconfiguration, not a client fault.
    #[error("Secret environment variable '{0}' is not set")]
    MissingSecret(String),

    #[error(transparent)]
    UnknownPlugin(#[from] PluginLoadError),

    #[error("Handler returned status {}", .0.status)]
    Declared(HandlerError),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl RequestError {
    /// HTTP status this failure maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            RequestError::IpFilterDenied => StatusCode::FORBIDDEN,
            RequestError::RequestTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            RequestError::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            RequestError::Declared(err) => err.status,
            RequestError::MissingSecret(_)
            | RequestError::UnknownPlugin(_)
            | RequestError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error tag used in response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            RequestError::IpFilterDenied => "ip_filtering_failed",
            RequestError::RequestTooLarge { .. } => "request_too_large",
            RequestError::AuthenticationFailed => "authentication_failed",
            RequestError::Declared(_) => "handler_error",
            RequestError::MissingSecret(_)
            | RequestError::UnknownPlugin(_)
            | RequestError::Unhandled(_) => "server_error",
        }
    }

    /// Whether this failure is unexpected and should run `on_error` hooks
    /// and reach the failbot sink.
    pub fn is_unhandled(&self) -> bool {
        self.status() == StatusCode::INTERNAL_SERVER_ERROR
            && !matches!(self, RequestError::Declared(_))
    }
}

/// Convenience type alias for configuration results.
pub type ConfigResult<T> = Result<T, ConfigError>;
