//! Global configuration resolution.
//!
//! # Merge Order
//!
//! Lowest to highest priority:
//!
//! 1. Built-in defaults ([`GlobalConfig::default`])
//! 2. Configuration file (YAML or JSON) or an in-memory mapping
//! 3. `HOOKS_*` environment variables (a `.env` file is loaded first if present)
//! 4. Programmatic overrides supplied by the caller
//!
//! Unknown keys are ignored at every layer. Known keys are type- and
//! range-checked after the merge.
//!
//! # Environment Variables
//!
//! | Variable | Key | Type |
//! |----------|-----|------|
//! | `HOOKS_HANDLER_PLUGIN_DIR` | `handler_plugin_dir` | string |
//! | `HOOKS_AUTH_PLUGIN_DIR` | `auth_plugin_dir` | string |
//! | `HOOKS_LIFECYCLE_PLUGIN_DIR` | `lifecycle_plugin_dir` | string |
//! | `HOOKS_INSTRUMENTS_PLUGIN_DIR` | `instruments_plugin_dir` | string |
//! | `HOOKS_LOG_LEVEL` | `log_level` | tag |
//! | `HOOKS_REQUEST_LIMIT` | `request_limit` | integer (bytes) |
//! | `HOOKS_REQUEST_TIMEOUT` | `request_timeout` | integer (seconds) |
//! | `HOOKS_ROOT_PATH` | `root_path` | string |
//! | `HOOKS_HEALTH_PATH` | `health_path` | string |
//! | `HOOKS_VERSION_PATH` | `version_path` | string |
//! | `HOOKS_ENVIRONMENT` | `environment` | tag |
//! | `HOOKS_ENDPOINTS_DIR` | `endpoints_config_dir` | string |
//! | `HOOKS_USE_CATCHALL_ROUTE` | `use_catchall_route` | boolean |
//! | `HOOKS_NORMALIZE_HEADERS` | `normalize_headers` | boolean |
//! | `HOOKS_HOST` | `host` | string |
//! | `HOOKS_PORT` | `port` | integer |
//! | `HOOKS_METRICS_PORT` | `metrics_port` | integer (0 = disabled) |
//!
//! Booleans are true for `true`, `1`, `yes` or `on` (case-insensitive) and
//! false for anything else.

pub mod endpoint;
pub mod loader;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};
use crate::validation::validate_route_path;

pub use endpoint::{AuthConfig, DEFAULT_IP_HEADER, EndpointConfig, IpFilterConfig, resolve_endpoints};

/// Tokens accepted as `true` for boolean environment overrides.
pub const TRUTHY_TOKENS: [&str; 4] = ["true", "1", "yes", "on"];

/// How an environment override is coerced before merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnvKind {
    String,
    Integer,
    Boolean,
    /// Trimmed and lowercased, for enum-like keys.
    Tag,
}

const ENV_OVERRIDES: &[(&str, &str, EnvKind)] = &[
    ("HOOKS_HANDLER_PLUGIN_DIR", "handler_plugin_dir", EnvKind::String),
    ("HOOKS_AUTH_PLUGIN_DIR", "auth_plugin_dir", EnvKind::String),
    ("HOOKS_LIFECYCLE_PLUGIN_DIR", "lifecycle_plugin_dir", EnvKind::String),
    ("HOOKS_INSTRUMENTS_PLUGIN_DIR", "instruments_plugin_dir", EnvKind::String),
    ("HOOKS_LOG_LEVEL", "log_level", EnvKind::Tag),
    ("HOOKS_REQUEST_LIMIT", "request_limit", EnvKind::Integer),
    ("HOOKS_REQUEST_TIMEOUT", "request_timeout", EnvKind::Integer),
    ("HOOKS_ROOT_PATH", "root_path", EnvKind::String),
    ("HOOKS_HEALTH_PATH", "health_path", EnvKind::String),
    ("HOOKS_VERSION_PATH", "version_path", EnvKind::String),
    ("HOOKS_ENVIRONMENT", "environment", EnvKind::Tag),
    ("HOOKS_ENDPOINTS_DIR", "endpoints_config_dir", EnvKind::String),
    ("HOOKS_USE_CATCHALL_ROUTE", "use_catchall_route", EnvKind::Boolean),
    ("HOOKS_NORMALIZE_HEADERS", "normalize_headers", EnvKind::Boolean),
    ("HOOKS_HOST", "host", EnvKind::String),
    ("HOOKS_PORT", "port", EnvKind::Integer),
    ("HOOKS_METRICS_PORT", "metrics_port", EnvKind::Integer),
];

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

/// Minimum log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string for `tracing_subscriber::EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Where the file layer of the configuration comes from.
#[derive(Debug, Clone, Default)]
pub enum ConfigSource {
    /// A YAML or JSON file that must exist.
    Path(PathBuf),
    /// An already parsed mapping.
    Map(Map<String, Value>),
    /// Defaults and environment only.
    #[default]
    None,
}

/// Validated, immutable gateway configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    // =========================================================================
    // Plugin Directories
    // =========================================================================
    pub handler_plugin_dir: PathBuf,
    pub auth_plugin_dir: PathBuf,
    pub lifecycle_plugin_dir: PathBuf,
    pub instruments_plugin_dir: PathBuf,

    // =========================================================================
    // Request Limits
    // =========================================================================
    /// Maximum request body size in bytes (default: 1 MiB)
    pub request_limit: u64,
    /// Request timeout in seconds, enforced by the server layer (default: 30)
    pub request_timeout: u64,

    // =========================================================================
    // Routing
    // =========================================================================
    /// Prefix for every webhook endpoint (default: "/webhooks")
    pub root_path: String,
    pub health_path: String,
    pub version_path: String,
    pub endpoints_config_dir: PathBuf,
    /// Accept POSTs to unmatched paths under the root (development only)
    pub use_catchall_route: bool,
    /// Lowercase header names and trim values before handing them to handlers
    pub normalize_headers: bool,

    // =========================================================================
    // Security
    // =========================================================================
    /// Global IP filter, replaced wholesale by an endpoint-level filter
    pub ip_filtering: Option<IpFilterConfig>,

    // =========================================================================
    // Runtime
    // =========================================================================
    pub log_level: LogLevel,
    pub environment: Environment,
    /// Derived from `environment`; never read from input
    #[serde(skip)]
    pub production: bool,
    pub host: String,
    pub port: u16,
    /// Prometheus exporter port (0 = disabled)
    pub metrics_port: u16,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            handler_plugin_dir: PathBuf::from("./plugins/handlers"),
            auth_plugin_dir: PathBuf::from("./plugins/auth"),
            lifecycle_plugin_dir: PathBuf::from("./plugins/lifecycle"),
            instruments_plugin_dir: PathBuf::from("./plugins/instruments"),
            request_limit: 1_048_576,
            request_timeout: 30,
            root_path: "/webhooks".to_string(),
            health_path: "/health".to_string(),
            version_path: "/version".to_string(),
            endpoints_config_dir: PathBuf::from("./config/endpoints"),
            use_catchall_route: false,
            normalize_headers: true,
            ip_filtering: None,
            log_level: LogLevel::Info,
            environment: Environment::Production,
            production: true,
            host: "0.0.0.0".to_string(),
            port: 8080,
            metrics_port: 0,
        }
    }
}

impl GlobalConfig {
    /// Resolve configuration from `source`, the process environment and
    /// `overrides`.
    ///
    /// Loads a `.env` file from the working directory first, if one exists.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if a file path is given but absent
    /// - [`ConfigError::Parse`] for malformed or unsupported files
    /// - [`ConfigError::Validation`] if merged values violate the schema
    pub fn resolve(source: ConfigSource, overrides: Map<String, Value>) -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::resolve_with_env(source, overrides, |name| env::var(name).ok())
    }

    /// Resolve with an explicit environment lookup.
    ///
    /// Tests use this to supply variables without touching the process
    /// environment.
    pub fn resolve_with_env<F>(
        source: ConfigSource,
        overrides: Map<String, Value>,
        lookup: F,
    ) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file_layer = match source {
            ConfigSource::Path(path) => loader::read_mapping(&path)?,
            ConfigSource::Map(map) => map,
            ConfigSource::None => Map::new(),
        };

        let mut merged = match serde_json::to_value(Self::default()) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        merged.extend(file_layer);
        merged.extend(env_layer(lookup)?);
        merged.extend(overrides);

        let mut config: Self = serde_json::from_value(Value::Object(merged))
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        config.production = config.environment == Environment::Production;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> ConfigResult<()> {
        if self.request_limit == 0 {
            return Err(ConfigError::Validation(
                "request_limit must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::Validation(
                "request_timeout must be greater than 0".to_string(),
            ));
        }

        if self.root_path != "/" {
            validate_route_path(&self.root_path)
                .map_err(|e| ConfigError::Validation(format!("root_path: {e}")))?;
        }
        validate_route_path(&self.health_path)
            .map_err(|e| ConfigError::Validation(format!("health_path: {e}")))?;
        validate_route_path(&self.version_path)
            .map_err(|e| ConfigError::Validation(format!("version_path: {e}")))?;
        if same_route(&self.health_path, &self.version_path) {
            return Err(ConfigError::Validation(format!(
                "health_path and version_path are both '{}'",
                self.health_path
            )));
        }

        let dirs = [
            ("handler_plugin_dir", &self.handler_plugin_dir),
            ("auth_plugin_dir", &self.auth_plugin_dir),
            ("lifecycle_plugin_dir", &self.lifecycle_plugin_dir),
            ("instruments_plugin_dir", &self.instruments_plugin_dir),
            ("endpoints_config_dir", &self.endpoints_config_dir),
        ];
        for (key, dir) in dirs {
            if dir.as_os_str().is_empty() {
                return Err(ConfigError::Validation(format!("{key} cannot be empty")));
            }
        }

        if let Some(filter) = &self.ip_filtering {
            filter.validate().map_err(ConfigError::Validation)?;
        }

        Ok(())
    }

    /// Reject endpoints whose full route is also the health or version route.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Validation`] naming the first colliding endpoint
    pub fn check_endpoint_routes(&self, endpoints: &[EndpointConfig]) -> ConfigResult<()> {
        for endpoint in endpoints {
            let route = self.endpoint_route(&endpoint.path);
            for (key, service) in [
                ("health_path", &self.health_path),
                ("version_path", &self.version_path),
            ] {
                if same_route(&route, service) {
                    return Err(ConfigError::Validation(format!(
                        "endpoint '{}' collides with {key} '{service}'",
                        endpoint.path
                    )));
                }
            }
        }
        Ok(())
    }

    /// Root path without a trailing slash, ready to prefix endpoint paths.
    pub fn route_prefix(&self) -> &str {
        self.root_path.trim_end_matches('/')
    }

    /// Full route for an endpoint path.
    pub fn endpoint_route(&self, endpoint_path: &str) -> String {
        format!("{}{endpoint_path}", self.route_prefix())
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        (self.metrics_port > 0)
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }
}

/// Build the environment override layer.
fn env_layer<F>(lookup: F) -> ConfigResult<Map<String, Value>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut layer = Map::new();

    for &(var, key, kind) in ENV_OVERRIDES {
        let Some(raw) = lookup(var) else {
            continue;
        };

        let value = match kind {
            EnvKind::String => Value::String(raw),
            EnvKind::Tag => Value::String(raw.trim().to_ascii_lowercase()),
            EnvKind::Boolean => Value::Bool(is_truthy(&raw)),
            EnvKind::Integer => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| ConfigError::Validation(format!("Invalid {var}: {e}")))?,
        };

        layer.insert(key.to_string(), value);
    }

    Ok(layer)
}

fn same_route(a: &str, b: &str) -> bool {
    a.trim_end_matches('/') == b.trim_end_matches('/')
}

/// Whether `value` is one of the [`TRUTHY_TOKENS`].
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    TRUTHY_TOKENS
        .iter()
        .any(|token| value.eq_ignore_ascii_case(token))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_default_config_values() {
        let config =
            GlobalConfig::resolve_with_env(ConfigSource::None, Map::new(), no_env).unwrap();

        assert_eq!(config, GlobalConfig::default());
        assert_eq!(config.request_limit, 1_048_576);
        assert_eq!(config.root_path, "/webhooks");
        assert!(config.production);
        assert!(config.normalize_headers);
        assert!(!config.use_catchall_route);
    }

    #[test]
    fn test_file_layer_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hooks.yml");
        std::fs::write(
            &path,
            "log_level: debug\nrequest_limit: 2048\nenvironment: development\nroot_path: /hooks\n",
        )
        .unwrap();

        let config =
            GlobalConfig::resolve_with_env(ConfigSource::Path(path), Map::new(), no_env).unwrap();

        let expected = GlobalConfig {
            log_level: LogLevel::Debug,
            request_limit: 2048,
            environment: Environment::Development,
            production: false,
            root_path: "/hooks".to_string(),
            ..GlobalConfig::default()
        };
        assert_eq!(config, expected);
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = GlobalConfig::resolve_with_env(
            ConfigSource::Path(PathBuf::from("/nope/hooks.yml")),
            Map::new(),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let source = ConfigSource::Map(map(json!({"not_a_key": 1, "port": 9000})));
        let config = GlobalConfig::resolve_with_env(source, Map::new(), no_env).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_env_overrides_file() {
        let source = ConfigSource::Map(map(json!({"request_limit": 10, "log_level": "debug"})));
        let env = env_from(&[
            ("HOOKS_REQUEST_LIMIT", "4096"),
            ("HOOKS_LOG_LEVEL", " WARN "),
            ("HOOKS_USE_CATCHALL_ROUTE", "Yes"),
            ("HOOKS_NORMALIZE_HEADERS", "nope"),
            ("HOOKS_ENDPOINTS_DIR", "/etc/hooks/endpoints"),
        ]);

        let config = GlobalConfig::resolve_with_env(source, Map::new(), env).unwrap();
        assert_eq!(config.request_limit, 4096);
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(config.use_catchall_route);
        assert!(!config.normalize_headers);
        assert_eq!(
            config.endpoints_config_dir,
            PathBuf::from("/etc/hooks/endpoints")
        );
    }

    #[test]
    fn test_programmatic_overrides_win() {
        let env = env_from(&[("HOOKS_ENVIRONMENT", "production")]);
        let overrides = map(json!({"environment": "development"}));

        let config = GlobalConfig::resolve_with_env(ConfigSource::None, overrides, env).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert!(!config.production);
    }

    #[test]
    fn test_invalid_integer_env() {
        let env = env_from(&[("HOOKS_REQUEST_TIMEOUT", "soon")]);
        let err = GlobalConfig::resolve_with_env(ConfigSource::None, Map::new(), env).unwrap_err();
        assert!(err.to_string().contains("HOOKS_REQUEST_TIMEOUT"));
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let overrides = map(json!({"environment": "staging"}));
        let err =
            GlobalConfig::resolve_with_env(ConfigSource::None, overrides, no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_non_positive_limits_rejected() {
        for overrides in [json!({"request_limit": 0}), json!({"request_timeout": 0})] {
            let err = GlobalConfig::resolve_with_env(ConfigSource::None, map(overrides), no_env)
                .unwrap_err();
            assert!(err.to_string().contains("greater than 0"));
        }

        let negative = map(json!({"request_limit": -5}));
        assert!(GlobalConfig::resolve_with_env(ConfigSource::None, negative, no_env).is_err());
    }

    #[test]
    fn test_malformed_nested_ip_filtering() {
        let overrides = map(json!({"ip_filtering": {"allowlist": "10.0.0.0/8"}}));
        assert!(GlobalConfig::resolve_with_env(ConfigSource::None, overrides, no_env).is_err());
    }

    #[test]
    fn test_global_ip_filtering_parsed() {
        let overrides = map(json!({"ip_filtering": {"blocklist": ["1.2.3.4"]}}));
        let config = GlobalConfig::resolve_with_env(ConfigSource::None, overrides, no_env).unwrap();

        let filter = config.ip_filtering.unwrap();
        assert_eq!(filter.ip_header, DEFAULT_IP_HEADER);
        assert_eq!(filter.blocklist, vec!["1.2.3.4"]);
    }

    #[test]
    fn test_invalid_paths_rejected() {
        for overrides in [
            json!({"root_path": "webhooks"}),
            json!({"health_path": ""}),
            json!({"version_path": "/v{1}"}),
        ] {
            assert!(
                GlobalConfig::resolve_with_env(ConfigSource::None, map(overrides), no_env)
                    .is_err()
            );
        }
    }

    #[test]
    fn test_identical_service_paths_rejected() {
        let err = GlobalConfig::resolve_with_env(
            ConfigSource::None,
            map(json!({"health_path": "/status", "version_path": "/status"})),
            no_env,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("/status")));

        let trailing = GlobalConfig::resolve_with_env(
            ConfigSource::None,
            map(json!({"health_path": "/status", "version_path": "/status/"})),
            no_env,
        );
        assert!(trailing.is_err());
    }

    #[test]
    fn test_endpoint_colliding_with_service_route() {
        let config = GlobalConfig::resolve_with_env(
            ConfigSource::None,
            map(json!({"root_path": "/"})),
            no_env,
        )
        .unwrap();

        let health = [EndpointConfig::new("/health", "DefaultHandler")];
        let err = config.check_endpoint_routes(&health).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("health_path")));

        let version = [EndpointConfig::new("/version", "DefaultHandler")];
        assert!(config.check_endpoint_routes(&version).is_err());

        let fine = [EndpointConfig::new("/github", "DefaultHandler")];
        assert!(config.check_endpoint_routes(&fine).is_ok());
    }

    #[test]
    fn test_endpoint_route_under_root_does_not_collide() {
        let config = GlobalConfig::default();
        let endpoints = [EndpointConfig::new("/health", "DefaultHandler")];
        assert_eq!(config.endpoint_route("/health"), "/webhooks/health");
        assert!(config.check_endpoint_routes(&endpoints).is_ok());
    }

    #[test]
    fn test_endpoint_route() {
        let config = GlobalConfig::default();
        assert_eq!(config.endpoint_route("/github"), "/webhooks/github");

        let root = GlobalConfig {
            root_path: "/".to_string(),
            ..GlobalConfig::default()
        };
        assert_eq!(root.endpoint_route("/github"), "/github");
    }

    #[test]
    fn test_is_truthy() {
        for token in ["true", "TRUE", "1", "yes", "On"] {
            assert!(is_truthy(token), "{token}");
        }
        for token in ["false", "0", "", "enabled"] {
            assert!(!is_truthy(token), "{token}");
        }
    }

    #[test]
    fn test_metrics_addr() {
        assert!(GlobalConfig::default().metrics_addr().is_none());
        let config = GlobalConfig {
            metrics_port: 9090,
            ..GlobalConfig::default()
        };
        assert_eq!(config.metrics_addr().unwrap().port(), 9090);
    }
}
