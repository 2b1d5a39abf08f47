//! Per-endpoint configuration files.
//!
//! Each file in the endpoints directory declares one webhook route:
//!
//! ```yaml
//! path: /github
//! handler: github_handler
//! auth:
//!   type: hmac
//!   secret_env_key: GITHUB_WEBHOOK_SECRET
//!   header: X-Hub-Signature-256
//!   algorithm: sha256
//!   format: "algorithm=signature"
//! ip_filtering:
//!   allowlist: ["140.82.112.0/20"]
//! opts:
//!   team: platform
//! ```
//!
//! The set of endpoints is loaded once at startup and never reloaded.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::loader::{is_config_file, read_mapping};
use crate::error::{ConfigError, ConfigResult};
use crate::validation::{canonical_plugin_name, to_type_name, validate_route_path};

/// Default header carrying the client address.
pub const DEFAULT_IP_HEADER: &str = "X-Forwarded-For";

/// Authentication policy for one endpoint.
///
/// The secret itself is never part of configuration; `secret_env_key` names
/// the environment variable that holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Auth plugin name (`hmac`, `shared_secret`, or a custom plugin).
    #[serde(rename = "type")]
    pub kind: String,
    /// Environment variable holding the shared secret. Absent = auth skipped.
    #[serde(default)]
    pub secret_env_key: Option<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub timestamp_header: Option<String>,
    /// Replay window in seconds.
    #[serde(default)]
    pub timestamp_tolerance: Option<u64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub version_prefix: Option<String>,
    #[serde(default)]
    pub payload_template: Option<String>,
}

impl AuthConfig {
    /// Registry key of the auth plugin this config selects.
    pub fn plugin_name(&self) -> String {
        to_type_name(&self.kind)
    }

    fn validate(&self) -> Result<(), String> {
        canonical_plugin_name(&self.kind).map_err(|e| format!("auth.type: {e}"))?;

        let non_empty = [
            ("secret_env_key", &self.secret_env_key),
            ("header", &self.header),
            ("algorithm", &self.algorithm),
            ("timestamp_header", &self.timestamp_header),
            ("format", &self.format),
            ("version_prefix", &self.version_prefix),
            ("payload_template", &self.payload_template),
        ];
        for (field, value) in non_empty {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("auth.{field} cannot be empty"));
            }
        }

        if self.timestamp_tolerance == Some(0) {
            return Err("auth.timestamp_tolerance must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// IP allow/block policy. Endpoint-level config replaces the global one
/// entirely; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpFilterConfig {
    #[serde(default = "default_ip_header")]
    pub ip_header: String,
    #[serde(default)]
    pub allowlist: Vec<String>,
    #[serde(default)]
    pub blocklist: Vec<String>,
}

fn default_ip_header() -> String {
    DEFAULT_IP_HEADER.to_string()
}

impl Default for IpFilterConfig {
    fn default() -> Self {
        Self {
            ip_header: default_ip_header(),
            allowlist: Vec::new(),
            blocklist: Vec::new(),
        }
    }
}

impl IpFilterConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.ip_header.trim().is_empty() {
            return Err("ip_filtering.ip_header cannot be empty".to_string());
        }
        Ok(())
    }
}

/// One declared webhook route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Route path relative to the configured root path.
    pub path: String,
    /// Handler plugin name. Canonical `PascalCase` after loading.
    pub handler: String,
    #[serde(default)]
    pub auth: Option<AuthConfig>,
    #[serde(default)]
    pub ip_filtering: Option<IpFilterConfig>,
    /// Free-form options handed to the handler unmodified.
    #[serde(default)]
    pub opts: Map<String, Value>,
}

impl EndpointConfig {
    /// Create an endpoint with just a path and handler.
    pub fn new(path: impl Into<String>, handler: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            handler: handler.into(),
            auth: None,
            ip_filtering: None,
            opts: Map::new(),
        }
    }

    /// Validate the endpoint and return it with a normalized path and a
    /// canonical handler name.
    pub fn validated(mut self) -> Result<Self, String> {
        let path = self.path.trim();
        if path.is_empty() {
            return Err("path cannot be empty".to_string());
        }
        self.path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };
        validate_route_path(&self.path)?;

        if self.handler.is_empty() {
            return Err("handler cannot be empty".to_string());
        }
        self.handler =
            canonical_plugin_name(&self.handler).map_err(|e| format!("handler: {e}"))?;

        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        if let Some(filter) = &self.ip_filtering {
            filter.validate()?;
        }

        Ok(self)
    }
}

/// Load every endpoint file from `dir` (non-recursive).
///
/// Files are processed in name order. A missing directory yields no
/// endpoints. Any invalid file aborts the whole load, naming its index and
/// path.
///
/// # Errors
///
/// - [`ConfigError::Parse`] / [`ConfigError::Io`] for unreadable files
/// - [`ConfigError::Validation`] for schema violations, unsafe handler names,
///   or duplicate paths
pub fn resolve_endpoints(dir: &Path) -> ConfigResult<Vec<EndpointConfig>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Endpoints directory not found, no endpoints loaded");
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if is_config_file(&path) {
            files.push(path);
        }
    }
    files.sort();

    let mut endpoints = Vec::with_capacity(files.len());
    let mut seen_paths = HashSet::new();

    for (index, file) in files.iter().enumerate() {
        let document = read_mapping(file)?;
        let invalid = |message: String| {
            ConfigError::Validation(format!(
                "endpoint #{index} ({}): {message}",
                file.display()
            ))
        };

        let endpoint: EndpointConfig = serde_json::from_value(Value::Object(document))
            .map_err(|e| invalid(e.to_string()))?;
        let endpoint = endpoint.validated().map_err(invalid)?;

        if !seen_paths.insert(endpoint.path.clone()) {
            return Err(invalid(format!("duplicate path '{}'", endpoint.path)));
        }

        debug!(path = %endpoint.path, handler = %endpoint.handler, "Loaded endpoint");
        endpoints.push(endpoint);
    }

    info!(count = endpoints.len(), dir = %dir.display(), "Endpoints loaded");
    Ok(endpoints)
}
