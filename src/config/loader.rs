//! YAML/JSON document loading shared by global, endpoint and plugin configs.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};

use crate::error::{ConfigError, ConfigResult};

/// File extensions recognized as configuration documents.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["yml", "yaml", "json"];

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yml" | "yaml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Whether `path` has a supported configuration extension.
pub fn is_config_file(path: &Path) -> bool {
    path.is_file() && Format::from_path(path).is_some()
}

/// Parse document text in the given format into a JSON value.
pub fn parse_str(text: &str, format: Format) -> Result<Value, String> {
    match format {
        Format::Yaml => serde_yaml::from_str::<Option<Value>>(text)
            .map(|value| value.unwrap_or(Value::Null))
            .map_err(|e| e.to_string()),
        Format::Json => {
            if text.trim().is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(text).map_err(|e| e.to_string())
        }
    }
}

/// Read a configuration document that must be a mapping at the top level.
///
/// An empty document is treated as an empty mapping.
///
/// # Errors
///
/// - [`ConfigError::NotFound`] if the file does not exist
/// - [`ConfigError::Parse`] for unsupported extensions, malformed content or
///   a non-mapping top level
/// - [`ConfigError::Io`] for read failures
pub fn read_mapping(path: &Path) -> ConfigResult<Map<String, Value>> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let format = Format::from_path(path).ok_or_else(|| ConfigError::Parse {
        path: path.to_path_buf(),
        message: format!(
            "unsupported format (expected one of: {})",
            SUPPORTED_EXTENSIONS.join(", ")
        ),
    })?;

    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let parse_error = |message: String| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    };

    match parse_str(&text, format).map_err(parse_error)? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            message: format!("expected a mapping at the top level, found {}", type_name(&other)),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
