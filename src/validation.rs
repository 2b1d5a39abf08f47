//! Name and path validation shared by the config loader and plugin registry.
//!
//! Plugin identifiers come from file names and endpoint configuration, both of
//! which are operator-controlled but not necessarily trusted. Everything that
//! turns a string into a registry key goes through this module.

use std::path::{Path, PathBuf};

/// Maximum length for plugin identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 128;

/// Identifiers that shadow runtime or standard-library primitives.
///
/// A handler or plugin named after one of these is rejected outright, even if
/// a catalog entry with that name exists.
pub const DANGEROUS_NAMES: &[&str] = &[
    "Arc",
    "BasicSocket",
    "Box",
    "Class",
    "Command",
    "Dir",
    "Env",
    "Fiber",
    "File",
    "Io",
    "Kernel",
    "Marshal",
    "Method",
    "Module",
    "Mutex",
    "Object",
    "Option",
    "Path",
    "PathBuf",
    "Proc",
    "Process",
    "Result",
    "Socket",
    "String",
    "TcpListener",
    "TcpStream",
    "Thread",
    "UdpSocket",
    "Unsafe",
    "Vec",
];

/// Convert a `snake_case` file stem to a `PascalCase` identifier.
///
/// Splits on underscores and capitalizes each segment; empty segments are
/// dropped. Identifiers already in `PascalCase` pass through unchanged.
///
/// ```
/// use hooks_gateway::validation::to_type_name;
///
/// assert_eq!(to_type_name("github_push_handler"), "GithubPushHandler");
/// assert_eq!(to_type_name("GithubHandler"), "GithubHandler");
/// ```
pub fn to_type_name(stem: &str) -> String {
    stem.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Validate a canonical plugin identifier.
///
/// Rules:
/// - Must be between 1 and [`MAX_IDENTIFIER_LENGTH`] characters
/// - Must start with an uppercase ASCII letter
/// - Can contain ASCII alphanumerics and underscores only
/// - Must not appear in [`DANGEROUS_NAMES`]
///
/// Returns the rejection reason on failure.
pub fn validate_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("identifier cannot be empty".to_string());
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(format!(
            "identifier cannot exceed {MAX_IDENTIFIER_LENGTH} characters"
        ));
    }

    if !name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return Err("identifier must start with an uppercase letter".to_string());
    }

    if let Some((i, c)) = name
        .char_indices()
        .find(|(_, c)| !c.is_ascii_alphanumeric() && *c != '_')
    {
        return Err(format!(
            "identifier contains invalid character '{}' at position {i}",
            c.escape_default()
        ));
    }

    if DANGEROUS_NAMES.contains(&name) {
        return Err(format!("'{name}' shadows a runtime primitive"));
    }

    Ok(())
}

/// Canonicalize a user-supplied plugin name and validate the result.
///
/// Accepts either `snake_case` (`github_handler`) or `PascalCase`
/// (`GithubHandler`) and returns the `PascalCase` form.
pub fn canonical_plugin_name(raw: &str) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed != raw {
        return Err("name must not contain surrounding whitespace".to_string());
    }
    let name = to_type_name(raw);
    validate_identifier(&name)?;
    Ok(name)
}

/// Check that `path` resolves to a location inside `dir`.
///
/// Both paths are canonicalized, so symlinks and `..` components pointing
/// outside the directory are caught. Returns the canonical file path on
/// success, `None` if the file escapes or cannot be resolved.
pub fn contained_path(dir: &Path, path: &Path) -> Option<PathBuf> {
    let canonical_dir = dir.canonicalize().ok()?;
    let canonical_path = path.canonicalize().ok()?;

    canonical_path
        .starts_with(&canonical_dir)
        .then_some(canonical_path)
}

/// Validate an endpoint route path after normalization.
///
/// Only `/`-separated segments of ASCII alphanumerics, `_`, `-` and `.` are
/// allowed so that the path can be mounted on the router verbatim.
pub fn validate_route_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err(format!("path '{path}' must start with '/'"));
    }

    if path.contains("//") {
        return Err(format!("path '{path}' contains an empty segment"));
    }

    if path.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(format!("path '{path}' contains a relative segment"));
    }

    if let Some(c) = path
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !matches!(c, '/' | '_' | '-' | '.'))
    {
        return Err(format!(
            "path '{path}' contains invalid character '{}'",
            c.escape_default()
        ));
    }

    Ok(())
}
