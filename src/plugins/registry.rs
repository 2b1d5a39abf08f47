//! Plugin discovery and lookup.
//!
//! # Loading rules
//!
//! Each configured plugin directory is scanned independently (non-recursive,
//! in file-name order). A directory that does not exist is skipped. For every
//! `*.yml`, `*.yaml` or `*.json` descriptor:
//!
//! 1. The canonical file path must descend from the canonical directory
//!    ([`PluginLoadError::PathViolation`])
//! 2. The file stem is converted to a `PascalCase` identifier
//! 3. The identifier must pass [`validate_identifier`]
//!    ([`PluginLoadError::NameRejected`])
//! 4. The descriptor is parsed and the identifier resolved in the
//!    [`PluginCatalog`] ([`PluginLoadError::Load`])
//! 5. The catalog entry must provide the directory's capability
//!    ([`PluginLoadError::ContractViolation`]); instrument entries must
//!    provide exactly one of stats or failbot
//! 6. The built plugin is registered. Lifecycle hooks keep file order; for
//!    instruments the last file providing a capability wins
//!
//! The first failure aborts the whole load.
//!
//! # Descriptor format
//!
//! ```yaml
//! # plugins/handlers/github_handler.yml
//! options:
//!   team: platform
//! ```
//!
//! An empty file is a valid descriptor with no options.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::builtin::{DefaultHandler, HmacAuth, NoopFailbot, NoopStats, SharedSecretAuth};
use super::catalog::{Capability, PluginCatalog};
use super::{AuthValidator, FailbotSink, Handler, LifecycleHook, StatsSink};
use crate::config::GlobalConfig;
use crate::config::loader::{is_config_file, read_mapping};
use crate::error::PluginLoadError;
use crate::validation::{contained_path, to_type_name, validate_identifier};

/// Instrumentation capability selector for [`PluginRegistry::get_instrument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Stats,
    Failbot,
}

/// A resolved instrumentation sink.
#[derive(Clone)]
pub enum Instrument {
    Stats(Arc<dyn StatsSink>),
    Failbot(Arc<dyn FailbotSink>),
}

/// Holds every plugin available to the request pipeline.
///
/// Populated once at startup and read-only afterwards. [`Self::clear`] and
/// [`Self::reload_all`] exist for test isolation and must not race with live
/// traffic.
pub struct PluginRegistry {
    auth: BTreeMap<String, Arc<dyn AuthValidator>>,
    handlers: BTreeMap<String, Arc<dyn Handler>>,
    lifecycle: Vec<(String, Arc<dyn LifecycleHook>)>,
    stats: Option<(String, Arc<dyn StatsSink>)>,
    failbot: Option<(String, Arc<dyn FailbotSink>)>,
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("auth", &self.auth_names())
            .field("handlers", &self.handler_names())
            .field("lifecycle", &self.lifecycle_names())
            .field("instruments", &self.instrument_names())
            .finish()
    }
}

impl Default for PluginRegistry {
    /// Built-ins only: `Hmac`, `SharedSecret`, `DefaultHandler` and no-op
    /// instruments.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.install_builtins();
        registry
    }
}

struct Descriptor {
    name: String,
    path: PathBuf,
    options: Value,
}

impl PluginRegistry {
    /// A registry with nothing registered, not even built-ins.
    pub fn empty() -> Self {
        Self {
            auth: BTreeMap::new(),
            handlers: BTreeMap::new(),
            lifecycle: Vec::new(),
            stats: None,
            failbot: None,
        }
    }

    fn install_builtins(&mut self) {
        self.auth.insert("Hmac".to_string(), Arc::new(HmacAuth));
        self.auth
            .insert("SharedSecret".to_string(), Arc::new(SharedSecretAuth));
        self.handlers
            .insert("DefaultHandler".to_string(), Arc::new(DefaultHandler));
        self.stats = Some(("NoopStats".to_string(), Arc::new(NoopStats)));
        self.failbot = Some(("NoopFailbot".to_string(), Arc::new(NoopFailbot)));
    }

    /// Build a registry from built-ins plus every configured plugin directory.
    ///
    /// # Errors
    ///
    /// Returns the first [`PluginLoadError`] encountered; nothing is
    /// registered in that case.
    pub fn load_all(
        config: &GlobalConfig,
        catalog: &PluginCatalog,
    ) -> Result<Self, PluginLoadError> {
        let mut registry = Self::default();

        for plugin in discover(&config.auth_plugin_dir)? {
            let built = catalog.build_auth(&plugin.name, &plugin.options);
            let validator = instantiate(built, &plugin, Capability::Auth, catalog)?;
            registry.auth.insert(plugin.name, validator);
        }

        for plugin in discover(&config.handler_plugin_dir)? {
            let built = catalog.build_handler(&plugin.name, &plugin.options);
            let handler = instantiate(built, &plugin, Capability::Handler, catalog)?;
            registry.handlers.insert(plugin.name, handler);
        }

        for plugin in discover(&config.lifecycle_plugin_dir)? {
            let built = catalog.build_lifecycle(&plugin.name, &plugin.options);
            let hook = instantiate(built, &plugin, Capability::Lifecycle, catalog)?;
            registry.lifecycle.push((plugin.name, hook));
        }

        for plugin in discover(&config.instruments_plugin_dir)? {
            registry.register_instrument(plugin, catalog)?;
        }

        info!(
            auth = ?registry.auth_names(),
            handlers = ?registry.handler_names(),
            lifecycle = ?registry.lifecycle_names(),
            instruments = ?registry.instrument_names(),
            "Plugins loaded"
        );

        Ok(registry)
    }

    /// Replace the contents of this registry with a fresh [`Self::load_all`].
    ///
    /// On error the current contents are left untouched.
    pub fn reload_all(
        &mut self,
        config: &GlobalConfig,
        catalog: &PluginCatalog,
    ) -> Result<(), PluginLoadError> {
        *self = Self::load_all(config, catalog)?;
        Ok(())
    }

    /// Drop every registration, built-ins included.
    pub fn clear(&mut self) {
        *self = Self::empty();
    }

    fn register_instrument(
        &mut self,
        plugin: Descriptor,
        catalog: &PluginCatalog,
    ) -> Result<(), PluginLoadError> {
        let capabilities = catalog
            .capabilities(&plugin.name)
            .ok_or_else(|| unknown_plugin(&plugin))?;

        let sinks: Vec<Capability> = capabilities
            .into_iter()
            .filter(|cap| matches!(cap, Capability::Stats | Capability::Failbot))
            .collect();

        match sinks.as_slice() {
            [Capability::Stats] => {
                let built = catalog.build_stats(&plugin.name, &plugin.options);
                let sink = instantiate(built, &plugin, Capability::Stats, catalog)?;
                self.stats = Some((plugin.name, sink));
            }
            [Capability::Failbot] => {
                let built = catalog.build_failbot(&plugin.name, &plugin.options);
                let sink = instantiate(built, &plugin, Capability::Failbot, catalog)?;
                self.failbot = Some((plugin.name, sink));
            }
            _ => {
                return Err(PluginLoadError::ContractViolation {
                    name: plugin.name,
                    expected: "exactly one of stats or failbot".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Register an auth validator directly, bypassing directory discovery.
    ///
    /// # Errors
    ///
    /// [`PluginLoadError::NameRejected`] if the name fails validation.
    pub fn register_auth(
        &mut self,
        name: &str,
        validator: Arc<dyn AuthValidator>,
    ) -> Result<(), PluginLoadError> {
        let name = checked_name(name)?;
        self.auth.insert(name, validator);
        Ok(())
    }

    /// Register a handler directly, bypassing directory discovery.
    pub fn register_handler(
        &mut self,
        name: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<(), PluginLoadError> {
        let name = checked_name(name)?;
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Append a lifecycle hook directly, bypassing directory discovery.
    pub fn register_lifecycle(
        &mut self,
        name: &str,
        hook: Arc<dyn LifecycleHook>,
    ) -> Result<(), PluginLoadError> {
        let name = checked_name(name)?;
        self.lifecycle.push((name, hook));
        Ok(())
    }

    /// Install an instrumentation sink directly. Replaces any previous sink
    /// of the same kind.
    pub fn register_instrument_sink(
        &mut self,
        name: &str,
        instrument: Instrument,
    ) -> Result<(), PluginLoadError> {
        let name = checked_name(name)?;
        match instrument {
            Instrument::Stats(sink) => self.stats = Some((name, sink)),
            Instrument::Failbot(sink) => self.failbot = Some((name, sink)),
        }
        Ok(())
    }

    pub fn get_auth(&self, name: &str) -> Result<Arc<dyn AuthValidator>, PluginLoadError> {
        self.auth
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("auth", name, self.auth_names()))
    }

    pub fn get_handler(&self, name: &str) -> Result<Arc<dyn Handler>, PluginLoadError> {
        self.handlers
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("handler", name, self.handler_names()))
    }

    pub fn get_instrument(&self, kind: InstrumentKind) -> Result<Instrument, PluginLoadError> {
        let found = match kind {
            InstrumentKind::Stats => self
                .stats
                .as_ref()
                .map(|(_, sink)| Instrument::Stats(Arc::clone(sink))),
            InstrumentKind::Failbot => self
                .failbot
                .as_ref()
                .map(|(_, sink)| Instrument::Failbot(Arc::clone(sink))),
        };
        let label = match kind {
            InstrumentKind::Stats => "stats",
            InstrumentKind::Failbot => "failbot",
        };
        found.ok_or_else(|| not_found("instrument", label, self.instrument_names()))
    }

    /// Stats sink, if one is registered.
    pub fn stats(&self) -> Option<Arc<dyn StatsSink>> {
        self.stats.as_ref().map(|(_, sink)| Arc::clone(sink))
    }

    /// Failbot sink, if one is registered.
    pub fn failbot(&self) -> Option<Arc<dyn FailbotSink>> {
        self.failbot.as_ref().map(|(_, sink)| Arc::clone(sink))
    }

    /// Lifecycle hooks in registration order.
    pub fn lifecycle_hooks(&self) -> impl Iterator<Item = (&str, &Arc<dyn LifecycleHook>)> {
        self.lifecycle
            .iter()
            .map(|(name, hook)| (name.as_str(), hook))
    }

    pub fn auth_names(&self) -> Vec<String> {
        self.auth.keys().cloned().collect()
    }

    pub fn handler_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    pub fn lifecycle_names(&self) -> Vec<String> {
        self.lifecycle.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn instrument_names(&self) -> Vec<String> {
        self.stats
            .iter()
            .map(|(name, _)| name.clone())
            .chain(self.failbot.iter().map(|(name, _)| name.clone()))
            .collect()
    }
}

fn checked_name(raw: &str) -> Result<String, PluginLoadError> {
    let name = to_type_name(raw);
    validate_identifier(&name).map_err(|reason| PluginLoadError::NameRejected {
        name: raw.to_string(),
        reason,
    })?;
    Ok(name)
}

fn not_found(kind: &'static str, name: &str, available: Vec<String>) -> PluginLoadError {
    PluginLoadError::NotFound {
        kind,
        name: name.to_string(),
        available,
    }
}

fn unknown_plugin(plugin: &Descriptor) -> PluginLoadError {
    PluginLoadError::Load {
        path: plugin.path.clone(),
        message: format!("no compiled-in plugin named '{}'", plugin.name),
    }
}

/// Map a catalog build attempt onto the loader's error taxonomy.
fn instantiate<T: ?Sized>(
    built: Option<anyhow::Result<Arc<T>>>,
    plugin: &Descriptor,
    expected: Capability,
    catalog: &PluginCatalog,
) -> Result<Arc<T>, PluginLoadError> {
    match built {
        Some(Ok(instance)) => {
            debug!(name = %plugin.name, capability = %expected, "Plugin registered");
            Ok(instance)
        }
        Some(Err(e)) => Err(PluginLoadError::Load {
            path: plugin.path.clone(),
            message: format!("{e:#}"),
        }),
        None if catalog.capabilities(&plugin.name).is_none() => Err(unknown_plugin(plugin)),
        None => Err(PluginLoadError::ContractViolation {
            name: plugin.name.clone(),
            expected: expected.to_string(),
        }),
    }
}

/// Steps 1-4 of the loading rules for one directory.
fn discover(dir: &Path) -> Result<Vec<Descriptor>, PluginLoadError> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Plugin directory not found, skipping");
        return Ok(Vec::new());
    }

    let io_error = |source| PluginLoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if is_config_file(&path) {
            files.push(path);
        }
    }
    files.sort();

    files
        .into_iter()
        .map(|path| describe(dir, path))
        .collect()
}

fn describe(dir: &Path, path: PathBuf) -> Result<Descriptor, PluginLoadError> {
    let Some(canonical) = contained_path(dir, &path) else {
        return Err(PluginLoadError::PathViolation {
            path,
            dir: dir.to_path_buf(),
        });
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let name = to_type_name(stem);
    validate_identifier(&name).map_err(|reason| PluginLoadError::NameRejected {
        name: stem.to_string(),
        reason,
    })?;

    let mut document = read_mapping(&canonical).map_err(|e| PluginLoadError::Load {
        path: path.clone(),
        message: e.to_string(),
    })?;
    let options = document.remove("options").unwrap_or(Value::Null);

    Ok(Descriptor {
        name,
        path,
        options,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pipeline::RequestContext;
    use crate::plugins::builtin::{MetricsStats, TracingFailbot};
    use crate::plugins::{HandlerRequest, HandlerResult};
    use async_trait::async_trait;
    use axum::http::HeaderMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        config: GlobalConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let base = root.path();
            let config = GlobalConfig {
                auth_plugin_dir: base.join("auth"),
                handler_plugin_dir: base.join("handlers"),
                lifecycle_plugin_dir: base.join("lifecycle"),
                instruments_plugin_dir: base.join("instruments"),
                ..GlobalConfig::default()
            };
            Self {
                _root: root,
                config,
            }
        }

        fn write(&self, dir: &Path, file: &str, contents: &str) {
            fs::create_dir_all(dir).unwrap();
            fs::write(dir.join(file), contents).unwrap();
        }
    }

    struct EchoHandler;

    #[async_trait]
    impl Handler for EchoHandler {
        async fn call(&self, request: HandlerRequest<'_>) -> HandlerResult {
            Ok(serde_json::json!({ "opts": request.opts }))
        }
    }

    struct RecordingHook(Mutex<Vec<String>>);

    #[async_trait]
    impl LifecycleHook for RecordingHook {
        async fn on_request(&self, context: &RequestContext, _headers: &HeaderMap) -> anyhow::Result<()> {
            self.0.lock().unwrap().push(context.path.clone());
            Ok(())
        }
    }

    fn catalog() -> PluginCatalog {
        PluginCatalog::default()
            .handler("EchoHandler", |_| Ok(Arc::new(EchoHandler)))
            .lifecycle("AuditHook", |_| Ok(Arc::new(RecordingHook(Mutex::new(Vec::new())))))
            .lifecycle("TraceHook", |_| Ok(Arc::new(RecordingHook(Mutex::new(Vec::new())))))
            .handler("NeedsOptions", |opts| {
                anyhow::ensure!(opts.get("token").is_some(), "missing token option");
                Ok(Arc::new(EchoHandler))
            })
    }

    #[test]
    fn test_builtins_without_directories() {
        let fixture = Fixture::new();
        let registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();

        assert_eq!(registry.auth_names(), vec!["Hmac", "SharedSecret"]);
        assert_eq!(registry.handler_names(), vec!["DefaultHandler"]);
        assert!(registry.lifecycle_names().is_empty());
        assert_eq!(registry.instrument_names(), vec!["NoopStats", "NoopFailbot"]);
    }

    #[test]
    fn test_handler_descriptor_registers() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.handler_plugin_dir, "echo_handler.yml", "");

        let registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        assert!(registry.get_handler("EchoHandler").is_ok());
    }

    #[test]
    fn test_options_reach_factory() {
        let fixture = Fixture::new();
        fixture.write(
            &fixture.config.handler_plugin_dir,
            "needs_options.yml",
            "options:\n  token: abc\n",
        );
        assert!(PluginRegistry::load_all(&fixture.config, &catalog()).is_ok());

        fixture.write(&fixture.config.handler_plugin_dir, "needs_options.yml", "");
        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::Load { .. }));
        assert!(err.to_string().contains("missing token option"));
    }

    #[test]
    fn test_unknown_plugin_is_load_error() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.handler_plugin_dir, "mystery_handler.json", "{}");

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::Load { .. }));
        assert!(err.to_string().contains("MysteryHandler"));
    }

    #[test]
    fn test_wrong_capability_is_contract_violation() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.auth_plugin_dir, "echo_handler.yml", "");

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(
            err,
            PluginLoadError::ContractViolation { ref expected, .. } if expected == "auth"
        ));
    }

    #[test]
    fn test_dangerous_name_rejected() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.handler_plugin_dir, "file.yml", "");

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::NameRejected { .. }));
    }

    #[test]
    fn test_lowercase_stem_with_digits_first_rejected() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.handler_plugin_dir, "9lives.yml", "");

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::NameRejected { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let fixture = Fixture::new();
        let outside = tempfile::tempdir().unwrap();
        let target = outside.path().join("echo_handler.yml");
        fs::write(&target, "").unwrap();

        fs::create_dir_all(&fixture.config.handler_plugin_dir).unwrap();
        std::os::unix::fs::symlink(&target, fixture.config.handler_plugin_dir.join("echo_handler.yml"))
            .unwrap();

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::PathViolation { .. }));
    }

    #[test]
    fn test_non_descriptor_files_ignored() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.handler_plugin_dir, "README.md", "# notes");
        fixture.write(&fixture.config.handler_plugin_dir, "echo_handler.rb", "");

        let registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        assert_eq!(registry.handler_names(), vec!["DefaultHandler"]);
    }

    #[test]
    fn test_lifecycle_order_follows_file_names() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.lifecycle_plugin_dir, "trace_hook.yml", "");
        fixture.write(&fixture.config.lifecycle_plugin_dir, "audit_hook.yml", "");

        let registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        assert_eq!(registry.lifecycle_names(), vec!["AuditHook", "TraceHook"]);
    }

    #[test]
    fn test_instruments_replace_noop_defaults() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.instruments_plugin_dir, "metrics_stats.yml", "");
        fixture.write(&fixture.config.instruments_plugin_dir, "tracing_failbot.yml", "");

        let registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        assert_eq!(
            registry.instrument_names(),
            vec!["MetricsStats", "TracingFailbot"]
        );
        assert!(matches!(
            registry.get_instrument(InstrumentKind::Stats).unwrap(),
            Instrument::Stats(_)
        ));
    }

    #[test]
    fn test_ambiguous_instrument_rejected() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.instruments_plugin_dir, "both.yml", "");
        let catalog = catalog()
            .stats("Both", |_| Ok(Arc::new(MetricsStats)))
            .failbot("Both", |_| Ok(Arc::new(TracingFailbot)));

        let err = PluginRegistry::load_all(&fixture.config, &catalog).unwrap_err();
        assert!(matches!(err, PluginLoadError::ContractViolation { .. }));
    }

    #[test]
    fn test_handler_in_instrument_dir_rejected() {
        let fixture = Fixture::new();
        fixture.write(&fixture.config.instruments_plugin_dir, "echo_handler.yml", "");

        let err = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap_err();
        assert!(matches!(err, PluginLoadError::ContractViolation { .. }));
    }

    #[test]
    fn test_lookup_miss_lists_names() {
        let registry = PluginRegistry::default();
        let err = registry.get_handler("GithubHandler").err().unwrap();
        let msg = err.to_string();
        assert!(msg.contains("GithubHandler"));
        assert!(msg.contains("DefaultHandler"));
    }

    #[test]
    fn test_clear_removes_everything() {
        let fixture = Fixture::new();
        let mut registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        registry.clear();

        assert!(registry.get_auth("Hmac").is_err());
        assert!(registry.get_handler("DefaultHandler").is_err());
        assert!(registry.get_instrument(InstrumentKind::Failbot).is_err());
        assert!(registry.stats().is_none());
    }

    #[test]
    fn test_reload_picks_up_new_files() {
        let fixture = Fixture::new();
        let mut registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();
        assert!(registry.get_handler("EchoHandler").is_err());

        fixture.write(&fixture.config.handler_plugin_dir, "echo_handler.yaml", "");
        registry.reload_all(&fixture.config, &catalog()).unwrap();
        assert!(registry.get_handler("EchoHandler").is_ok());
    }

    #[test]
    fn test_failed_reload_keeps_previous_contents() {
        let fixture = Fixture::new();
        let mut registry = PluginRegistry::load_all(&fixture.config, &catalog()).unwrap();

        fixture.write(&fixture.config.handler_plugin_dir, "process.yml", "");
        assert!(registry.reload_all(&fixture.config, &catalog()).is_err());
        assert!(registry.get_handler("DefaultHandler").is_ok());
    }

    #[test]
    fn test_direct_registration_validates_names() {
        let mut registry = PluginRegistry::default();
        registry
            .register_handler("echo_handler", Arc::new(EchoHandler))
            .unwrap();
        assert!(registry.get_handler("EchoHandler").is_ok());

        let err = registry
            .register_handler("kernel", Arc::new(EchoHandler))
            .unwrap_err();
        assert!(matches!(err, PluginLoadError::NameRejected { .. }));
    }
}
