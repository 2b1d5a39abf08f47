//! Compiled-in plugin factories, keyed by canonical `PascalCase` name.
//!
//! A plugin descriptor file only ever selects an entry from the catalog; it
//! cannot introduce code. Each entry records the capabilities it provides so
//! the loader can enforce the contract of the directory it was found in.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::builtin::{
    DefaultHandler, HmacAuth, MetricsStats, NoopFailbot, NoopStats, SharedSecretAuth,
    TracingFailbot,
};
use super::{AuthValidator, FailbotSink, Handler, LifecycleHook, StatsSink};
use crate::validation::to_type_name;

type Factory<T> = Arc<dyn Fn(&Value) -> anyhow::Result<Arc<T>> + Send + Sync>;

/// Capability a plugin can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    Auth,
    Handler,
    Lifecycle,
    Stats,
    Failbot,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Auth => "auth",
            Capability::Handler => "handler",
            Capability::Lifecycle => "lifecycle",
            Capability::Stats => "stats",
            Capability::Failbot => "failbot",
        };
        f.write_str(name)
    }
}

#[derive(Default, Clone)]
struct Entry {
    auth: Option<Factory<dyn AuthValidator>>,
    handler: Option<Factory<dyn Handler>>,
    lifecycle: Option<Factory<dyn LifecycleHook>>,
    stats: Option<Factory<dyn StatsSink>>,
    failbot: Option<Factory<dyn FailbotSink>>,
}

impl Entry {
    fn capabilities(&self) -> Vec<Capability> {
        [
            (self.auth.is_some(), Capability::Auth),
            (self.handler.is_some(), Capability::Handler),
            (self.lifecycle.is_some(), Capability::Lifecycle),
            (self.stats.is_some(), Capability::Stats),
            (self.failbot.is_some(), Capability::Failbot),
        ]
        .into_iter()
        .filter_map(|(present, cap)| present.then_some(cap))
        .collect()
    }
}

/// Named plugin factories available to the loader.
///
/// # Example
///
/// ```rust,ignore
/// let catalog = PluginCatalog::default()
///     .handler("github_handler", |_opts| Ok(Arc::new(GithubHandler)))
///     .lifecycle("AuditHook", |opts| Ok(Arc::new(AuditHook::from_options(opts)?)));
/// ```
#[derive(Clone)]
pub struct PluginCatalog {
    entries: BTreeMap<String, Entry>,
}

impl Default for PluginCatalog {
    /// Catalog containing every plugin shipped with the gateway.
    fn default() -> Self {
        Self::empty()
            .auth("Hmac", |_| Ok(Arc::new(HmacAuth)))
            .auth("SharedSecret", |_| Ok(Arc::new(SharedSecretAuth)))
            .handler("DefaultHandler", |_| Ok(Arc::new(DefaultHandler)))
            .stats("NoopStats", |_| Ok(Arc::new(NoopStats)))
            .stats("MetricsStats", |_| Ok(Arc::new(MetricsStats)))
            .failbot("NoopFailbot", |_| Ok(Arc::new(NoopFailbot)))
            .failbot("TracingFailbot", |_| Ok(Arc::new(TracingFailbot)))
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("names", &self.names())
            .finish()
    }
}

impl PluginCatalog {
    /// Catalog with no entries at all.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    fn entry(&mut self, name: &str) -> &mut Entry {
        self.entries.entry(to_type_name(name)).or_default()
    }

    pub fn auth<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Arc<dyn AuthValidator>> + Send + Sync + 'static,
    {
        self.entry(name).auth = Some(Arc::new(factory));
        self
    }

    pub fn handler<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Arc<dyn Handler>> + Send + Sync + 'static,
    {
        self.entry(name).handler = Some(Arc::new(factory));
        self
    }

    pub fn lifecycle<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Arc<dyn LifecycleHook>> + Send + Sync + 'static,
    {
        self.entry(name).lifecycle = Some(Arc::new(factory));
        self
    }

    pub fn stats<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Arc<dyn StatsSink>> + Send + Sync + 'static,
    {
        self.entry(name).stats = Some(Arc::new(factory));
        self
    }

    pub fn failbot<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<Arc<dyn FailbotSink>> + Send + Sync + 'static,
    {
        self.entry(name).failbot = Some(Arc::new(factory));
        self
    }

    /// Every registered name, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Capabilities provided by `name`, or `None` if it is not registered.
    pub fn capabilities(&self, name: &str) -> Option<Vec<Capability>> {
        self.entries.get(name).map(Entry::capabilities)
    }

    pub(crate) fn build_auth(
        &self,
        name: &str,
        options: &Value,
    ) -> Option<anyhow::Result<Arc<dyn AuthValidator>>> {
        let factory = self.entries.get(name)?.auth.as_ref()?;
        Some(factory(options))
    }

    pub(crate) fn build_handler(
        &self,
        name: &str,
        options: &Value,
    ) -> Option<anyhow::Result<Arc<dyn Handler>>> {
        let factory = self.entries.get(name)?.handler.as_ref()?;
        Some(factory(options))
    }

    pub(crate) fn build_lifecycle(
        &self,
        name: &str,
        options: &Value,
    ) -> Option<anyhow::Result<Arc<dyn LifecycleHook>>> {
        let factory = self.entries.get(name)?.lifecycle.as_ref()?;
        Some(factory(options))
    }

    pub(crate) fn build_stats(
        &self,
        name: &str,
        options: &Value,
    ) -> Option<anyhow::Result<Arc<dyn StatsSink>>> {
        let factory = self.entries.get(name)?.stats.as_ref()?;
        Some(factory(options))
    }

    pub(crate) fn build_failbot(
        &self,
        name: &str,
        options: &Value,
    ) -> Option<anyhow::Result<Arc<dyn FailbotSink>>> {
        let factory = self.entries.get(name)?.failbot.as_ref()?;
        Some(factory(options))
    }
}
