//! Lazily resolved instrumentation handles shared by the request pipeline.

use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::plugins::builtin::{NoopFailbot, NoopStats};
use crate::plugins::{FailbotSink, PluginRegistry, StatsSink};

/// Stats and failbot sinks, resolved from the registry on first use.
///
/// An empty registry (after [`PluginRegistry::clear`]) resolves to no-op
/// sinks, so callers never see an absent handle.
pub struct Components {
    registry: Arc<PluginRegistry>,
    stats: OnceLock<Arc<dyn StatsSink>>,
    failbot: OnceLock<Arc<dyn FailbotSink>>,
}

impl fmt::Debug for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Components")
            .field("stats_resolved", &self.stats.get().is_some())
            .field("failbot_resolved", &self.failbot.get().is_some())
            .finish()
    }
}

impl Components {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            stats: OnceLock::new(),
            failbot: OnceLock::new(),
        }
    }

    /// Pin the stats sink instead of resolving it from the registry.
    pub fn with_stats(self, stats: Arc<dyn StatsSink>) -> Self {
        Self {
            stats: OnceLock::from(stats),
            ..self
        }
    }

    /// Pin the failbot sink instead of resolving it from the registry.
    pub fn with_failbot(self, failbot: Arc<dyn FailbotSink>) -> Self {
        Self {
            failbot: OnceLock::from(failbot),
            ..self
        }
    }

    pub fn stats(&self) -> Arc<dyn StatsSink> {
        let sink = self.stats.get_or_init(|| {
            self.registry
                .stats()
                .unwrap_or_else(|| Arc::new(NoopStats))
        });
        Arc::clone(sink)
    }

    pub fn failbot(&self) -> Arc<dyn FailbotSink> {
        let sink = self.failbot.get_or_init(|| {
            self.registry
                .failbot()
                .unwrap_or_else(|| Arc::new(NoopFailbot))
        });
        Arc::clone(sink)
    }

    /// Drop resolved and pinned handles. The next access resolves from the
    /// registry again.
    pub fn reset(&mut self) {
        self.stats.take();
        self.failbot.take();
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }
}
