//! Plugins extend Riptide and can respond to hook events.
//!
//! Plugins are registered programmatically at startup.

use crate::config::Config;
use crate::engine::Engine;
use crate::hook::event::AnyHookEvent;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;

/// A Riptide plugin.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called after the engine was loaded.
    fn after_load_engine(&self, _engine: &dyn Engine) {}

    /// Called whenever the configuration was (re)loaded, with or without a project.
    fn after_reload_config(&self, _config: &Config) {}

    /// Value of a plugin flag. `false` if the plugin does not define it.
    fn get_flag_value(&self, _config: &Config, _flag_name: &str) -> bool {
        false
    }

    /// Whether the plugin wants to be called when `event` is triggered.
    fn responds_to_event(&self, _event: &AnyHookEvent) -> bool {
        false
    }

    /// Handle a triggered event. A non-zero return aborts the trigger.
    async fn event_triggered(&self, _config: &Config, _event: &AnyHookEvent, _args: &[String]) -> i32 {
        0
    }
}

/// Loaded plugins by name, in registration order.
#[derive(Default, Clone)]
pub struct PluginRegistry {
    plugins: IndexMap<String, Arc<dyn Plugin>>,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.plugins.keys()).finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Self {
        self.register(name, plugin);
        self
    }

    /// Register a plugin, replacing any plugin with the same name.
    pub fn register(&mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) {
        let name = name.into();
        tracing::debug!(plugin = %name, "registered plugin");
        self.plugins.insert(name, plugin);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Plugin>> {
        self.plugins.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn Plugin>)> {
        self.plugins.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Plugins responding to `event`, in registration order.
    pub fn responders(&self, event: &AnyHookEvent) -> Vec<(String, Arc<dyn Plugin>)> {
        self.plugins
            .iter()
            .filter(|(_, plugin)| plugin.responds_to_event(event))
            .map(|(name, plugin)| (name.clone(), Arc::clone(plugin)))
            .collect()
    }

    pub fn after_load_engine(&self, engine: &dyn Engine) {
        for plugin in self.plugins.values() {
            plugin.after_load_engine(engine);
        }
    }

    pub fn after_reload_config(&self, config: &Config) {
        for plugin in self.plugins.values() {
            plugin.after_reload_config(config);
        }
    }

    /// Whether any plugin sets `flag_name`.
    pub fn get_flag_value(&self, config: &Config, flag_name: &str) -> bool {
        self.plugins
            .values()
            .any(|plugin| plugin.get_flag_value(config, flag_name))
    }
}
