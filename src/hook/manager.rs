//! Hook manager: which hooks apply to an event, and the current hook
//! configuration of the system and project.

use super::display::{HookDisplay, hook_not_configured_warning};
use super::event::{AnyHookEvent, HookEvent};
use super::githooks;
use super::resolver::{HookConfigResolver, HookFlagConfiguration, init_hook_config_file};
use crate::config::{Config, Hook};
use crate::engine::Engine;
use crate::errors::HookError;
use crate::plugin::{Plugin, PluginRegistry};
use indexmap::IndexMap;
use std::sync::Arc;
use std::time::Duration;

/// Where a hook was defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookScope {
    /// The system configuration
    Default,
    /// The project's app
    Project,
}

impl HookScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookScope::Default => "default",
            HookScope::Project => "project",
        }
    }
}

impl std::fmt::Display for HookScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A hook with the key it was defined under.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedHook {
    pub key: String,
    pub hook: Hook,
    pub scope: HookScope,
}

/// Something to run when an event is triggered.
#[derive(Clone)]
pub enum ApplicableEntry {
    Hook(LoadedHook),
    Plugin { name: String, plugin: Arc<dyn Plugin> },
}

impl ApplicableEntry {
    pub fn name(&self) -> &str {
        match self {
            ApplicableEntry::Hook(loaded) => &loaded.key,
            ApplicableEntry::Plugin { name, .. } => name,
        }
    }
}

impl std::fmt::Debug for ApplicableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicableEntry::Hook(loaded) => f.debug_tuple("Hook").field(loaded).finish(),
            ApplicableEntry::Plugin { name, .. } => f.debug_struct("Plugin").field("name", name).finish(),
        }
    }
}

/// Resolved configuration of one event and the hooks defined for it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicableEventConfiguration {
    pub event: AnyHookEvent,
    pub enabled: HookFlagConfiguration<bool>,
    pub wait_time: HookFlagConfiguration<u32>,
    pub hooks: Vec<LoadedHook>,
}

/// Blanket settings and the configuration of every event.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConfiguration {
    pub enabled: HookFlagConfiguration<bool>,
    pub wait_time: HookFlagConfiguration<u32>,
    pub events: Vec<ApplicableEventConfiguration>,
}

/// Manages loaded hooks and their event configuration.
pub struct HookManager {
    pub(crate) config: Arc<Config>,
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) plugins: PluginRegistry,
    pub(crate) display: Arc<dyn HookDisplay>,
    pub(crate) resolver: HookConfigResolver,
    pub(crate) countdown_tick: Duration,
}

impl HookManager {
    /// Create a new hook manager.
    pub fn new(
        config: Arc<Config>,
        engine: Arc<dyn Engine>,
        plugins: PluginRegistry,
        display: Arc<dyn HookDisplay>,
    ) -> Self {
        let resolver = HookConfigResolver::from_config(&config);
        Self {
            config,
            engine,
            plugins,
            display,
            resolver,
            countdown_tick: Duration::from_secs(1),
        }
    }

    /// Length of one countdown tick. One second unless changed.
    pub fn with_countdown_tick(mut self, tick: Duration) -> Self {
        self.countdown_tick = tick;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn resolver(&self) -> &HookConfigResolver {
        &self.resolver
    }

    /// Hooks from the system configuration.
    pub fn global_hooks(&self) -> &IndexMap<String, Hook> {
        &self.config.hooks
    }

    /// Hooks from the project's app. Empty without a project.
    pub fn project_hooks(&self) -> Option<&IndexMap<String, Hook>> {
        self.config.project().map(|p| &p.app.hooks)
    }

    /// All hooks subscribed to `event`: system hooks first, then project hooks.
    pub fn hooks_for(&self, event: &AnyHookEvent) -> Vec<LoadedHook> {
        let global = self
            .global_hooks()
            .iter()
            .map(|(key, hook)| (key, hook, HookScope::Default));
        let project = self
            .project_hooks()
            .into_iter()
            .flatten()
            .map(|(key, hook)| (key, hook, HookScope::Project));
        global
            .chain(project)
            .filter(|(_, hook, _)| hook.matches_event(event))
            .map(|(key, hook, scope)| LoadedHook {
                key: key.clone(),
                hook: hook.clone(),
                scope,
            })
            .collect()
    }

    /// Hooks and plugins to run for `event`, or nothing if the event is disabled.
    ///
    /// `if_not_defined_set_enabled_to` decides when neither configuration
    /// mentions the event. With `print_warning_if_not_defined`, a warning is
    /// shown once if the event is disabled only because it was never
    /// configured, and there is something to run for it.
    pub fn get_applicable_hooks_for(
        &self,
        event: &AnyHookEvent,
        if_not_defined_set_enabled_to: bool,
        print_warning_if_not_defined: bool,
    ) -> Vec<ApplicableEntry> {
        let enabled = self
            .resolver
            .is_event_enabled(event, if_not_defined_set_enabled_to);
        if !enabled && !print_warning_if_not_defined {
            return Vec::new();
        }

        let mut entries: Vec<ApplicableEntry> = self
            .hooks_for(event)
            .into_iter()
            .map(ApplicableEntry::Hook)
            .collect();
        entries.extend(
            self.plugins
                .responders(event)
                .into_iter()
                .map(|(name, plugin)| ApplicableEntry::Plugin { name, plugin }),
        );

        if !enabled {
            if !entries.is_empty() && !self.resolver.is_event_configured(event) {
                self.display
                    .system_warn(&hook_not_configured_warning(event.key()));
            }
            tracing::debug!(event = %event, candidates = entries.len(), "event disabled");
            return Vec::new();
        }
        entries
    }

    /// Current configuration of every known event and every custom event used by a hook.
    pub fn get_current_configuration(&self) -> CurrentConfiguration {
        let mut events: Vec<AnyHookEvent> = HookEvent::all().iter().map(|e| (*e).into()).collect();
        let hooks = self
            .global_hooks()
            .values()
            .chain(self.project_hooks().into_iter().flat_map(|h| h.values()));
        for hook in hooks {
            for event in &hook.events {
                if event.is_custom() && !events.contains(event) {
                    events.push(event.clone());
                }
            }
        }

        let (enabled, wait_time) = self.resolver.defaults();
        CurrentConfiguration {
            enabled,
            wait_time,
            events: events
                .into_iter()
                .map(|event| self.event_configuration(event))
                .collect(),
        }
    }

    fn event_configuration(&self, event: AnyHookEvent) -> ApplicableEventConfiguration {
        ApplicableEventConfiguration {
            enabled: self.resolver.enabled_flag(&event, false),
            wait_time: self.resolver.wait_time_flag(&event),
            hooks: self.hooks_for(&event),
            event,
        }
    }

    /// Change and save the configuration of an event, or of all events if `event` is `None`.
    pub fn configure_event(
        &mut self,
        event: Option<&AnyHookEvent>,
        use_default: bool,
        enabled: Option<bool>,
        wait_time: Option<u32>,
    ) -> Result<(), HookError> {
        self.resolver
            .configure_event(event, use_default, enabled, wait_time)
    }

    /// Create missing hook configuration files and install git hooks for the project.
    pub fn setup(&self) -> Result<(), HookError> {
        if init_hook_config_file(&self.config.global_hook_config_file())? {
            tracing::info!("created global hook configuration");
        }
        if let Some(path) = self.config.project_hook_config_file() {
            if init_hook_config_file(&path)? {
                tracing::info!(path = %path.display(), "created project hook configuration");
            }
            githooks::setup_githooks(self)?;
        }
        Ok(())
    }
}
