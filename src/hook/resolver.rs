//! Hook event configuration: is an event enabled, and how long to wait
//! before running its hooks.
//!
//! There are two configuration files, one global and one per project. Each has
//! a blanket `all` entry and per-event entries:
//!
//! ```json
//! {"all": {"enabled": true, "wait_time": 5}, "events": {"git-pre-commit": {"enabled": false, "wait_time": null}}}
//! ```
//!
//! Per-event entries override `all` within a scope, and the project scope
//! overrides the global one. Missing files are the normal "not configured"
//! state.

use crate::config::Config;
use crate::errors::{ConfigError, HookError};
use crate::hook::event::AnyHookEvent;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Settings for one event, or for all events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SingleEventConfiguration {
    pub enabled: Option<bool>,
    #[serde(deserialize_with = "deserialize_wait_time")]
    pub wait_time: Option<u32>,
}

/// Negative wait times mean no wait.
fn deserialize_wait_time<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let seconds = Option::<i64>::deserialize(deserializer)?;
    Ok(seconds.map(|s| u32::try_from(s.max(0)).unwrap_or(u32::MAX)))
}

impl SingleEventConfiguration {
    pub fn new(enabled: Option<bool>, wait_time: Option<u32>) -> Self {
        Self { enabled, wait_time }
    }

    /// Overwrite the fields for which a value is given.
    fn apply(&mut self, enabled: Option<bool>, wait_time: Option<u32>) {
        if enabled.is_some() {
            self.enabled = enabled;
        }
        if wait_time.is_some() {
            self.wait_time = wait_time;
        }
    }
}

/// Contents of a hook configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HookConfiguration {
    pub all: SingleEventConfiguration,
    pub events: IndexMap<String, SingleEventConfiguration>,
}

impl HookConfiguration {
    /// Settings of an event, optionally merged onto the `all` entry.
    pub fn event(&self, event: &AnyHookEvent, merge_with_all: bool) -> SingleEventConfiguration {
        match (self.events.get(event.key()), merge_with_all) {
            (Some(entry), true) => merge_config(self.all, *entry),
            (Some(entry), false) => *entry,
            (None, true) => self.all,
            (None, false) => SingleEventConfiguration::default(),
        }
    }

    fn configure(&mut self, event: Option<&AnyHookEvent>, enabled: Option<bool>, wait_time: Option<u32>) {
        match event {
            None => self.all.apply(enabled, wait_time),
            Some(event) => self
                .events
                .entry(event.key().to_string())
                .or_default()
                .apply(enabled, wait_time),
        }
    }
}

/// Merge two configurations. Values set in `b` replace those of `a`.
pub fn merge_config(a: SingleEventConfiguration, b: SingleEventConfiguration) -> SingleEventConfiguration {
    SingleEventConfiguration {
        enabled: b.enabled.or(a.enabled),
        wait_time: b.wait_time.or(a.wait_time),
    }
}

/// A resolved flag, together with the values it was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookFlagConfiguration<T> {
    pub effective: T,
    /// Value from the global configuration
    pub default: Option<T>,
    /// Value from the project configuration
    pub project: Option<T>,
}

/// Resolves event settings from the global and project configuration files.
///
/// Files are read on first use and cached for the lifetime of the resolver.
#[derive(Debug)]
pub struct HookConfigResolver {
    global_path: PathBuf,
    project_path: Option<PathBuf>,
    global: OnceLock<HookConfiguration>,
    project: OnceLock<HookConfiguration>,
}

impl HookConfigResolver {
    /// Create a new resolver. `project_path` is `None` without a loaded project.
    pub fn new(global_path: impl Into<PathBuf>, project_path: Option<PathBuf>) -> Self {
        Self {
            global_path: global_path.into(),
            project_path,
            global: OnceLock::new(),
            project: OnceLock::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.global_hook_config_file(), config.project_hook_config_file())
    }

    pub fn global_config(&self) -> &HookConfiguration {
        self.global.get_or_init(|| load_hook_config(&self.global_path))
    }

    pub fn project_config(&self) -> &HookConfiguration {
        self.project.get_or_init(|| match &self.project_path {
            Some(path) => load_hook_config(path),
            None => HookConfiguration::default(),
        })
    }

    pub fn event_config_default(&self, event: &AnyHookEvent, merge_with_all: bool) -> SingleEventConfiguration {
        self.global_config().event(event, merge_with_all)
    }

    pub fn event_config_project(&self, event: &AnyHookEvent, merge_with_all: bool) -> SingleEventConfiguration {
        self.project_config().event(event, merge_with_all)
    }

    /// Whether hooks for `event` run. The project wins over the global
    /// configuration; `if_not_defined` is used if neither configures it.
    pub fn is_event_enabled(&self, event: &AnyHookEvent, if_not_defined: bool) -> bool {
        self.event_config_project(event, true)
            .enabled
            .or(self.event_config_default(event, true).enabled)
            .unwrap_or(if_not_defined)
    }

    /// Whether any scope configures `enabled` for `event`, per event or blanket.
    pub fn is_event_configured(&self, event: &AnyHookEvent) -> bool {
        self.event_config_project(event, true).enabled.is_some()
            || self.event_config_default(event, true).enabled.is_some()
    }

    /// Seconds to wait before running hooks for `event`.
    pub fn event_wait_time(&self, event: &AnyHookEvent) -> u32 {
        self.event_config_project(event, true)
            .wait_time
            .or(self.event_config_default(event, true).wait_time)
            .unwrap_or(0)
    }

    pub fn enabled_flag(&self, event: &AnyHookEvent, if_not_defined: bool) -> HookFlagConfiguration<bool> {
        HookFlagConfiguration {
            effective: self.is_event_enabled(event, if_not_defined),
            default: self.event_config_default(event, false).enabled,
            project: self.event_config_project(event, false).enabled,
        }
    }

    pub fn wait_time_flag(&self, event: &AnyHookEvent) -> HookFlagConfiguration<u32> {
        HookFlagConfiguration {
            effective: self.event_wait_time(event),
            default: self.event_config_default(event, false).wait_time,
            project: self.event_config_project(event, false).wait_time,
        }
    }

    /// Blanket settings of both scopes.
    pub fn defaults(&self) -> (HookFlagConfiguration<bool>, HookFlagConfiguration<u32>) {
        let global = self.global_config().all;
        let project = self.project_config().all;
        let enabled = HookFlagConfiguration {
            effective: project.enabled.or(global.enabled).unwrap_or(false),
            default: global.enabled,
            project: project.enabled,
        };
        let wait_time = HookFlagConfiguration {
            effective: project.wait_time.or(global.wait_time).unwrap_or(0),
            default: global.wait_time,
            project: project.wait_time,
        };
        (enabled, wait_time)
    }

    /// Change the settings of an event (`None` for all events) and save them.
    ///
    /// `use_default` selects the global configuration, otherwise the project's.
    /// Only values that are given are changed.
    pub fn configure_event(
        &mut self,
        event: Option<&AnyHookEvent>,
        use_default: bool,
        enabled: Option<bool>,
        wait_time: Option<u32>,
    ) -> Result<(), HookError> {
        let (cell, path) = if use_default {
            (&mut self.global, self.global_path.clone())
        } else {
            let path = self.project_path.clone().ok_or(ConfigError::NoProject)?;
            (&mut self.project, path)
        };

        let mut config = cell.take().unwrap_or_else(|| load_hook_config(&path));
        config.configure(event, enabled, wait_time);
        let saved = save_hook_config(&path, &config);
        let _ = cell.set(config);
        saved?;

        tracing::info!(
            path = %path.display(),
            event = event.map(|e| e.key()).unwrap_or("all"),
            ?enabled,
            ?wait_time,
            "hook configuration updated"
        );
        Ok(())
    }
}

/// Read a hook configuration file. Missing or unreadable files are empty.
pub fn load_hook_config(path: &Path) -> HookConfiguration {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "hook configuration not found");
            return HookConfiguration::default();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read hook configuration, ignoring it");
            return HookConfiguration::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "invalid hook configuration, ignoring it");
            HookConfiguration::default()
        }
    }
}

/// Write a hook configuration file, creating its directory.
pub fn save_hook_config(path: &Path, config: &HookConfiguration) -> Result<(), HookError> {
    let persist_failed = |source| HookError::PersistFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(persist_failed)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(persist_failed)
}

/// Write an empty configuration if the file does not exist. Returns whether it was created.
pub fn init_hook_config_file(path: &Path) -> Result<bool, HookError> {
    if path.exists() {
        return Ok(false);
    }
    save_hook_config(path, &HookConfiguration::default())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::event::HookEvent;
    use tempfile::{TempDir, tempdir};

    fn event(e: HookEvent) -> AnyHookEvent {
        e.into()
    }

    fn write(path: &Path, json: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, json).unwrap();
    }

    fn setup(global: Option<&str>, project: Option<&str>) -> (TempDir, HookConfigResolver) {
        let dir = tempdir().unwrap();
        let global_path = dir.path().join("hooks.json");
        let project_path = dir.path().join("project").join("_riptide").join("hooks.json");
        if let Some(json) = global {
            write(&global_path, json);
        }
        if let Some(json) = project {
            write(&project_path, json);
        }
        let resolver = HookConfigResolver::new(global_path, Some(project_path));
        (dir, resolver)
    }

    #[test]
    fn test_merge_config() {
        let a = SingleEventConfiguration::new(Some(true), Some(3));
        let b = SingleEventConfiguration::new(Some(false), None);
        assert_eq!(merge_config(a, b), SingleEventConfiguration::new(Some(false), Some(3)));
        assert_eq!(merge_config(a, SingleEventConfiguration::default()), a);
        assert_eq!(merge_config(SingleEventConfiguration::default(), b), b);
    }

    #[test]
    fn test_nothing_configured_uses_fallback() {
        let (_dir, resolver) = setup(None, None);
        let e = event(HookEvent::PreStart);
        assert!(!resolver.is_event_enabled(&e, false));
        assert!(resolver.is_event_enabled(&e, true));
        assert!(!resolver.is_event_configured(&e));
        assert_eq!(resolver.event_wait_time(&e), 0);
    }

    #[test]
    fn test_global_all_enables_every_event() {
        let (_dir, resolver) = setup(Some(r#"{"all": {"enabled": true, "wait_time": 5}, "events": {}}"#), None);
        let e = event(HookEvent::PostStop);
        assert!(resolver.is_event_enabled(&e, false));
        assert_eq!(resolver.event_wait_time(&e), 5);
        assert!(resolver.is_event_configured(&e));
    }

    #[test]
    fn test_project_event_overrides_global_all() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": true, "wait_time": null}, "events": {}}"#),
            Some(r#"{"all": {"enabled": null, "wait_time": null}, "events": {"pre-start": {"enabled": false, "wait_time": null}}}"#),
        );
        assert!(!resolver.is_event_enabled(&event(HookEvent::PreStart), true));
        assert!(resolver.is_event_enabled(&event(HookEvent::PostStart), false));
    }

    #[test]
    fn test_project_all_overrides_global_event() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": null, "wait_time": null}, "events": {"pre-start": {"enabled": true, "wait_time": 2}}}"#),
            Some(r#"{"all": {"enabled": false, "wait_time": null}, "events": {}}"#),
        );
        let e = event(HookEvent::PreStart);
        assert!(!resolver.is_event_enabled(&e, true));
        assert_eq!(resolver.event_wait_time(&e), 2);
    }

    #[test]
    fn test_project_all_enables_over_global_disable() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": false, "wait_time": null}, "events": {}}"#),
            Some(r#"{"all": {"enabled": true, "wait_time": null}, "events": {}}"#),
        );
        assert!(resolver.is_event_enabled(&event(HookEvent::PreStart), false));
        let (enabled, _) = resolver.defaults();
        assert!(enabled.effective);
        assert_eq!(enabled.default, Some(false));
        assert_eq!(enabled.project, Some(true));
    }

    #[test]
    fn test_event_entry_overrides_all_within_scope() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": false, "wait_time": 10}, "events": {"custom-deploy": {"enabled": true, "wait_time": 0}}}"#),
            None,
        );
        let custom = AnyHookEvent::Custom("custom-deploy".to_string());
        assert!(resolver.is_event_enabled(&custom, false));
        assert_eq!(resolver.event_wait_time(&custom), 0);
        assert!(!resolver.is_event_enabled(&event(HookEvent::PreStart), true));
        assert_eq!(resolver.event_wait_time(&event(HookEvent::PreStart)), 10);
    }

    #[test]
    fn test_project_wait_time_wins() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": null, "wait_time": 10}, "events": {}}"#),
            Some(r#"{"all": {"enabled": null, "wait_time": 1}, "events": {}}"#),
        );
        assert_eq!(resolver.event_wait_time(&event(HookEvent::PreDbSwitch)), 1);
    }

    #[test]
    fn test_event_config_without_merge() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": true, "wait_time": 4}, "events": {"pre-stop": {"enabled": null, "wait_time": 1}}}"#),
            None,
        );
        let pre_stop = event(HookEvent::PreStop);
        assert_eq!(
            resolver.event_config_default(&pre_stop, false),
            SingleEventConfiguration::new(None, Some(1))
        );
        assert_eq!(
            resolver.event_config_default(&pre_stop, true),
            SingleEventConfiguration::new(Some(true), Some(1))
        );
        assert_eq!(
            resolver.event_config_default(&event(HookEvent::PostStop), false),
            SingleEventConfiguration::default()
        );
        assert_eq!(
            resolver.event_config_default(&event(HookEvent::PostStop), true),
            SingleEventConfiguration::new(Some(true), Some(4))
        );
    }

    #[test]
    fn test_corrupt_file_is_treated_as_empty() {
        let (_dir, resolver) = setup(Some("{ not json"), Some(r#"{"all": 3}"#));
        assert_eq!(resolver.global_config(), &HookConfiguration::default());
        assert_eq!(resolver.project_config(), &HookConfiguration::default());
        assert!(!resolver.is_event_enabled(&event(HookEvent::PreStart), false));
    }

    #[test]
    fn test_negative_wait_time_means_no_wait() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": true, "wait_time": -5}, "events": {"pre-stop": {"enabled": null, "wait_time": -1}}}"#),
            None,
        );
        assert_eq!(resolver.global_config().all, SingleEventConfiguration::new(Some(true), Some(0)));
        assert!(resolver.is_event_enabled(&event(HookEvent::PreStop), false));
        assert_eq!(resolver.event_wait_time(&event(HookEvent::PreStop)), 0);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let (_dir, resolver) = setup(Some(r#"{"all": {"enabled": true}}"#), None);
        assert_eq!(resolver.global_config().all, SingleEventConfiguration::new(Some(true), None));
        assert!(resolver.global_config().events.is_empty());
    }

    #[test]
    fn test_configure_event_persists() {
        let (dir, mut resolver) = setup(None, None);
        let commit = event(HookEvent::GitPreCommit);

        resolver.configure_event(None, true, Some(true), None).unwrap();
        resolver
            .configure_event(Some(&commit), false, Some(false), Some(3))
            .unwrap();
        resolver.configure_event(Some(&commit), false, None, Some(7)).unwrap();

        assert!(!resolver.is_event_enabled(&commit, true));
        assert_eq!(resolver.event_wait_time(&commit), 7);

        let reloaded = HookConfigResolver::new(
            dir.path().join("hooks.json"),
            Some(dir.path().join("project").join("_riptide").join("hooks.json")),
        );
        assert_eq!(reloaded.global_config().all.enabled, Some(true));
        assert_eq!(
            reloaded.project_config().events["git-pre-commit"],
            SingleEventConfiguration::new(Some(false), Some(7))
        );

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("hooks.json")).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({"all": {"enabled": true, "wait_time": null}, "events": {}})
        );
    }

    #[test]
    fn test_configure_project_without_project_fails() {
        let dir = tempdir().unwrap();
        let mut resolver = HookConfigResolver::new(dir.path().join("hooks.json"), None);
        let result = resolver.configure_event(None, false, Some(true), None);
        assert!(matches!(result, Err(HookError::Config(ConfigError::NoProject))));
        assert!(!dir.path().join("hooks.json").exists());
    }

    #[test]
    fn test_defaults_view() {
        let (_dir, resolver) = setup(
            Some(r#"{"all": {"enabled": true, "wait_time": 3}, "events": {}}"#),
            Some(r#"{"all": {"enabled": false, "wait_time": null}, "events": {}}"#),
        );
        let (enabled, wait_time) = resolver.defaults();
        assert_eq!(
            enabled,
            HookFlagConfiguration {
                effective: false,
                default: Some(true),
                project: Some(false)
            }
        );
        assert_eq!(wait_time.effective, 3);
        assert_eq!(wait_time.project, None);
    }

    #[test]
    fn test_init_hook_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sub").join("hooks.json");
        assert!(init_hook_config_file(&path).unwrap());
        assert!(!init_hook_config_file(&path).unwrap());
        assert_eq!(load_hook_config(&path), HookConfiguration::default());
    }
}
