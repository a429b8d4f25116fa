//! Test fixtures for the hook subsystem.

use super::display::RecordingDisplay;
use super::event::AnyHookEvent;
use super::manager::HookManager;
use crate::config::{App, Command, Config, Hook, Project};
use crate::engine::{BindVolume, Engine, MultiResultQueue, StartStopResultStep};
use crate::plugin::{Plugin, PluginRegistry};
use anyhow::Result;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::{TempDir, tempdir};

/// A hook running `command` for the given event keys.
pub fn hook(events: &[&str], command: &str) -> Hook {
    let events = events
        .iter()
        .map(|key| AnyHookEvent::try_any_from_key(key).unwrap())
        .collect();
    Hook::new(events, command)
}

/// A recorded call of [`Engine::cmd_hook`].
#[derive(Debug, Clone, PartialEq)]
pub struct HookCall {
    pub command: String,
    pub working_directory: String,
    pub args: Vec<String>,
    pub volumes: Vec<BindVolume>,
}

/// Engine that records hook commands and returns configured exit codes.
#[derive(Default)]
pub struct RecordingEngine {
    pub calls: Mutex<Vec<HookCall>>,
    pub exit_codes: Mutex<IndexMap<String, i32>>,
}

impl RecordingEngine {
    pub fn calls(&self) -> Vec<HookCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.command).collect()
    }
}

#[async_trait]
impl Engine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn start_project(
        &self,
        _project: &Project,
        _services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>> {
        Ok(MultiResultQueue::new(Vec::new()))
    }

    async fn stop_project(
        &self,
        _project: &Project,
        _services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>> {
        Ok(MultiResultQueue::new(Vec::new()))
    }

    async fn status(&self, _project: &Project) -> Result<IndexMap<String, bool>> {
        Ok(IndexMap::new())
    }

    async fn cmd_hook(
        &self,
        _project: &Project,
        command: &Command,
        working_directory: &str,
        args: &[String],
        volumes: &[BindVolume],
    ) -> Result<i32> {
        self.calls.lock().unwrap().push(HookCall {
            command: command.command.clone(),
            working_directory: working_directory.to_string(),
            args: args.to_vec(),
            volumes: volumes.to_vec(),
        });
        Ok(self
            .exit_codes
            .lock()
            .unwrap()
            .get(&command.command)
            .copied()
            .unwrap_or(0))
    }
}

/// Plugin that records the arguments it was triggered with.
pub struct RecordingPlugin {
    events: Vec<String>,
    exit_code: i32,
    pub calls: Arc<Mutex<Vec<Vec<String>>>>,
}

#[async_trait]
impl Plugin for RecordingPlugin {
    fn responds_to_event(&self, event: &AnyHookEvent) -> bool {
        self.events.iter().any(|e| e == event.key())
    }

    async fn event_triggered(&self, _config: &Config, _event: &AnyHookEvent, args: &[String]) -> i32 {
        self.calls.lock().unwrap().push(args.to_vec());
        self.exit_code
    }
}

/// Temporary system configuration directory and project folder.
pub struct Fixture {
    config_dir: TempDir,
    project_dir: Option<TempDir>,
    global_hooks: Vec<(String, Hook)>,
    project_hooks: Vec<(String, Hook)>,
    commands: Vec<(String, Command)>,
    plugins: PluginRegistry,
    pub plugin_calls: Arc<Mutex<Vec<Vec<String>>>>,
    pub display: Arc<RecordingDisplay>,
    pub engine: Arc<RecordingEngine>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            project_dir: Some(tempdir().unwrap()),
            ..Self::without_project()
        }
    }

    pub fn without_project() -> Self {
        Self {
            config_dir: tempdir().unwrap(),
            project_dir: None,
            global_hooks: Vec::new(),
            project_hooks: Vec::new(),
            commands: Vec::new(),
            plugins: PluginRegistry::new(),
            plugin_calls: Arc::new(Mutex::new(Vec::new())),
            display: Arc::new(RecordingDisplay::default()),
            engine: Arc::new(RecordingEngine::default()),
        }
    }

    pub fn global_hook(mut self, name: &str, hook: Hook) -> Self {
        self.global_hooks.push((name.to_string(), hook));
        self
    }

    pub fn project_hook(mut self, name: &str, hook: Hook) -> Self {
        self.project_hooks.push((name.to_string(), hook));
        self
    }

    pub fn app_command(mut self, name: &str, command: &str) -> Self {
        self.commands.push((name.to_string(), Command::new(command)));
        self
    }

    pub fn global_hook_config(self, json: &str) -> Self {
        write_file(&self.global_hook_config_file(), json);
        self
    }

    pub fn project_hook_config(self, json: &str) -> Self {
        write_file(&self.project_hook_config_file(), json);
        self
    }

    /// Make `command` exit with `code` when run as a hook.
    pub fn exit_code(self, command: &str, code: i32) -> Self {
        self.engine
            .exit_codes
            .lock()
            .unwrap()
            .insert(command.to_string(), code);
        self
    }

    pub fn with_recording_plugin(mut self, name: &str, events: &[&str], exit_code: i32) -> Self {
        let plugin = RecordingPlugin {
            events: events.iter().map(|e| e.to_string()).collect(),
            exit_code,
            calls: Arc::clone(&self.plugin_calls),
        };
        self.plugins.register(name, Arc::new(plugin));
        self
    }

    pub fn config_dir(&self) -> &Path {
        self.config_dir.path()
    }

    pub fn project_folder(&self) -> PathBuf {
        self.project_dir
            .as_ref()
            .map(|d| d.path().to_path_buf())
            .unwrap_or_default()
    }

    pub fn global_hook_config_file(&self) -> PathBuf {
        self.config_dir().join("hooks.json")
    }

    pub fn project_hook_config_file(&self) -> PathBuf {
        self.project_folder().join("_riptide").join("hooks.json")
    }

    pub fn config(&self) -> Config {
        let mut config = Config::new(self.config_dir());
        for (name, hook) in &self.global_hooks {
            config
                .hooks
                .insert(name.clone(), hook.clone().with_name(name.clone()));
        }
        if let Some(dir) = &self.project_dir {
            let mut app = App::new("app");
            for (name, command) in &self.commands {
                app.commands.insert(name.clone(), command.clone());
            }
            for (name, hook) in &self.project_hooks {
                app.hooks
                    .insert(name.clone(), hook.clone().with_name(name.clone()));
            }
            config = config.with_project(Project::new("test", dir.path(), app));
        }
        config
    }

    pub fn manager(&self) -> HookManager {
        HookManager::new(
            Arc::new(self.config()),
            self.engine.clone(),
            self.plugins.clone(),
            self.display.clone(),
        )
    }
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
