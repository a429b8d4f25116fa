//! Configuration loading.
//!
//! The system configuration lives in `<config dir>/config.yml` under a
//! `riptide:` key, the project in a `riptide.yml` under a `project:` key:
//!
//! ```yaml
//! # config.yml
//! riptide:
//!   engine: local
//!   hooks:
//!     notify:
//!       events: [post-start]
//!       command:
//!         run:
//!           command: notify-send "Riptide started"
//! ```
//!
//! Missing system configuration means defaults. Hook names are assigned from
//! their mapping keys when loading.

pub mod files;
pub mod hook;
pub mod project;

pub use hook::{Hook, HookCommand};
pub use project::{App, Command, Project, Service};

use crate::errors::ConfigError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The system configuration, with the loaded project attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Engine used to run services and hook commands
    #[serde(default = "default_engine")]
    pub engine: String,

    /// Hooks for all projects
    #[serde(default)]
    pub hooks: IndexMap<String, Hook>,

    /// The project, if one is loaded.
    #[serde(skip)]
    pub project: Option<Project>,

    /// Directory the system configuration was loaded from.
    #[serde(skip)]
    pub config_dir: PathBuf,
}

fn default_engine() -> String {
    "local".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            hooks: IndexMap::new(),
            project: None,
            config_dir: PathBuf::new(),
        }
    }
}

#[derive(Deserialize)]
struct SystemConfigFile {
    #[serde(default)]
    riptide: Config,
}

#[derive(Deserialize)]
struct ProjectFile {
    project: Project,
}

impl Config {
    /// Create a default configuration stored in `config_dir`.
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    /// Load the system configuration from `config_dir` and, if given, the project file.
    pub fn load(config_dir: &Path, project_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load_or_default(config_dir)?;
        if let Some(path) = project_file {
            config.project = Some(load_project(path)?);
        }
        config.assign_names();
        config.validate()?;
        Ok(config)
    }

    /// Load the system configuration, or defaults if there is none.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = files::riptide_main_config_file(config_dir);
        let mut config = if path.exists() {
            let content = read(&path)?;
            if content.trim().is_empty() {
                Self::default()
            } else {
                serde_yaml::from_str::<SystemConfigFile>(&content)
                    .map_err(|source| ConfigError::ParseFailed {
                        path: path.clone(),
                        source,
                    })?
                    .riptide
            }
        } else {
            tracing::debug!(path = %path.display(), "no system configuration, using defaults");
            Self::default()
        };
        config.config_dir = config_dir.to_path_buf();
        Ok(config)
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn global_hook_config_file(&self) -> PathBuf {
        files::global_hook_config_file(&self.config_dir)
    }

    pub fn project_hook_config_file(&self) -> Option<PathBuf> {
        self.project
            .as_ref()
            .map(|p| files::project_hook_config_file(p.folder()))
    }

    fn assign_names(&mut self) {
        for (name, hook) in self.hooks.iter_mut() {
            hook.name = Some(name.clone());
        }
        if let Some(project) = self.project.as_mut() {
            for (name, hook) in project.app.hooks.iter_mut() {
                hook.name = Some(name.clone());
            }
        }
    }

    /// Hooks of the system configuration can't reference app commands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some((name, _)) = self.hooks.iter().find(|(_, hook)| hook.uses_from_app()) {
            return Err(ConfigError::GlobalFromApp { hook: name.clone() });
        }
        Ok(())
    }
}

/// Load a project file. The project folder is the directory containing it.
pub fn load_project(path: &Path) -> Result<Project, ConfigError> {
    let content = read(path)?;
    let mut project = serde_yaml::from_str::<ProjectFile>(&content)
        .map_err(|source| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            source,
        })?
        .project;

    let folder = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    project.folder = std::path::absolute(folder).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(project = %project.name, folder = %project.folder.display(), "loaded project");
    Ok(project)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
        path: path.to_path_buf(),
        source,
    })
}
