//! Project, app, service and command documents.

use super::hook::Hook;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A project: an app checked out in a folder on the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,

    /// Source directory relative to the project folder
    #[serde(default = "default_src")]
    pub src: String,

    pub app: App,

    /// Folder containing the project file, set by the loader.
    #[serde(skip)]
    pub folder: PathBuf,
}

fn default_src() -> String {
    ".".to_string()
}

impl Project {
    /// Create a new project rooted at `folder`.
    pub fn new(name: impl Into<String>, folder: impl Into<PathBuf>, app: App) -> Self {
        Self {
            name: name.into(),
            src: default_src(),
            app,
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Host path of the source directory.
    pub fn src_folder(&self) -> PathBuf {
        if self.src == "." {
            self.folder.clone()
        } else {
            self.folder.join(&self.src)
        }
    }
}

/// An app: services, commands and hooks shared by projects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct App {
    pub name: String,

    #[serde(default)]
    pub services: IndexMap<String, Service>,

    #[serde(default)]
    pub commands: IndexMap<String, Command>,

    #[serde(default)]
    pub hooks: IndexMap<String, Hook>,
}

impl App {
    /// Create a new empty app.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A long-running service of an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub command: String,

    /// Working directory relative to the project source directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    #[serde(default)]
    pub environment: IndexMap<String, String>,
}

impl Service {
    /// Create a new service running `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            working_directory: None,
            environment: IndexMap::new(),
        }
    }
}

/// A command that can be run on demand or by hooks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,

    /// Image the command runs in, for container engines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default)]
    pub environment: IndexMap<String, String>,
}

impl Command {
    /// Create a new command.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            image: None,
            environment: IndexMap::new(),
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }
}
