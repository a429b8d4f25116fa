//! CLI command implementations.
//!
//! | Module    | Commands handled                                              |
//! |-----------|----------------------------------------------------------------|
//! | `hook`    | `HookTrigger`, `HookConfigure`, `HookList`, `HookSetup`        |
//! | `project` | `Start`, `Stop`, `Status`                                      |

pub mod hook;
pub mod project;

pub use hook::{cmd_hook_configure, cmd_hook_list, cmd_hook_setup, cmd_hook_trigger};
pub use project::{cmd_start, cmd_status, cmd_stop};

use anyhow::{Context as _, Result};
use riptide::config::Config;
use riptide::config::files::{discover_project_file, riptide_config_dir};
use riptide::engine::{ChannelRegistry, Engine, load_engine};
use riptide::hook::{ConsoleHookDisplay, HookManager};
use riptide::plugin::PluginRegistry;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a command needs: configuration, engine and hooks.
pub struct Context {
    pub config: Arc<Config>,
    pub registry: Arc<ChannelRegistry>,
    pub engine: Arc<dyn Engine>,
    pub plugins: PluginRegistry,
}

impl Context {
    /// Load the system configuration and the project, if there is one.
    ///
    /// Without `project_file`, the project file is searched upwards from the
    /// current directory.
    pub fn load(project_file: Option<&Path>) -> Result<Self> {
        let config_dir = riptide_config_dir()?;
        let project_file = match project_file {
            Some(path) => Some(path.to_path_buf()),
            None => find_project_file()?,
        };
        let config = Config::load(&config_dir, project_file.as_deref())
            .context("Failed to load configuration")?;
        tracing::debug!(
            config_dir = %config_dir.display(),
            project = config.project().map(|p| p.name.as_str()).unwrap_or("-"),
            engine = %config.engine,
            "configuration loaded"
        );

        let registry = ChannelRegistry::new();
        let engine = load_engine(&config.engine, Arc::clone(&registry))?;
        let plugins = PluginRegistry::new();
        plugins.after_load_engine(engine.as_ref());
        plugins.after_reload_config(&config);

        Ok(Self {
            config: Arc::new(config),
            registry,
            engine,
            plugins,
        })
    }

    /// Hook manager printing to the console.
    pub fn hook_manager(&self) -> HookManager {
        HookManager::new(
            Arc::clone(&self.config),
            Arc::clone(&self.engine),
            self.plugins.clone(),
            Arc::new(ConsoleHookDisplay::new()),
        )
    }

    /// The loaded project, or an error naming the missing project file.
    pub fn require_project(&self) -> Result<&riptide::config::Project> {
        self.config.project().with_context(|| {
            format!(
                "No project found. Create a {} file or pass --project-file.",
                riptide::config::files::PROJECT_FILE_NAME
            )
        })
    }
}

fn find_project_file() -> Result<Option<PathBuf>> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Ok(discover_project_file(&cwd))
}
