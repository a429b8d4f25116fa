//! Paths of the files and directories Riptide uses.

use crate::errors::ConfigError;
use std::path::{Path, PathBuf};

/// Name of project files found during discovery.
pub const PROJECT_FILE_NAME: &str = "riptide.yml";
/// Name of the meta folder inside a project.
pub const PROJECT_META_FOLDER_NAME: &str = "_riptide";
/// Name of the system configuration file.
pub const MAIN_CONFIG_FILE_NAME: &str = "config.yml";
/// Name of the hook configuration files, both system-wide and per project.
pub const HOOK_CONFIG_FILE_NAME: &str = "hooks.json";
/// Path of the project source code inside containers.
pub const CONTAINER_SRC_PATH: &str = "/src";
/// Environment variable that overrides the system configuration directory.
pub const CONFIG_DIR_ENV: &str = "RIPTIDE_CONFIG_DIR";

/// Directory of the system configuration.
pub fn riptide_config_dir() -> Result<PathBuf, ConfigError> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("riptide"))
        .ok_or(ConfigError::NoConfigDir)
}

pub fn riptide_main_config_file(config_dir: &Path) -> PathBuf {
    config_dir.join(MAIN_CONFIG_FILE_NAME)
}

/// Hook configuration shared by all projects.
pub fn global_hook_config_file(config_dir: &Path) -> PathBuf {
    config_dir.join(HOOK_CONFIG_FILE_NAME)
}

pub fn project_meta_folder(project_folder: &Path) -> PathBuf {
    project_folder.join(PROJECT_META_FOLDER_NAME)
}

pub fn project_hook_config_file(project_folder: &Path) -> PathBuf {
    project_meta_folder(project_folder).join(HOOK_CONFIG_FILE_NAME)
}

/// Log file of a service started by the local engine.
pub fn service_log_file(project_folder: &Path, service: &str) -> PathBuf {
    project_meta_folder(project_folder)
        .join("logs")
        .join(format!("{}.log", service))
}

/// Pid file of a service started by the local engine.
pub fn service_pid_file(project_folder: &Path, service: &str) -> PathBuf {
    project_meta_folder(project_folder)
        .join("run")
        .join(format!("{}.pid", service))
}

/// Starting at `start`, walk up the directory tree looking for a project file.
pub fn discover_project_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(PROJECT_FILE_NAME))
        .find(|candidate| candidate.is_file())
}
