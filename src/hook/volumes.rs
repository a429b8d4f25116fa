//! Mapping of hook arguments and host paths to bind volumes.
//!
//! Host paths passed as event arguments are mounted into hook command
//! containers under fresh paths, and the argument is replaced by that path.

use crate::config::Config;
use crate::engine::BindVolume;
use indexmap::IndexMap;
use std::path::PathBuf;
use uuid::Uuid;

/// Container path the project folder is mounted at.
pub const PROJECT_MOUNT_PATH: &str = "/project";

/// Prefix of container paths generated for host path arguments.
pub const HOOK_PATH_PREFIX: &str = "/riptide/hook/path";

/// A host path that should be mounted into the hook command container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHostPathArgument {
    pub path: PathBuf,
    pub read_only: bool,
}

impl HookHostPathArgument {
    /// Create a new writable host path argument.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: false,
        }
    }

    pub fn read_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            read_only: true,
        }
    }
}

impl std::fmt::Display for HookHostPathArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// An argument passed to hooks of an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookArgument {
    Plain(String),
    HostPath(HookHostPathArgument),
}

impl std::fmt::Display for HookArgument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HookArgument::Plain(arg) => write!(f, "{}", arg),
            HookArgument::HostPath(path) => write!(f, "{}", path),
        }
    }
}

impl From<&str> for HookArgument {
    fn from(arg: &str) -> Self {
        HookArgument::Plain(arg.to_string())
    }
}

impl From<String> for HookArgument {
    fn from(arg: String) -> Self {
        HookArgument::Plain(arg)
    }
}

impl From<HookHostPathArgument> for HookArgument {
    fn from(path: HookHostPathArgument) -> Self {
        HookArgument::HostPath(path)
    }
}

/// Arguments as plain strings, host paths as they are on the host.
pub fn flatten_arguments(args: &[HookArgument]) -> Vec<String> {
    args.iter().map(ToString::to_string).collect()
}

/// Map host path arguments to container paths and collect the volumes to mount.
///
/// `additional_host_mounts` maps container paths to host paths. The project
/// folder, if a project is loaded, is mounted first at `/project`.
pub fn apply_hook_mounts(
    config: &Config,
    args: &[HookArgument],
    additional_host_mounts: &IndexMap<String, HookHostPathArgument>,
) -> (Vec<String>, Vec<BindVolume>) {
    apply_hook_mounts_with(config, args, additional_host_mounts, || {
        Uuid::new_v4().to_string()
    })
}

fn apply_hook_mounts_with(
    config: &Config,
    args: &[HookArgument],
    additional_host_mounts: &IndexMap<String, HookHostPathArgument>,
    mut new_id: impl FnMut() -> String,
) -> (Vec<String>, Vec<BindVolume>) {
    let mut volumes = Vec::new();
    if let Some(project) = config.project() {
        volumes.push(BindVolume::new(project.folder(), PROJECT_MOUNT_PATH, false));
    }
    for (container, host) in additional_host_mounts {
        volumes.push(BindVolume::new(&host.path, container, host.read_only));
    }

    let mut new_args = Vec::with_capacity(args.len());
    for arg in args {
        match arg {
            HookArgument::Plain(arg) => new_args.push(arg.clone()),
            HookArgument::HostPath(host) => {
                let container = format!("{}/{}", HOOK_PATH_PREFIX, new_id());
                volumes.push(BindVolume::new(&host.path, &container, host.read_only));
                new_args.push(container);
            }
        }
    }
    (new_args, volumes)
}
