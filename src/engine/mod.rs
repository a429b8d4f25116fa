//! Engines run the services and commands of a project.
//!
//! The [`Engine`] trait is the interface the rest of Riptide talks to.
//! Start and stop operations report per-service progress through result
//! queues, combined into one [`MultiResultQueue`].

pub mod local;
pub mod results;

pub use local::LocalEngine;
pub use results::{
    ChannelRegistry, Item, MultiResultQueue, ResultQueue, ResultSender, StartStopResultStep, Update,
};

use crate::config::{Command, Project};
use anyhow::{Result, bail};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A host path mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindVolume {
    pub host: PathBuf,
    pub container: String,
    pub read_only: bool,
}

impl BindVolume {
    /// Create a new bind volume.
    pub fn new(host: impl AsRef<Path>, container: impl Into<String>, read_only: bool) -> Self {
        Self {
            host: host.as_ref().to_path_buf(),
            container: container.into(),
            read_only,
        }
    }

    /// Mount mode, `ro` or `rw`.
    pub fn mode(&self) -> &'static str {
        if self.read_only { "ro" } else { "rw" }
    }
}

/// Interface of an engine implementation.
#[async_trait]
pub trait Engine: Send + Sync {
    fn name(&self) -> &str;

    /// Start the given services of a project. One queue per service.
    async fn start_project(
        &self,
        project: &Project,
        services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>>;

    /// Stop the given services of a project. One queue per service.
    async fn stop_project(
        &self,
        project: &Project,
        services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>>;

    /// Whether each service of the project is running.
    async fn status(&self, project: &Project) -> Result<IndexMap<String, bool>>;

    /// Run a hook command and return its exit code.
    ///
    /// `working_directory` and `args` use container paths; `volumes` maps
    /// them to host paths.
    async fn cmd_hook(
        &self,
        project: &Project,
        command: &Command,
        working_directory: &str,
        args: &[String],
        volumes: &[BindVolume],
    ) -> Result<i32>;
}

/// Create the engine named in the configuration.
pub fn load_engine(name: &str, registry: Arc<ChannelRegistry>) -> Result<Arc<dyn Engine>> {
    match name {
        "local" => Ok(Arc::new(LocalEngine::new(registry))),
        other => bail!("Unknown engine: {}. Available engines: local", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_volume_mode() {
        assert_eq!(BindVolume::new("/a", "/b", true).mode(), "ro");
        assert_eq!(BindVolume::new("/a", "/b", false).mode(), "rw");
    }

    #[test]
    fn test_load_engine() {
        let registry = ChannelRegistry::new();
        assert_eq!(load_engine("local", registry.clone()).unwrap().name(), "local");
        let err = load_engine("docker", registry).err().unwrap();
        assert!(err.to_string().contains("docker"));
    }
}
