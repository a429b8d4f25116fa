//! Local engine: runs services and hook commands as host processes.
//!
//! Services are spawned in the background with their output written to
//! `_riptide/logs/<service>.log` and their pid recorded in
//! `_riptide/run/<service>.pid`. Hook commands run in the foreground through
//! `sh -c`, with container paths translated back to host paths.

use super::results::{ChannelRegistry, MultiResultQueue, ResultSender, StartStopResultStep};
use super::{BindVolume, Engine};
use crate::config::files::{CONTAINER_SRC_PATH, service_log_file, service_pid_file};
use crate::config::{Command, Project, Service};
use crate::errors::ResultError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

const START_STEPS: u32 = 3;
const STOP_STEPS: u32 = 2;

/// Engine running everything directly on the host.
pub struct LocalEngine {
    registry: Arc<ChannelRegistry>,
}

impl LocalEngine {
    /// Create a new local engine reporting through queues of `registry`.
    pub fn new(registry: Arc<ChannelRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl Engine for LocalEngine {
    fn name(&self) -> &str {
        "local"
    }

    async fn start_project(
        &self,
        project: &Project,
        services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>> {
        let mut queues = Vec::with_capacity(services.len());
        for name in services {
            let (tx, rx) = self.registry.channel();
            queues.push((rx, name.clone()));

            let Some(service) = project.app.services.get(name).cloned() else {
                let _ = tx.end_with_error(ResultError::new(format!("Service {} not found.", name)));
                continue;
            };
            let job = StartJob {
                name: name.clone(),
                folder: project.folder().to_path_buf(),
                src: project.src_folder(),
                service,
            };
            tokio::spawn(async move {
                if let Err(e) = job.run(&tx).await {
                    tracing::warn!(service = %job.name, error = %e, "service failed to start");
                    let _ = tx.end_with_error(
                        ResultError::new(format!("Starting service {} failed.", job.name))
                            .with_details(format!("{:#}", e)),
                    );
                }
            });
        }
        Ok(MultiResultQueue::new(queues))
    }

    async fn stop_project(
        &self,
        project: &Project,
        services: &[String],
    ) -> Result<MultiResultQueue<StartStopResultStep>> {
        let mut queues = Vec::with_capacity(services.len());
        for name in services {
            let (tx, rx) = self.registry.channel();
            queues.push((rx, name.clone()));

            let name = name.clone();
            let pid_file = service_pid_file(project.folder(), &name);
            tokio::spawn(async move {
                if let Err(e) = stop_service(&pid_file, &tx).await {
                    tracing::warn!(service = %name, error = %e, "service failed to stop");
                    let _ = tx.end_with_error(
                        ResultError::new(format!("Stopping service {} failed.", name))
                            .with_details(format!("{:#}", e)),
                    );
                }
            });
        }
        Ok(MultiResultQueue::new(queues))
    }

    async fn status(&self, project: &Project) -> Result<IndexMap<String, bool>> {
        let mut status = IndexMap::new();
        for name in project.app.services.keys() {
            let pid_file = service_pid_file(project.folder(), name);
            let running = match read_pid(&pid_file).await? {
                Some(pid) => is_running(pid).await,
                None => false,
            };
            status.insert(name.clone(), running);
        }
        Ok(status)
    }

    async fn cmd_hook(
        &self,
        project: &Project,
        command: &Command,
        working_directory: &str,
        args: &[String],
        volumes: &[BindVolume],
    ) -> Result<i32> {
        let mut mounts: Vec<(String, PathBuf)> = volumes
            .iter()
            .map(|v| (v.container.clone(), v.host.clone()))
            .collect();
        mounts.push((CONTAINER_SRC_PATH.to_string(), project.src_folder()));

        let working_dir = translate_container_path(working_directory, &mounts);
        let args: Vec<String> = args
            .iter()
            .map(|arg| translate_container_path(arg, &mounts))
            .collect();

        tracing::info!(command = %command.command, working_dir = %working_dir, ?args, "running hook command");

        // "$@" makes the arguments reach the command unchanged.
        let status = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(format!("{} \"$@\"", command.command))
            .arg("riptide")
            .args(&args)
            .current_dir(&working_dir)
            .envs(&command.environment)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .with_context(|| format!("Failed to run hook command: {}", command.command))?;

        Ok(exit_code(status))
    }
}

struct StartJob {
    name: String,
    folder: PathBuf,
    src: PathBuf,
    service: Service,
}

impl StartJob {
    async fn run(&self, tx: &ResultSender<StartStopResultStep>) -> Result<()> {
        let pid_file = service_pid_file(&self.folder, &self.name);
        tx.put(step(START_STEPS, 1, "Checking..."))?;
        if let Some(pid) = read_pid(&pid_file).await?
            && is_running(pid).await
        {
            tx.put(step(START_STEPS, START_STEPS, "Already running"))?;
            tx.end()?;
            return Ok(());
        }

        tx.put(step(START_STEPS, 2, "Launching..."))?;
        let log_file = service_log_file(&self.folder, &self.name);
        for dir in [log_file.parent(), pid_file.parent()].into_iter().flatten() {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("Failed to open log file {}", log_file.display()))?;
        let log_err = log.try_clone().context("Failed to open log file for stderr")?;

        let working_dir = match &self.service.working_directory {
            Some(dir) => self.src.join(dir),
            None => self.src.clone(),
        };
        let child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.service.command)
            .current_dir(&working_dir)
            .envs(&self.service.environment)
            .stdin(Stdio::null())
            .process_group(0)
            .stdout(log)
            .stderr(log_err)
            .spawn()
            .with_context(|| format!("Failed to spawn service command: {}", self.service.command))?;
        let pid = child
            .id()
            .context("Service exited before its pid could be recorded")?;
        tokio::fs::write(&pid_file, pid.to_string())
            .await
            .with_context(|| format!("Failed to write pid file {}", pid_file.display()))?;

        tracing::info!(service = %self.name, pid, "service started");
        tx.put(step(START_STEPS, START_STEPS, "Started"))?;
        tx.end()?;
        Ok(())
    }
}

async fn stop_service(pid_file: &Path, tx: &ResultSender<StartStopResultStep>) -> Result<()> {
    tx.put(step(STOP_STEPS, 1, "Stopping..."))?;
    let Some(pid) = read_pid(pid_file).await? else {
        tx.put(step(STOP_STEPS, STOP_STEPS, "Not running"))?;
        tx.end()?;
        return Ok(());
    };
    if is_running(pid).await {
        // Services run in their own process group, so children go too.
        let status = tokio::process::Command::new("kill")
            .arg("-TERM")
            .arg("--")
            .arg(format!("-{}", pid))
            .status()
            .await
            .context("Failed to run kill")?;
        if !status.success() {
            anyhow::bail!("kill {} exited with {}", pid, status);
        }
    }
    tokio::fs::remove_file(pid_file)
        .await
        .with_context(|| format!("Failed to remove pid file {}", pid_file.display()))?;
    tracing::info!(pid, "service stopped");
    tx.put(step(STOP_STEPS, STOP_STEPS, "Stopped"))?;
    tx.end()?;
    Ok(())
}

fn step(steps: u32, current: u32, text: &str) -> StartStopResultStep {
    StartStopResultStep::new(Some(steps), current, text)
}

async fn read_pid(pid_file: &Path) -> Result<Option<u32>> {
    match tokio::fs::read_to_string(pid_file).await {
        Ok(content) => Ok(content.trim().parse().ok()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Failed to read pid file {}", pid_file.display())),
    }
}

async fn is_running(pid: u32) -> bool {
    tokio::process::Command::new("kill")
        .arg("-0")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Map a container path to the host path of the most specific mount containing it.
///
/// Values that are not inside any mount are returned unchanged.
pub fn translate_container_path(value: &str, mounts: &[(String, PathBuf)]) -> String {
    let best = mounts
        .iter()
        .filter(|(container, _)| {
            value == container
                || value
                    .strip_prefix(container.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|(container, _)| container.len());
    match best {
        Some((container, host)) => {
            let rest = value[container.len()..].trim_start_matches('/');
            if rest.is_empty() {
                host.to_string_lossy().into_owned()
            } else {
                host.join(rest).to_string_lossy().into_owned()
            }
        }
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::App;
    use crate::engine::results::Update;
    use futures::StreamExt;
    use tempfile::tempdir;

    fn mounts() -> Vec<(String, PathBuf)> {
        vec![
            ("/project".to_string(), PathBuf::from("/work/shop")),
            ("/src".to_string(), PathBuf::from("/work/shop/code")),
            (
                "/riptide/hook/path/abc".to_string(),
                PathBuf::from("/tmp/dump.sql"),
            ),
        ]
    }

    #[test]
    fn test_translate_container_path() {
        let m = mounts();
        assert_eq!(translate_container_path("/src", &m), "/work/shop/code");
        assert_eq!(translate_container_path("/src/www/public", &m), "/work/shop/code/www/public");
        assert_eq!(translate_container_path("/riptide/hook/path/abc", &m), "/tmp/dump.sql");
        assert_eq!(translate_container_path("/srcfoo", &m), "/srcfoo");
        assert_eq!(translate_container_path("web,db", &m), "web,db");
    }

    fn project_in(dir: &Path) -> Project {
        let mut app = App::new("test");
        app.services
            .insert("sleeper".to_string(), Service::new("sleep 30"));
        Project::new("test", dir, app)
    }

    #[tokio::test]
    async fn test_cmd_hook_returns_exit_code_and_translates_paths() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new(ChannelRegistry::new());
        let project = project_in(dir.path());
        let out = dir.path().join("out.txt");
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let command = Command::new("pwd > out.txt; echo");
        let code = engine
            .cmd_hook(&project, &command, "/src/sub", &[], &[])
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert!(!out.exists());
        assert!(dir.path().join("sub").join("out.txt").exists());

        let command = Command::new("exit 7; true");
        let code = engine
            .cmd_hook(&project, &command, "/src", &["a".to_string()], &[])
            .await
            .unwrap();
        assert_eq!(code, 7);
    }

    #[tokio::test]
    async fn test_cmd_hook_passes_arguments() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new(ChannelRegistry::new());
        let project = project_in(dir.path());
        let host_file = dir.path().join("input.txt");
        std::fs::write(&host_file, "hello").unwrap();
        let volumes = vec![BindVolume::new(&host_file, "/riptide/hook/path/1", true)];

        let command = Command::new("cp").with_env("UNUSED", "1");
        let code = engine
            .cmd_hook(
                &project,
                &command,
                "/src",
                &["/riptide/hook/path/1".to_string(), "copy.txt".to_string()],
                &volumes,
            )
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(dir.path().join("copy.txt")).unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_start_status_stop() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new(ChannelRegistry::new());
        let project = project_in(dir.path());
        let services = vec!["sleeper".to_string()];

        let updates: Vec<_> = engine
            .start_project(&project, &services)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(updates.last(), Some(&("sleeper".to_string(), Update::Ended)));
        assert!(service_pid_file(dir.path(), "sleeper").exists());
        assert!(engine.status(&project).await.unwrap()["sleeper"]);

        let updates: Vec<_> = engine
            .stop_project(&project, &services)
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(updates.last(), Some(&("sleeper".to_string(), Update::Ended)));
        assert!(!service_pid_file(dir.path(), "sleeper").exists());
        assert!(!engine.status(&project).await.unwrap()["sleeper"]);
    }

    #[tokio::test]
    async fn test_start_unknown_service_fails_only_its_queue() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new(ChannelRegistry::new());
        let project = project_in(dir.path());

        let updates: Vec<_> = engine
            .start_project(&project, &["missing".to_string()])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(updates.len(), 1);
        assert!(matches!(&updates[0].1, Update::Failed(e) if e.message.contains("missing")));
    }

    #[tokio::test]
    async fn test_stop_not_running() {
        let dir = tempdir().unwrap();
        let engine = LocalEngine::new(ChannelRegistry::new());
        let project = project_in(dir.path());

        let updates: Vec<_> = engine
            .stop_project(&project, &["sleeper".to_string()])
            .await
            .unwrap()
            .collect()
            .await;
        assert_eq!(
            updates,
            vec![
                (
                    "sleeper".to_string(),
                    Update::Value(step(STOP_STEPS, 1, "Stopping..."))
                ),
                (
                    "sleeper".to_string(),
                    Update::Value(step(STOP_STEPS, STOP_STEPS, "Not running"))
                ),
                ("sleeper".to_string(), Update::Ended),
            ]
        );
    }
}
