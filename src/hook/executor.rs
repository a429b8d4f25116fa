//! Triggering events: countdown, then running hooks and plugins in order.

use super::display::HookOutcome;
use super::event::AnyHookEvent;
use super::manager::{ApplicableEntry, HookManager, HookScope, LoadedHook};
use super::volumes::{HookArgument, HookHostPathArgument, apply_hook_mounts, flatten_arguments};
use crate::engine::BindVolume;
use crate::errors::HookError;
use indexmap::IndexMap;
use tokio_util::sync::CancellationToken;

/// Exit code reported when no hook ran.
pub const NO_HOOKS_EXIT_CODE: i32 = -1;

/// Result of triggering an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// Nothing was applicable, or the event is disabled.
    NoHooks,
    /// The user skipped the hooks during the countdown.
    Skipped,
    /// Hooks ran. Non-zero if a hook failed without `continue_on_error`.
    Finished(i32),
}

impl TriggerOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            TriggerOutcome::NoHooks => NO_HOOKS_EXIT_CODE,
            TriggerOutcome::Skipped => 0,
            TriggerOutcome::Finished(code) => *code,
        }
    }
}

impl HookManager {
    /// Trigger `event` and run all applicable hooks.
    ///
    /// Host path arguments and `additional_host_mounts` (container path to
    /// host path) are mounted into hook commands. If a wait time is
    /// configured, a countdown runs first; cancelling `cancel` during it skips
    /// all hooks.
    pub async fn trigger_event_on_cli(
        &self,
        event: &AnyHookEvent,
        args: &[HookArgument],
        additional_host_mounts: &IndexMap<String, HookHostPathArgument>,
        cancel: &CancellationToken,
    ) -> Result<TriggerOutcome, HookError> {
        let (container_args, volumes) = apply_hook_mounts(&self.config, args, additional_host_mounts);

        let entries = self.get_applicable_hooks_for(event, false, true);
        if entries.is_empty() {
            tracing::debug!(event = %event, "no hooks to run");
            return Ok(TriggerOutcome::NoHooks);
        }

        let wait_time = self.resolver.event_wait_time(event);
        if wait_time > 0 && !self.countdown(event, wait_time, cancel).await {
            tracing::info!(event = %event, "hooks skipped by user");
            self.display.system_info("Hooks skipped.");
            return Ok(TriggerOutcome::Skipped);
        }

        for entry in &entries {
            let code = match entry {
                ApplicableEntry::Plugin { name, plugin } => {
                    self.display.hook_execution_begin(event.key(), name);
                    let code = plugin
                        .event_triggered(&self.config, event, &flatten_arguments(args))
                        .await;
                    if code != 0 {
                        self.display
                            .hook_execution_end(event.key(), name, HookOutcome::Failed);
                        return Ok(TriggerOutcome::Finished(code));
                    }
                    code
                }
                ApplicableEntry::Hook(loaded) => {
                    let Some(code) = self
                        .run_hook(event, loaded, &container_args, &volumes)
                        .await?
                    else {
                        continue;
                    };
                    if code != 0 && !loaded.hook.continue_on_error {
                        self.display
                            .hook_execution_end(event.key(), &loaded.key, HookOutcome::Failed);
                        return Ok(TriggerOutcome::Finished(code));
                    }
                    code
                }
            };
            let outcome = if code == 0 {
                HookOutcome::Success
            } else {
                HookOutcome::Warn
            };
            self.display
                .hook_execution_end(event.key(), entry.name(), outcome);
        }
        Ok(TriggerOutcome::Finished(0))
    }

    /// Run one hook through the engine. `None` if it was skipped.
    async fn run_hook(
        &self,
        event: &AnyHookEvent,
        loaded: &LoadedHook,
        container_args: &[String],
        volumes: &[BindVolume],
    ) -> Result<Option<i32>, HookError> {
        let Some(project) = self.config.project() else {
            self.display.system_warn(&format!(
                "Hook {} skipped: hooks can only run with a project loaded.",
                loaded.key
            ));
            return Ok(None);
        };

        let app = match loaded.scope {
            HookScope::Project => Some(&project.app),
            HookScope::Default => None,
        };
        let (command, mut args) = loaded.hook.resolve_command(app)?;
        let working_directory = loaded.hook.container_working_directory()?;
        if loaded.hook.pass_event_arguments {
            args.extend(container_args.iter().cloned());
        }

        self.display.hook_execution_begin(event.key(), &loaded.key);
        tracing::info!(event = %event, hook = %loaded.key, scope = %loaded.scope, "running hook");
        let code = self
            .engine
            .cmd_hook(project, &command, &working_directory, &args, volumes)
            .await
            .map_err(|source| HookError::Engine {
                hook: loaded.key.clone(),
                source,
            })?;
        tracing::debug!(hook = %loaded.key, code, "hook finished");
        Ok(Some(code))
    }

    /// Count down `seconds` ticks. Returns false if cancelled.
    async fn countdown(&self, event: &AnyHookEvent, seconds: u32, cancel: &CancellationToken) -> bool {
        self.display.will_run_hook(event.key(), seconds);
        for _ in 0..seconds {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.display.after_will_run_hook();
                    return false;
                }
                _ = tokio::time::sleep(self.countdown_tick) => {
                    self.display.will_run_hook_tick();
                }
            }
        }
        self.display.after_will_run_hook();
        true
    }
}
