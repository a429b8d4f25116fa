//! Hook trigger, configuration, listing and setup commands.

use anyhow::{Result, bail};
use console::style;
use indexmap::IndexMap;
use riptide::hook::resolver::HookFlagConfiguration;
use riptide::hook::{AnyHookEvent, HookArgument, TriggerOutcome};
use std::path::Path;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::Context;

fn parse_event(key: &str) -> Result<AnyHookEvent> {
    match AnyHookEvent::try_any_from_key(key) {
        Some(event) => Ok(event),
        None => bail!(
            "Unknown event '{}'. Run `riptide hook-list` to see the known events, or use a custom-<name> event.",
            key
        ),
    }
}

/// Cancel `token` on Ctrl-C, until the returned task is aborted.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupted");
            token.cancel();
        }
    })
}

/// Run the hooks of `event`. Returns the exit code; no hooks is a success.
pub async fn cmd_hook_trigger(project_file: Option<&Path>, event: &str, args: &[String]) -> Result<i32> {
    let event = parse_event(event)?;
    let ctx = Context::load(project_file)?;
    let manager = ctx.hook_manager();

    let cancel = CancellationToken::new();
    let listener = cancel_on_ctrl_c(cancel.clone());

    let args: Vec<HookArgument> = args.iter().map(|a| HookArgument::from(a.as_str())).collect();
    let outcome = manager
        .trigger_event_on_cli(&event, &args, &IndexMap::new(), &cancel)
        .await;
    listener.abort();
    let outcome = outcome?;
    Ok(match outcome {
        TriggerOutcome::NoHooks => 0,
        other => other.exit_code(),
    })
}

pub fn cmd_hook_configure(
    project_file: Option<&Path>,
    global: bool,
    enable: Option<bool>,
    wait_time: Option<u32>,
    event: Option<&str>,
) -> Result<()> {
    if enable.is_none() && wait_time.is_none() {
        bail!("Nothing to configure. Pass --enable and/or --wait-time.");
    }
    let event = event.map(parse_event).transpose()?;
    let ctx = Context::load(project_file)?;
    if !global {
        ctx.require_project()?;
    }

    let mut manager = ctx.hook_manager();
    manager.configure_event(event.as_ref(), global, enable, wait_time)?;

    let scope = if global { "all projects" } else { "this project" };
    let target = event.as_ref().map(|e| e.key()).unwrap_or("all events");
    println!(
        "{} Updated hook configuration for {} ({}).",
        style("Riptide Hooks:").cyan().bold(),
        style(target).bold(),
        scope
    );
    Ok(())
}

fn flag<T: std::fmt::Display>(flag: &HookFlagConfiguration<T>) -> String {
    let show = |v: &Option<T>| v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "-".into());
    format!(
        "{} (default: {}, project: {})",
        flag.effective,
        show(&flag.default),
        show(&flag.project)
    )
}

pub fn cmd_hook_list(project_file: Option<&Path>) -> Result<()> {
    let ctx = Context::load(project_file)?;
    let manager = ctx.hook_manager();
    let current = manager.get_current_configuration();

    println!();
    println!("{}", style("Defaults").bold());
    println!("  enabled:   {}", flag(&current.enabled));
    println!("  wait time: {}", flag(&current.wait_time));
    println!();
    println!(
        "{:<24} {:<36} {:<32} Hooks",
        "Event", "Enabled", "Wait time"
    );
    println!(
        "{:<24} {:<36} {:<32} -----",
        "-----", "-------", "---------"
    );
    for event in &current.events {
        let hooks = event
            .hooks
            .iter()
            .map(|h| format!("{} ({})", h.key, h.scope))
            .collect::<Vec<_>>()
            .join(", ");
        let enabled = format!("{:<36}", flag(&event.enabled));
        let enabled = if event.enabled.effective {
            style(enabled).green()
        } else {
            style(enabled).dim()
        };
        println!(
            "{:<24} {} {:<32} {}",
            event.event.key(),
            enabled,
            flag(&event.wait_time),
            hooks
        );
    }
    println!();
    Ok(())
}

pub fn cmd_hook_setup(project_file: Option<&Path>) -> Result<()> {
    let ctx = Context::load(project_file)?;
    ctx.hook_manager().setup()?;
    println!(
        "{} Hook configuration is set up.",
        style("Riptide Hooks:").cyan().bold()
    );
    Ok(())
}
