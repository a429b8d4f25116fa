//! Service start, stop and status commands.

use anyhow::{Result, bail};
use console::style;
use indexmap::IndexMap;
use riptide::config::Project;
use riptide::engine::{MultiResultQueue, StartStopResultStep};
use riptide::errors::ResultError;
use riptide::hook::{AnyHookEvent, HookArgument, HookEvent, HookManager, TriggerOutcome};
use riptide::ui::ServiceProgress;
use riptide::ui::icons::{CROSS, RUNNING, STOPPED};
use std::path::Path;
use tokio_util::sync::CancellationToken;

use super::Context;
use super::hook::cancel_on_ctrl_c;

/// Services to act on: the given ones, or every service of the app.
fn select_services(project: &Project, services: &[String]) -> Vec<String> {
    if services.is_empty() {
        project.app.services.keys().cloned().collect()
    } else {
        services.to_vec()
    }
}

/// Trigger `event` with the comma-joined service list. Fails if a hook failed.
async fn trigger(manager: &HookManager, event: HookEvent, services: &[String]) -> Result<()> {
    let cancel = CancellationToken::new();
    let listener = cancel_on_ctrl_c(cancel.clone());
    let args = vec![HookArgument::from(services.join(","))];
    let outcome = manager
        .trigger_event_on_cli(&AnyHookEvent::from(event), &args, &IndexMap::new(), &cancel)
        .await;
    listener.abort();

    if let TriggerOutcome::Finished(code) = outcome?
        && code != 0
    {
        bail!("{} hooks failed with exit code {}", event, code);
    }
    Ok(())
}

/// Render progress until every service is done; Ctrl-C interrupts all of them.
async fn follow(
    ctx: &Context,
    services: &[String],
    queue: MultiResultQueue<StartStopResultStep>,
) -> Vec<(String, ResultError)> {
    let progress = ServiceProgress::new(services);
    let registry = ctx.registry.clone();
    let listener = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, ending all service queues");
            registry.poison();
        }
    });
    let failures = progress.run(queue).await;
    listener.abort();
    failures
}

/// Trigger the post hooks of `event`, unless the services were interrupted.
async fn trigger_post(ctx: &Context, manager: &HookManager, event: HookEvent, services: &[String]) -> Result<()> {
    if ctx.registry.is_poisoned() {
        tracing::info!(event = %event, "interrupted, skipping hooks");
        return Ok(());
    }
    trigger(manager, event, services).await
}

fn report_failures(action: &str, failures: &[(String, ResultError)]) -> bool {
    if failures.is_empty() {
        return true;
    }
    eprintln!();
    eprintln!("{}Errors while {} services:", CROSS, action);
    for (service, error) in failures {
        eprintln!("  {}: {}", style(service).bold(), error);
    }
    false
}

/// Start services. Returns `false` if a service failed to start.
pub async fn cmd_start(project_file: Option<&Path>, services: &[String]) -> Result<bool> {
    let ctx = Context::load(project_file)?;
    let project = ctx.require_project()?;
    let services = select_services(project, services);
    let manager = ctx.hook_manager();

    trigger(&manager, HookEvent::PreStart, &services).await?;

    println!("{} Starting services of {}...", style("Riptide:").cyan().bold(), style(&project.name).bold());
    let queue = ctx.engine.start_project(project, &services).await?;
    let failures = follow(&ctx, &services, queue).await;
    let ok = report_failures("starting", &failures);

    trigger_post(&ctx, &manager, HookEvent::PostStart, &services).await?;
    Ok(ok)
}

/// Stop services. Returns `false` if a service failed to stop.
pub async fn cmd_stop(project_file: Option<&Path>, services: &[String]) -> Result<bool> {
    let ctx = Context::load(project_file)?;
    let project = ctx.require_project()?;
    let services = select_services(project, services);
    let manager = ctx.hook_manager();

    trigger(&manager, HookEvent::PreStop, &services).await?;

    println!("{} Stopping services of {}...", style("Riptide:").cyan().bold(), style(&project.name).bold());
    let queue = ctx.engine.stop_project(project, &services).await?;
    let failures = follow(&ctx, &services, queue).await;
    let ok = report_failures("stopping", &failures);

    trigger_post(&ctx, &manager, HookEvent::PostStop, &services).await?;
    Ok(ok)
}

pub async fn cmd_status(project_file: Option<&Path>) -> Result<()> {
    let ctx = Context::load(project_file)?;
    let project = ctx.require_project()?;
    let status = ctx.engine.status(project).await?;

    println!();
    println!("{:<24} Status", "Service");
    println!("{:<24} ------", "-------");
    for (service, running) in &status {
        if *running {
            println!("{:<24} {}{}", service, RUNNING, style("running").green());
        } else {
            println!("{:<24} {}{}", service, STOPPED, style("stopped").dim());
        }
    }
    println!();
    Ok(())
}
