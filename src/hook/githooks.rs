//! Git hook shims that forward git hooks to `riptide hook-trigger`.
//!
//! A shim is a marked block of lines in `.git/hooks/<name>`. Existing hook
//! files keep their content; the block is appended once and then left alone,
//! so users can move it around.

use super::event::{AnyHookEvent, HookEvent};
use super::manager::HookManager;
use crate::errors::HookError;
use std::path::{Path, PathBuf};

/// First line of the shim block. Its presence means the shim is installed.
pub const GITHOOK_NEEDLE: &str = "### RIPTIDE HOOK CONFIG BEGIN";

const GITHOOK_END: &str = "### RIPTIDE HOOK CONFIG END";

/// What happened to a git hook file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShimChange {
    Created,
    Appended,
    Unchanged,
}

/// The shim block for `event`.
pub fn trigger_lines(event: HookEvent) -> String {
    format!(
        "\n{} - Do not modify or remove this line or the next lines. You can move them around.\n\
         ### If you want to disable Riptide hooks, run `riptide hook-configure`.\n\
         riptide hook-trigger {} \"$@\"\n\
         {}\n",
        GITHOOK_NEEDLE,
        event.key(),
        GITHOOK_END
    )
}

/// Path of the git hook file for `event`, if it is a git event.
pub fn githook_path(project_folder: &Path, event: HookEvent) -> Option<PathBuf> {
    event
        .git_hook_name()
        .map(|name| project_folder.join(".git").join("hooks").join(name))
}

/// Make sure the git hook for `event` calls Riptide.
pub fn ensure_githook(project_folder: &Path, event: HookEvent) -> Result<ShimChange, HookError> {
    let Some(path) = githook_path(project_folder, event) else {
        return Ok(ShimChange::Unchanged);
    };
    let io_err = |source| HookError::ShimWriteFailed {
        path: path.clone(),
        source,
    };

    if !path.exists() {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(io_err)?;
        }
        let content = format!("#!/bin/sh\nset -eu\n{}", trigger_lines(event));
        std::fs::write(&path, content).map_err(io_err)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path).map_err(io_err)?.permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).map_err(io_err)?;
        }
        return Ok(ShimChange::Created);
    }

    let content = std::fs::read_to_string(&path).map_err(io_err)?;
    if content.contains(GITHOOK_NEEDLE) {
        return Ok(ShimChange::Unchanged);
    }
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .map_err(io_err)?;
    std::io::Write::write_all(&mut file, trigger_lines(event).as_bytes()).map_err(io_err)?;
    Ok(ShimChange::Appended)
}

/// Install shims for every git event that has something to run.
///
/// Events nobody configured count as enabled here, so shims exist before
/// the user decides. Projects that are not git repositories are skipped.
pub(crate) fn setup_githooks(manager: &HookManager) -> Result<Vec<(HookEvent, ShimChange)>, HookError> {
    let Some(project) = manager.config().project() else {
        return Ok(Vec::new());
    };
    if !project.folder().join(".git").is_dir() {
        tracing::debug!(folder = %project.folder().display(), "not a git repository, skipping git hooks");
        return Ok(Vec::new());
    }

    let mut changes = Vec::new();
    for event in HookEvent::git_events() {
        let any: AnyHookEvent = (*event).into();
        if manager.get_applicable_hooks_for(&any, true, false).is_empty() {
            continue;
        }
        let change = ensure_githook(project.folder(), *event)?;
        if change != ShimChange::Unchanged {
            tracing::info!(event = %event, ?change, "updated git hook");
        }
        changes.push((*event, change));
    }
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::testing::{Fixture, hook};
    use tempfile::tempdir;

    #[test]
    fn test_trigger_lines() {
        let lines = trigger_lines(HookEvent::GitPreCommit);
        assert!(lines.starts_with("\n### RIPTIDE HOOK CONFIG BEGIN - Do not modify"));
        assert!(lines.contains("\nriptide hook-trigger git-pre-commit \"$@\"\n"));
        assert!(lines.ends_with("### RIPTIDE HOOK CONFIG END\n"));
    }

    #[test]
    fn test_creates_executable_shim() {
        let dir = tempdir().unwrap();
        let change = ensure_githook(dir.path(), HookEvent::GitPrePush).unwrap();
        assert_eq!(change, ShimChange::Created);

        let path = dir.path().join(".git/hooks/pre-push");
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("#!/bin/sh\nset -eu\n"));
        assert!(content.contains("riptide hook-trigger git-pre-push \"$@\""));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_appends_to_existing_hook() {
        let dir = tempdir().unwrap();
        let hooks = dir.path().join(".git/hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        std::fs::write(hooks.join("commit-msg"), "#!/bin/sh\nmy-linter \"$1\"\n").unwrap();

        let change = ensure_githook(dir.path(), HookEvent::GitCommitMsg).unwrap();
        assert_eq!(change, ShimChange::Appended);
        let content = std::fs::read_to_string(hooks.join("commit-msg")).unwrap();
        assert_eq!(
            content,
            format!("#!/bin/sh\nmy-linter \"$1\"\n{}", trigger_lines(HookEvent::GitCommitMsg))
        );
    }

    #[test]
    fn test_installed_shim_is_left_untouched() {
        let dir = tempdir().unwrap();
        let hooks = dir.path().join(".git/hooks");
        std::fs::create_dir_all(&hooks).unwrap();
        let moved = format!(
            "#!/bin/sh\n{}\nriptide hook-trigger git-post-merge\n### RIPTIDE HOOK CONFIG END\necho custom\n",
            GITHOOK_NEEDLE
        );
        std::fs::write(hooks.join("post-merge"), &moved).unwrap();

        let change = ensure_githook(dir.path(), HookEvent::GitPostMerge).unwrap();
        assert_eq!(change, ShimChange::Unchanged);
        assert_eq!(std::fs::read_to_string(hooks.join("post-merge")).unwrap(), moved);

        assert_eq!(
            ensure_githook(dir.path(), HookEvent::GitPostMerge).unwrap(),
            ShimChange::Unchanged
        );
    }

    #[test]
    fn test_non_git_event_is_ignored() {
        let dir = tempdir().unwrap();
        assert_eq!(
            ensure_githook(dir.path(), HookEvent::PreStart).unwrap(),
            ShimChange::Unchanged
        );
        assert!(!dir.path().join(".git").exists());
    }

    #[test]
    fn test_setup_installs_shims_for_unconfigured_events() {
        let fixture = Fixture::new()
            .project_hook("lint", hook(&["git-pre-commit", "post-start"], "make lint"))
            .global_hook("fetch", hook(&["git-post-checkout"], "git fetch"));
        std::fs::create_dir_all(fixture.project_folder().join(".git")).unwrap();
        let manager = fixture.manager();

        let changes = setup_githooks(&manager).unwrap();
        assert_eq!(
            changes,
            vec![
                (HookEvent::GitPreCommit, ShimChange::Created),
                (HookEvent::GitPostCheckout, ShimChange::Created),
            ]
        );
        assert!(fixture.project_folder().join(".git/hooks/pre-commit").exists());
        assert!(!fixture.project_folder().join(".git/hooks/pre-push").exists());
        assert_eq!(fixture.display.count("warn"), 0);

        let again = setup_githooks(&manager).unwrap();
        assert!(again.iter().all(|(_, c)| *c == ShimChange::Unchanged));
    }

    #[test]
    fn test_setup_skips_disabled_events() {
        let fixture = Fixture::new()
            .project_hook_config(r#"{"all": {"enabled": null, "wait_time": null}, "events": {"git-pre-commit": {"enabled": false, "wait_time": null}}}"#)
            .project_hook("lint", hook(&["git-pre-commit"], "make lint"));
        std::fs::create_dir_all(fixture.project_folder().join(".git")).unwrap();

        let changes = setup_githooks(&fixture.manager()).unwrap();
        assert!(changes.is_empty());
        assert!(!fixture.project_folder().join(".git/hooks/pre-commit").exists());
    }

    #[test]
    fn test_setup_skips_non_git_projects() {
        let fixture = Fixture::new().project_hook("lint", hook(&["git-pre-commit"], "make lint"));
        assert!(setup_githooks(&fixture.manager()).unwrap().is_empty());
    }
}
