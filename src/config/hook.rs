//! Hook documents.
//!
//! A hook subscribes to one or more events and runs either an inline command
//! definition or a command of the project's app:
//!
//! ```yaml
//! hooks:
//!   check:
//!     events:
//!       - git-pre-commit
//!       - custom-post-magic
//!     continue_on_error: true
//!     working_directory: www
//!     command:
//!       run:
//!         command: ./vendor/bin/phpcs
//!   migrate:
//!     events: [post-start]
//!     command:
//!       from_app: console
//!       args: "doctrine:migrations:migrate --no-interaction"
//! ```

use super::files::CONTAINER_SRC_PATH;
use super::project::{App, Command};
use crate::errors::ConfigError;
use crate::hook::event::AnyHookEvent;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A hook definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hook {
    /// Name assigned from the key of the parent mapping.
    #[serde(skip)]
    pub name: Option<String>,

    /// Events that trigger this hook
    pub events: Vec<AnyHookEvent>,

    /// Whether a failure of this hook is only reported as a warning
    #[serde(default)]
    pub continue_on_error: bool,

    /// Whether the event arguments are appended to the command
    #[serde(default = "default_pass_event_arguments")]
    pub pass_event_arguments: bool,

    /// Working directory relative to the project source directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,

    pub command: HookCommand,
}

fn default_pass_event_arguments() -> bool {
    true
}

/// What a hook runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HookCommand {
    /// An inline command definition.
    Run { run: Command },
    /// A command of the project's app, with optional shell-style arguments.
    FromApp {
        from_app: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        args: Option<String>,
    },
}

impl Hook {
    /// Create a hook running an inline command.
    pub fn new(events: Vec<AnyHookEvent>, command: impl Into<String>) -> Self {
        Self {
            name: None,
            events,
            continue_on_error: false,
            pass_event_arguments: true,
            working_directory: None,
            command: HookCommand::Run {
                run: Command::new(command),
            },
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    pub fn with_pass_event_arguments(mut self, pass: bool) -> Self {
        self.pass_event_arguments = pass;
        self
    }

    pub fn with_working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn with_command(mut self, command: HookCommand) -> Self {
        self.command = command;
        self
    }

    /// Name for display, `?` for unnamed hooks.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("?")
    }

    pub fn matches_event(&self, event: &AnyHookEvent) -> bool {
        self.events.contains(event)
    }

    pub fn uses_from_app(&self) -> bool {
        matches!(self.command, HookCommand::FromApp { .. })
    }

    /// Working directory inside the container.
    ///
    /// The configured directory is joined onto the source path. Absolute
    /// directories are rejected.
    pub fn container_working_directory(&self) -> Result<String, ConfigError> {
        match &self.working_directory {
            None => Ok(CONTAINER_SRC_PATH.to_string()),
            Some(dir) if dir.starts_with('/') => Err(ConfigError::AbsoluteWorkingDirectory {
                hook: self.display_name().to_string(),
                path: dir.clone(),
            }),
            Some(dir) => Ok(Path::new(CONTAINER_SRC_PATH)
                .join(dir)
                .to_string_lossy()
                .into_owned()),
        }
    }

    /// Resolve the command to run and the arguments from `from_app`.
    ///
    /// `app` is the app of the loaded project, `None` for hooks of the system
    /// configuration.
    pub fn resolve_command(&self, app: Option<&App>) -> Result<(Command, Vec<String>), ResolveError> {
        match &self.command {
            HookCommand::Run { run } => Ok((run.clone(), Vec::new())),
            HookCommand::FromApp { from_app, args } => {
                let app = app.ok_or_else(|| ConfigError::GlobalFromApp {
                    hook: self.display_name().to_string(),
                })?;
                let command = app.commands.get(from_app).ok_or_else(|| {
                    ConfigError::MissingAppCommand {
                        hook: self.display_name().to_string(),
                        command: from_app.clone(),
                    }
                })?;
                let args = match args {
                    Some(args) => shell_words::split(args).map_err(|e| ResolveError::Arguments {
                        hook: self.display_name().to_string(),
                        message: e.to_string(),
                    })?,
                    None => Vec::new(),
                };
                Ok((command.clone(), args))
            }
        }
    }
}

/// Failure to resolve the command of a hook.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Hook {hook}: invalid args: {message}")]
    Arguments { hook: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::event::HookEvent;

    fn app_with_console() -> App {
        let mut app = App::new("shop");
        app.commands
            .insert("console".to_string(), Command::new("php bin/console"));
        app
    }

    #[test]
    fn test_parse_run_hook() {
        let yaml = r#"
events: [git-pre-commit, custom-post-magic]
continue_on_error: true
working_directory: www
command:
  run:
    command: ./check.sh
"#;
        let hook: Hook = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            hook.events,
            vec![
                AnyHookEvent::Known(HookEvent::GitPreCommit),
                AnyHookEvent::Custom("custom-post-magic".to_string())
            ]
        );
        assert!(hook.continue_on_error);
        assert!(hook.pass_event_arguments);
        assert!(!hook.uses_from_app());
        match &hook.command {
            HookCommand::Run { run } => assert_eq!(run.command, "./check.sh"),
            _ => panic!("Expected Run"),
        }
    }

    #[test]
    fn test_parse_from_app_hook() {
        let yaml = r#"
events: [post-start]
pass_event_arguments: false
command:
  from_app: console
  args: "cache:clear --env 'prod env'"
"#;
        let hook: Hook = serde_yaml::from_str(yaml).unwrap();
        assert!(!hook.continue_on_error);
        assert!(!hook.pass_event_arguments);
        assert!(hook.uses_from_app());

        let (command, args) = hook.resolve_command(Some(&app_with_console())).unwrap();
        assert_eq!(command.command, "php bin/console");
        assert_eq!(args, vec!["cache:clear", "--env", "prod env"]);
    }

    #[test]
    fn test_parse_rejects_unknown_event() {
        let yaml = "events: [pre-boot]\ncommand:\n  run:\n    command: x\n";
        assert!(serde_yaml::from_str::<Hook>(yaml).is_err());
    }

    #[test]
    fn test_from_app_without_project_app_is_error() {
        let hook = Hook::new(vec![HookEvent::PreStart.into()], "x")
            .with_name("migrate")
            .with_command(HookCommand::FromApp {
                from_app: "console".to_string(),
                args: None,
            });
        match hook.resolve_command(None) {
            Err(ResolveError::Config(ConfigError::GlobalFromApp { hook })) => {
                assert_eq!(hook, "migrate")
            }
            other => panic!("Expected GlobalFromApp, got {:?}", other),
        }
    }

    #[test]
    fn test_from_app_missing_command_is_error() {
        let hook = Hook::new(vec![HookEvent::PreStart.into()], "x").with_command(
            HookCommand::FromApp {
                from_app: "missing".to_string(),
                args: None,
            },
        );
        assert!(matches!(
            hook.resolve_command(Some(&app_with_console())),
            Err(ResolveError::Config(ConfigError::MissingAppCommand { .. }))
        ));
    }

    #[test]
    fn test_from_app_unbalanced_args_is_error() {
        let hook = Hook::new(vec![HookEvent::PreStart.into()], "x").with_command(
            HookCommand::FromApp {
                from_app: "console".to_string(),
                args: Some("'unterminated".to_string()),
            },
        );
        assert!(matches!(
            hook.resolve_command(Some(&app_with_console())),
            Err(ResolveError::Arguments { .. })
        ));
    }

    #[test]
    fn test_container_working_directory() {
        let hook = Hook::new(vec![HookEvent::PreStart.into()], "x");
        assert_eq!(hook.container_working_directory().unwrap(), "/src");

        let hook = hook.with_working_directory("www/public");
        assert_eq!(hook.container_working_directory().unwrap(), "/src/www/public");

        let hook = hook.with_working_directory("/etc");
        assert!(matches!(
            hook.container_working_directory(),
            Err(ConfigError::AbsoluteWorkingDirectory { .. })
        ));
    }
}
