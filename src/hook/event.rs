//! Hook events.
//!
//! This module defines the events hooks can subscribe to:
//! - `HookEvent`: the closed set of events Riptide knows about
//! - `AnyHookEvent`: a known event or a user-defined `custom-` event

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

/// Prefix that marks user-defined events. Custom events are only ever fired by
/// `riptide hook-trigger`.
pub const CUSTOM_HOOK_EVENT_PREFIX: &str = "custom-";

/// Prefix of all events that are backed by a git hook.
const GIT_EVENT_PREFIX: &str = "git-";

/// Lifecycle events that can trigger hooks.
///
/// Parameters passed to hooks are listed per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookEvent {
    /// Before services are started by `riptide start`.
    /// Parameters: comma-separated list of services about to be started.
    PreStart,
    /// After services were started by `riptide start`.
    /// Parameters: comma-separated list of services that are now started.
    PostStart,
    /// Before services are stopped by `riptide stop`.
    /// Parameters: comma-separated list of services about to be stopped.
    PreStop,
    /// After services were stopped by `riptide stop`.
    /// Parameters: comma-separated list of services that are now stopped.
    PostStop,
    /// Before the database environment is switched.
    /// Parameters: current environment, requested environment.
    PreDbSwitch,
    /// After the database environment was switched.
    /// Parameters: new environment.
    PostDbSwitch,
    /// Before a blank database environment is created.
    PreDbNew,
    /// After a blank database environment was created.
    PostDbNew,
    /// Before a file is imported into a database environment.
    /// Parameters: environment, file (mounted for hook commands).
    PreDbImport,
    /// After a file was imported into a database environment.
    PostDbImport,
    /// Before a database environment is exported.
    PreDbExport,
    /// After a database environment was exported.
    /// Parameters: environment, exported file (mounted for hook commands).
    PostDbExport,
    /// Before a database environment is copied.
    PreDbCopy,
    /// After a database environment was copied.
    PostDbCopy,
    /// Before files are imported into the project.
    /// Parameters: import key, file (mounted for hook commands).
    PreFileImport,
    /// After files were imported into the project.
    PostFileImport,
    /// After images and repositories were updated.
    PostUpdate,
    /// At the end of the interactive setup wizard.
    /// Parameters: `new-project` or `existing-project`.
    PostSetup,
    GitApplypatchMsg,
    GitPreApplypatch,
    GitPostApplypatch,
    GitCommitMsg,
    GitPreCommit,
    GitPostCommit,
    GitPrepareCommitMsg,
    GitPostCheckout,
    GitPreRebase,
    GitPreAutoGc,
    GitPrePush,
    GitPostRewrite,
    GitPostMerge,
}

impl HookEvent {
    /// Returns all known hook events.
    pub fn all() -> &'static [HookEvent] {
        &[
            HookEvent::PreStart,
            HookEvent::PostStart,
            HookEvent::PreStop,
            HookEvent::PostStop,
            HookEvent::PreDbSwitch,
            HookEvent::PostDbSwitch,
            HookEvent::PreDbNew,
            HookEvent::PostDbNew,
            HookEvent::PreDbImport,
            HookEvent::PostDbImport,
            HookEvent::PreDbExport,
            HookEvent::PostDbExport,
            HookEvent::PreDbCopy,
            HookEvent::PostDbCopy,
            HookEvent::PreFileImport,
            HookEvent::PostFileImport,
            HookEvent::PostUpdate,
            HookEvent::PostSetup,
            HookEvent::GitApplypatchMsg,
            HookEvent::GitPreApplypatch,
            HookEvent::GitPostApplypatch,
            HookEvent::GitCommitMsg,
            HookEvent::GitPreCommit,
            HookEvent::GitPostCommit,
            HookEvent::GitPrepareCommitMsg,
            HookEvent::GitPostCheckout,
            HookEvent::GitPreRebase,
            HookEvent::GitPreAutoGc,
            HookEvent::GitPrePush,
            HookEvent::GitPostRewrite,
            HookEvent::GitPostMerge,
        ]
    }

    /// Events backed by git hooks, in the order shims are generated.
    pub fn git_events() -> &'static [HookEvent] {
        &[
            HookEvent::GitPreCommit,
            HookEvent::GitPrepareCommitMsg,
            HookEvent::GitCommitMsg,
            HookEvent::GitPostCommit,
            HookEvent::GitApplypatchMsg,
            HookEvent::GitPreApplypatch,
            HookEvent::GitPostApplypatch,
            HookEvent::GitPreRebase,
            HookEvent::GitPostRewrite,
            HookEvent::GitPostCheckout,
            HookEvent::GitPostMerge,
            HookEvent::GitPrePush,
            HookEvent::GitPreAutoGc,
        ]
    }

    /// Returns the stable key of this event.
    pub fn key(&self) -> &'static str {
        match self {
            HookEvent::PreStart => "pre-start",
            HookEvent::PostStart => "post-start",
            HookEvent::PreStop => "pre-stop",
            HookEvent::PostStop => "post-stop",
            HookEvent::PreDbSwitch => "pre-db-switch",
            HookEvent::PostDbSwitch => "post-db-switch",
            HookEvent::PreDbNew => "pre-db-new",
            HookEvent::PostDbNew => "post-db-new",
            HookEvent::PreDbImport => "pre-db-import",
            HookEvent::PostDbImport => "post-db-import",
            HookEvent::PreDbExport => "pre-db-export",
            HookEvent::PostDbExport => "post-db-export",
            HookEvent::PreDbCopy => "pre-db-copy",
            HookEvent::PostDbCopy => "post-db-copy",
            HookEvent::PreFileImport => "pre-file-import",
            HookEvent::PostFileImport => "post-file-import",
            HookEvent::PostUpdate => "post-update",
            HookEvent::PostSetup => "post-setup",
            HookEvent::GitApplypatchMsg => "git-applypatch-msg",
            HookEvent::GitPreApplypatch => "git-pre-applypatch",
            HookEvent::GitPostApplypatch => "git-post-applypatch",
            HookEvent::GitCommitMsg => "git-commit-msg",
            HookEvent::GitPreCommit => "git-pre-commit",
            HookEvent::GitPostCommit => "git-post-commit",
            HookEvent::GitPrepareCommitMsg => "git-prepare-commit-msg",
            HookEvent::GitPostCheckout => "git-post-checkout",
            HookEvent::GitPreRebase => "git-pre-rebase",
            HookEvent::GitPreAutoGc => "git-pre-auto-gc",
            HookEvent::GitPrePush => "git-pre-push",
            HookEvent::GitPostRewrite => "git-post-rewrite",
            HookEvent::GitPostMerge => "git-post-merge",
        }
    }

    /// Looks up a known event by its exact key.
    pub fn try_from_key(key: &str) -> Option<HookEvent> {
        HookEvent::all().iter().copied().find(|e| e.key() == key)
    }

    /// Name of the git hook file backing this event, if it is a git event.
    pub fn git_hook_name(&self) -> Option<&'static str> {
        self.key().strip_prefix(GIT_EVENT_PREFIX)
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// A known hook event or a custom event starting with `custom-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnyHookEvent {
    Known(HookEvent),
    Custom(String),
}

impl AnyHookEvent {
    /// Accepts any `custom-` key as-is, otherwise looks up a known event.
    pub fn try_any_from_key(key: &str) -> Option<AnyHookEvent> {
        if key.starts_with(CUSTOM_HOOK_EVENT_PREFIX) {
            return Some(AnyHookEvent::Custom(key.to_string()));
        }
        HookEvent::try_from_key(key).map(AnyHookEvent::Known)
    }

    /// Checks that an event is known or custom.
    ///
    /// Typed events are valid by construction; strings go through
    /// [`AnyHookEvent::try_any_from_key`].
    pub fn validate(input: impl Into<EventCandidate>) -> Option<AnyHookEvent> {
        match input.into() {
            EventCandidate::Typed(event) => Some(event),
            EventCandidate::Key(key) => AnyHookEvent::try_any_from_key(&key),
        }
    }

    /// Returns the key of the event. Custom events are their own key.
    pub fn key(&self) -> &str {
        match self {
            AnyHookEvent::Known(event) => event.key(),
            AnyHookEvent::Custom(key) => key,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, AnyHookEvent::Custom(_))
    }
}

impl From<HookEvent> for AnyHookEvent {
    fn from(event: HookEvent) -> Self {
        AnyHookEvent::Known(event)
    }
}

impl TryFrom<String> for AnyHookEvent {
    type Error = ConfigError;

    fn try_from(key: String) -> Result<Self, Self::Error> {
        AnyHookEvent::try_any_from_key(&key).ok_or(ConfigError::InvalidEvent(key))
    }
}

impl From<AnyHookEvent> for String {
    fn from(event: AnyHookEvent) -> Self {
        event.key().to_string()
    }
}

impl std::str::FromStr for AnyHookEvent {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AnyHookEvent::try_from(s.to_string())
    }
}

impl std::fmt::Display for AnyHookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// Input accepted by [`AnyHookEvent::validate`].
#[derive(Debug, Clone)]
pub enum EventCandidate {
    Typed(AnyHookEvent),
    Key(String),
}

impl From<AnyHookEvent> for EventCandidate {
    fn from(event: AnyHookEvent) -> Self {
        EventCandidate::Typed(event)
    }
}

impl From<HookEvent> for EventCandidate {
    fn from(event: HookEvent) -> Self {
        EventCandidate::Typed(event.into())
    }
}

impl From<&str> for EventCandidate {
    fn from(key: &str) -> Self {
        EventCandidate::Key(key.to_string())
    }
}

impl From<String> for EventCandidate {
    fn from(key: String) -> Self {
        EventCandidate::Key(key)
    }
}
