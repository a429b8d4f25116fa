//! Typed error hierarchy for Riptide.
//!
//! - `ConfigError`: loading and validating configuration documents
//! - `HookError`: hook triggering, hook configuration persistence and git shims
//! - `QueueError`: misuse of a result queue (reading or writing past its end)
//! - `ResultError`: the error a result queue was ended with

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading and validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file at {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file at {path}: {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid hook event: {0}")]
    InvalidEvent(String),

    #[error("Hook {hook}: from_app can only be used in project hooks, not in the system configuration")]
    GlobalFromApp { hook: String },

    #[error("Hook {hook}: the app has no command named {command}")]
    MissingAppCommand { hook: String, command: String },

    #[error("Hook {hook}: working_directory must be relative to the source directory, got {path}")]
    AbsoluteWorkingDirectory { hook: String, path: String },

    #[error("No project loaded")]
    NoProject,

    #[error("Could not determine the system configuration directory")]
    NoConfigDir,
}

/// Errors from the hook subsystem.
#[derive(Debug, Error)]
pub enum HookError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to write hook configuration at {path}: {source}")]
    PersistFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize hook configuration: {0}")]
    SerializeFailed(#[from] serde_json::Error),

    #[error("Failed to update git hook at {path}: {source}")]
    ShimWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Hook {hook}: invalid args: {message}")]
    InvalidArguments { hook: String, message: String },

    #[error("Engine failed to run hook {hook}: {source}")]
    Engine {
        hook: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Contract violations when using a result queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("ResultQueue was already ended.")]
    AlreadyEnded,

    #[error("Process was interrupted.")]
    Poisoned,
}

/// Message used for poisoned queues.
pub const POISONED_MESSAGE: &str = "Process was interrupted.";

/// Error a result queue was ended with.
///
/// Displayed as `message : Cause(text)` followed by the details on a new line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultError {
    pub message: String,
    pub details: Option<String>,
    pub cause: Option<String>,
    poisoned: bool,
}

impl ResultError {
    /// Create a new error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            cause: None,
            poisoned: false,
        }
    }

    /// The error all open queues are ended with when the registry is poisoned.
    pub fn poisoned() -> Self {
        Self {
            poisoned: true,
            ..Self::new(POISONED_MESSAGE)
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Capture the cause as `TypeName(text)`, including its source chain.
    pub fn with_cause<E: std::error::Error>(mut self, cause: &E) -> Self {
        let full = std::any::type_name::<E>();
        let short = full.rsplit("::").next().unwrap_or(full);
        let mut text = format!("{}({})", short, cause);
        let mut source = cause.source();
        while let Some(inner) = source {
            text.push_str(&format!(", caused by: {}", inner));
            source = inner.source();
        }
        self.cause = Some(text);
        self
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }
}

impl std::fmt::Display for ResultError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{} : {}", self.message, cause)?,
            None => write!(f, "{}", self.message)?,
        }
        if let Some(details) = &self.details {
            write!(f, "\n{}", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ResultError {}

impl From<crate::config::hook::ResolveError> for HookError {
    fn from(err: crate::config::hook::ResolveError) -> Self {
        use crate::config::hook::ResolveError;
        match err {
            ResolveError::Config(err) => HookError::Config(err),
            ResolveError::Arguments { hook, message } => HookError::InvalidArguments { hook, message },
        }
    }
}

impl From<QueueError> for ResultError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::Poisoned => ResultError::poisoned(),
            QueueError::AlreadyEnded => ResultError::new(err.to_string()),
        }
    }
}
