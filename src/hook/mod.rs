//! Hook system for Riptide.
//!
//! Hooks run commands when lifecycle events happen: services start or stop,
//! git operations, database changes, or user-defined `custom-` events.
//!
//! ## Configuration
//!
//! Hooks are defined in the system configuration (for all projects) and in
//! the project's app. They do not run until the user enables them:
//!
//! ```text
//! riptide hook-configure -g --enable=true          # all events, all projects
//! riptide hook-configure --enable=false git-pre-push
//! riptide hook-configure --wait-time=5              # countdown before running
//! ```
//!
//! ## Events
//!
//! See [`event::HookEvent`] for the known events and their arguments.

pub mod display;
pub mod event;
pub mod executor;
pub mod githooks;
pub mod manager;
pub mod resolver;
pub mod volumes;

#[cfg(test)]
pub(crate) mod testing;

pub use display::{ConsoleHookDisplay, HookDisplay, HookOutcome};
pub use event::{AnyHookEvent, HookEvent};
pub use executor::{NO_HOOKS_EXIT_CODE, TriggerOutcome};
pub use manager::{ApplicableEntry, ApplicableEventConfiguration, CurrentConfiguration, HookManager, HookScope};
pub use resolver::{HookConfigResolver, HookConfiguration, SingleEventConfiguration};
pub use volumes::{HookArgument, HookHostPathArgument};
