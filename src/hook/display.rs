//! Terminal output of the hook subsystem.

use console::style;
use std::io::Write;

/// How a hook execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Success,
    /// Failed, but `continue_on_error` is set.
    Warn,
    Failed,
}

/// Receives user-facing hook output.
pub trait HookDisplay: Send + Sync {
    /// Announce the countdown before hooks of `event_key` run.
    fn will_run_hook(&self, event_key: &str, seconds: u32);
    fn will_run_hook_tick(&self);
    /// Clear the countdown line.
    fn after_will_run_hook(&self);
    fn system_info(&self, msg: &str);
    fn system_warn(&self, msg: &str);
    fn hook_execution_begin(&self, event_key: &str, name: &str);
    fn hook_execution_end(&self, event_key: &str, name: &str, outcome: HookOutcome);
}

/// Warning shown when hooks exist for an event but hooks were never configured.
pub fn hook_not_configured_warning(event_key: &str) -> String {
    format!(
        "Riptide has hooks defined for this action. They are not run by default for security reasons.\n\
         To disable this warning, please configure your choice for hooks globally:\n    \
         riptide hook-configure -g --enable=true/false\n\
         \n\
         You can also configure your choice specifically for this project:\n    \
         riptide hook-configure --enable=true/false\n\
         Additionally you can configure what should happen for this event specifically\n    \
         riptide hook-configure [-g] --enable=true/false {}\n\
         \n\
         Please see the Riptide documentation for more information.",
        event_key
    )
}

/// Prints hook output to stdout.
#[derive(Debug, Default)]
pub struct ConsoleHookDisplay;

impl ConsoleHookDisplay {
    /// Create a new console display.
    pub fn new() -> Self {
        Self
    }

    fn print_inline(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "{}", text);
        let _ = out.flush();
    }
}

impl HookDisplay for ConsoleHookDisplay {
    fn will_run_hook(&self, event_key: &str, seconds: u32) {
        self.print_inline(&format!(
            "{} Will run {} hooks in {} seconds. Hit CTRL+C to skip running hooks",
            style("Riptide Hooks:").cyan().bold(),
            style(event_key).bold(),
            seconds
        ));
    }

    fn will_run_hook_tick(&self) {
        self.print_inline(".");
    }

    fn after_will_run_hook(&self) {
        let cols = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);
        self.print_inline(&format!("\r{}\r", " ".repeat(cols)));
    }

    fn system_info(&self, msg: &str) {
        println!("{} {}", style("Riptide Hooks:").cyan().bold(), msg);
    }

    fn system_warn(&self, msg: &str) {
        println!(
            "{} {}",
            style("Riptide Warning:").yellow().bold(),
            style(msg).yellow()
        );
    }

    fn hook_execution_begin(&self, event_key: &str, name: &str) {
        println!(
            "{} Running {} Hook: {}...",
            style("Riptide Hooks:").cyan().bold(),
            event_key,
            style(name).bold()
        );
    }

    fn hook_execution_end(&self, _event_key: &str, name: &str, outcome: HookOutcome) {
        match outcome {
            HookOutcome::Success => println!(
                "{} Hook {} finished.",
                style("Riptide Hooks:").cyan().bold(),
                name
            ),
            HookOutcome::Warn => println!(
                "{} Hook failed. Continuing...",
                style("Riptide Warning:").yellow().bold()
            ),
            HookOutcome::Failed => println!(
                "{} {}",
                style("Riptide Hooks:").cyan().bold(),
                style("Hook failed.").red()
            ),
        }
    }
}

/// Records display calls, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingDisplay {
    pub events: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingDisplay {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
impl HookDisplay for RecordingDisplay {
    fn will_run_hook(&self, event_key: &str, seconds: u32) {
        self.push(format!("will_run {} {}", event_key, seconds));
    }

    fn will_run_hook_tick(&self) {
        self.push("tick".to_string());
    }

    fn after_will_run_hook(&self) {
        self.push("after_will_run".to_string());
    }

    fn system_info(&self, msg: &str) {
        self.push(format!("info {}", msg));
    }

    fn system_warn(&self, msg: &str) {
        self.push(format!("warn {}", msg));
    }

    fn hook_execution_begin(&self, event_key: &str, name: &str) {
        self.push(format!("begin {} {}", event_key, name));
    }

    fn hook_execution_end(&self, event_key: &str, name: &str, outcome: HookOutcome) {
        self.push(format!("end {} {} {:?}", event_key, name, outcome));
    }
}
