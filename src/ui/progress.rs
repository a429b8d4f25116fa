use crate::engine::{MultiResultQueue, StartStopResultStep, Update};
use crate::errors::ResultError;
use crate::ui::icons::{CHECK, CROSS};
use console::style;
use futures::StreamExt;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use indexmap::IndexMap;

/// Progress of starting or stopping services, one bar per service.
///
/// Bars are fed from the [`MultiResultQueue`] returned by the engine. Errors
/// are not printed while the bars are drawn; they are collected and returned
/// by [`ServiceProgress::run`] so they can be reported together.
pub struct ServiceProgress {
    /// Draw target of all bars.
    _multi: MultiProgress,
    bars: IndexMap<String, ProgressBar>,
}

impl ServiceProgress {
    /// Create the bars for `services`, drawn to stderr.
    pub fn new(services: &[String]) -> Self {
        Self::with_multi(MultiProgress::new(), services)
    }

    /// Create the bars without drawing them.
    pub fn hidden(services: &[String]) -> Self {
        Self::with_multi(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()), services)
    }

    fn with_multi(multi: MultiProgress, services: &[String]) -> Self {
        let width = services.iter().map(|s| s.len()).max().unwrap_or(0);
        let bar_style = ProgressStyle::default_bar()
            .template("{prefix:.bold} [{bar:20.cyan/blue}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");

        let bars = services
            .iter()
            .map(|service| {
                let bar = multi.add(ProgressBar::new(1));
                bar.set_style(bar_style.clone());
                bar.set_prefix(format!("{:<width$}", service, width = width));
                bar.set_message(style("Waiting...").dim().to_string());
                (service.clone(), bar)
            })
            .collect();

        Self {
            _multi: multi,
            bars,
        }
    }

    /// Apply one update of `service`.
    pub fn update(&self, service: &str, update: &Update<StartStopResultStep>) {
        let Some(bar) = self.bars.get(service) else {
            tracing::debug!(service, "update for unknown service");
            return;
        };
        match update {
            Update::Value(step) => {
                if let Some(steps) = step.steps {
                    bar.set_length(u64::from(steps));
                }
                bar.set_position(u64::from(step.current_step));
                bar.set_message(step.text.clone());
            }
            Update::Ended => {
                if let Some(len) = bar.length() {
                    bar.set_position(len);
                }
                let done = bar.message();
                bar.finish_with_message(format!("{}{}", CHECK, done));
            }
            Update::Failed(error) => {
                bar.abandon_with_message(format!("{}{}", CROSS, style(&error.message).red()));
            }
        }
    }

    /// Consume `queue` until every service finished. Returns the failed services.
    pub async fn run(&self, mut queue: MultiResultQueue<StartStopResultStep>) -> Vec<(String, ResultError)> {
        let mut failures = Vec::new();
        while let Some((service, update)) = queue.next().await {
            tracing::debug!(service = %service, ?update, "service progress");
            self.update(&service, &update);
            if let Update::Failed(error) = update {
                failures.push((service, error));
            }
        }
        failures
    }
}
