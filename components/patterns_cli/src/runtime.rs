//! Runs the selected compositions and renders their reports.

use crate::cli::{OutputFormat, Selection};
use crate::error::{CliError, CliResult};
use async_patterns::callback::sum_steps;
use async_patterns::{Harness, Outcome, PatternsConfig, RunReport};
use std::fmt::Write;

/// Runs selections against a configuration, each on a fresh event loop.
#[derive(Debug, Clone)]
pub struct Runner {
    config: PatternsConfig,
}

impl Runner {
    /// Create a runner for `config`
    pub fn new(config: PatternsConfig) -> Self {
        Self { config }
    }

    /// The configuration every run uses
    pub fn config(&self) -> &PatternsConfig {
        &self.config
    }

    /// Runs one selection.
    ///
    /// # Errors
    /// Returns [`CliError::Runtime`] if the event loop fails, for instance
    /// when the task budget is exhausted.
    pub fn run(&self, selection: Selection) -> CliResult<RunReport> {
        let harness = Harness::from_config(&self.config);
        let ids = self.config.ids();
        let result = match selection {
            Selection::Strategy(strategy) => harness.run_strategy(strategy, &ids),
            Selection::Scenario(scenario) => harness.run_scenario(scenario, &ids),
            Selection::CallbackSum => harness.run("callback-sum", |h| {
                sum_steps(h.trace());
                None
            }),
        };
        result.map_err(|source| CliError::Runtime {
            run: selection_name(selection).to_string(),
            source,
        })
    }

    /// Runs every selection in order, stopping at the first failure.
    pub fn run_all(&self, selections: &[Selection]) -> CliResult<Vec<RunReport>> {
        selections
            .iter()
            .map(|&selection| {
                let report = self.run(selection)?;
                tracing::info!(run = %report.name, tasks = report.stats.tasks(), "completed");
                Ok(report)
            })
            .collect()
    }

    /// Renders reports in `format`.
    pub fn render(reports: &[RunReport], format: OutputFormat) -> CliResult<String> {
        match format {
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(reports)?;
                json.push('\n');
                Ok(json)
            }
            OutputFormat::Text => Ok(render_text(reports)?),
        }
    }
}

fn selection_name(selection: Selection) -> &'static str {
    match selection {
        Selection::Strategy(strategy) => strategy.name(),
        Selection::Scenario(scenario) => scenario.name(),
        Selection::CallbackSum => "callback-sum",
    }
}

fn render_text(reports: &[RunReport]) -> Result<String, std::fmt::Error> {
    let mut out = String::new();
    for (index, report) in reports.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        write_report(&mut out, report)?;
    }
    Ok(out)
}

fn write_report(out: &mut String, report: &RunReport) -> std::fmt::Result {
    writeln!(out, "== {} ==", report.name)?;
    for entry in &report.entries {
        writeln!(out, "{entry}")?;
    }
    match &report.outcome {
        Outcome::Fulfilled { names } => writeln!(out, "outcome: fulfilled [{}]", names.join(", "))?,
        Outcome::Rejected { error } => writeln!(out, "outcome: rejected ({error})")?,
        Outcome::Pending => writeln!(out, "outcome: never settled")?,
        Outcome::Detached => writeln!(out, "outcome: none")?,
    }
    for error in &report.unhandled {
        writeln!(out, "unhandled rejection: {error}")?;
    }
    writeln!(
        out,
        "{} tasks ({} microtasks, {} timers), idle at {}",
        report.stats.tasks(),
        report.stats.microtasks,
        report.stats.timers,
        report.finished_at
    )
}
