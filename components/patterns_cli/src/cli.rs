//! Command-line arguments.

use crate::error::CliResult;
use async_patterns::{PatternsConfig, Scenario, Strategy};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Runs async composition strategies over a simulated data source and prints
/// the execution trace.
#[derive(Debug, Parser)]
#[command(name = "async-patterns", version, about, long_about = None)]
pub struct Cli {
    /// What to run
    #[arg(short, long, value_enum, default_value_t = StrategyArg::All)]
    pub strategy: StrategyArg,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Make the lookup of this resource fail (repeatable)
    #[arg(long = "fail", value_name = "ID")]
    pub fail: Vec<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Tasks one run may execute before it is aborted as starved
    #[arg(long, value_name = "N")]
    pub task_budget: Option<u64>,
}

/// Values accepted by `--strategy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Independent callbacks
    CallbackEach,
    /// Nested callbacks
    CallbackNested,
    /// Synchronous nested callback steps
    CallbackSum,
    /// Independent `then` continuations
    PromiseThen,
    /// `all_of` aggregation
    PromiseAll,
    /// Sequential `and_then` chain
    PromiseChain,
    /// Awaiting each lookup in turn
    SequentialAwait,
    /// Two modules sharing pending lookups
    ScenarioModuleSplit,
    /// Aggregate walked in order
    ScenarioPromiseAll,
    /// Everything above
    All,
}

/// One run requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// A composition strategy
    Strategy(Strategy),
    /// A scenario
    Scenario(Scenario),
    /// The synchronous callback sum
    CallbackSum,
}

impl StrategyArg {
    /// The runs this argument stands for, in execution order.
    pub fn selections(self) -> Vec<Selection> {
        match self {
            StrategyArg::CallbackEach => vec![Selection::Strategy(Strategy::CallbackEach)],
            StrategyArg::CallbackNested => vec![Selection::Strategy(Strategy::CallbackNested)],
            StrategyArg::CallbackSum => vec![Selection::CallbackSum],
            StrategyArg::PromiseThen => vec![Selection::Strategy(Strategy::PromiseThen)],
            StrategyArg::PromiseAll => vec![Selection::Strategy(Strategy::PromiseAll)],
            StrategyArg::PromiseChain => vec![Selection::Strategy(Strategy::PromiseChain)],
            StrategyArg::SequentialAwait => vec![Selection::Strategy(Strategy::SequentialAwait)],
            StrategyArg::ScenarioModuleSplit => vec![Selection::Scenario(Scenario::ModuleSplit)],
            StrategyArg::ScenarioPromiseAll => vec![Selection::Scenario(Scenario::PromiseAll)],
            StrategyArg::All => {
                let mut all: Vec<Selection> = Strategy::ALL.into_iter().map(Selection::Strategy).collect();
                all.insert(2, Selection::CallbackSum);
                all.extend(Scenario::ALL.into_iter().map(Selection::Scenario));
                all
            }
        }
    }
}

/// Values accepted by `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per trace entry
    Text,
    /// Reports as a JSON array
    Json,
}

impl Cli {
    /// Builds the effective configuration: the file (or the default
    /// fixture), then command-line overrides.
    pub fn load_config(&self) -> CliResult<PatternsConfig> {
        let mut config = match &self.config {
            Some(path) => PatternsConfig::load(path)?,
            None => PatternsConfig::default(),
        };
        for &id in &self.fail {
            config.set_failing(id)?;
        }
        if let Some(budget) = self.task_budget {
            config.task_budget = Some(budget);
        }
        config.validate()?;
        Ok(config)
    }
}
