//! Command-line harness for the async composition walkthroughs.
//!
//! Parses arguments, builds a [`PatternsConfig`](async_patterns::PatternsConfig)
//! and hands the selected runs to a [`Runner`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod error;
pub mod runtime;

pub use cli::{Cli, OutputFormat, Selection, StrategyArg};
pub use error::{CliError, CliResult};
pub use runtime::Runner;
