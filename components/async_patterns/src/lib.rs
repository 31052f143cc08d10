//! Three control-flow styles over one deterministic event loop.
//!
//! The same three lookups against an [`AsyncDataSource`] are composed with
//! callbacks, with deferred-value chaining and aggregation, and with
//! await-style sequencing. A [`Harness`] records what each style does in an
//! execution trace so their ordering can be compared.
//!
//! # Overview
//!
//! - [`callback`] - Callback-passing, independent and nested
//! - [`promise_chain`] - Independent `then`, `all_of` aggregation, sequential chaining
//! - [`sequential`] - `async` body awaiting each lookup in turn
//! - [`Strategy`] - Uniform entry point over all of the above
//! - [`scenario`] - Longer walkthroughs mixing timers and lookups
//! - [`SimulatedSource`] - Latency-simulating data source
//! - [`PatternsConfig`] - Resource fixtures and loop tunables
//!
//! # Examples
//!
//! ```
//! use async_patterns::{Harness, PatternsConfig, Strategy};
//!
//! let config = PatternsConfig::default();
//! let harness = Harness::from_config(&config);
//! let report = harness.run_strategy(Strategy::PromiseAll, &config.ids()).unwrap();
//!
//! assert_eq!(
//!     report.names(),
//!     Some(&["stench".to_string(), "drizzle".to_string(), "speed-boost".to_string()][..])
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod callback;
pub mod config;
pub mod data_source;
pub mod harness;
pub mod promise_chain;
pub mod scenario;
pub mod sequential;
pub mod strategy;
#[cfg(feature = "test-utils")]
pub mod testing;

pub use config::{ConfigError, PatternsConfig};
pub use data_source::{AsyncDataSource, Resource, ResourceSpec, Response, SimulatedSource};
pub use harness::{issued_label, observed_label, Harness, Outcome, RunReport, END_OF_SYNC_PHASE};
pub use scenario::Scenario;
pub use strategy::Strategy;
