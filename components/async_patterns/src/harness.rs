//! Drives one composition on a fresh synchronous phase and records what happens.

use crate::config::PatternsConfig;
use crate::data_source::{AsyncDataSource, SimulatedSource};
use crate::scenario::Scenario;
use crate::strategy::Strategy;
use async_runtime::{Deferred, DeferredId, DeferredState, EventLoop, RunStats};
use core_types::{AsyncError, ExecutionTrace, LogicalTime, TraceEntry, VirtualClock};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Label recorded once the initiating call has returned to the harness.
pub const END_OF_SYNC_PHASE: &str = "end of synchronous phase";

/// Label recorded immediately before a lookup for `id` is issued.
pub fn issued_label(id: u32) -> String {
    format!("fetch-issued:{id}")
}

/// Label recorded when the result of the lookup for `id` is consumed.
pub fn observed_label(id: u32) -> String {
    format!("result-observed:{id}")
}

/// How the composition's own deferred value ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// Every lookup succeeded
    Fulfilled {
        /// Names in the order the composition delivered them
        names: Vec<String>,
    },
    /// The composition failed
    Rejected {
        /// The first failure it surfaced
        error: AsyncError,
    },
    /// The loop drained without the composition settling
    Pending,
    /// The composition did not hand back a deferred value
    Detached,
}

/// Everything observed during one [`Harness::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Name passed to `run`
    pub name: String,
    /// Trace entries recorded during this run
    pub entries: Vec<TraceEntry>,
    /// Loop counters
    pub stats: RunStats,
    /// Final state of the composition
    pub outcome: Outcome,
    /// Rejections nothing observed
    pub unhandled: Vec<AsyncError>,
    /// Logical time when the loop went idle
    pub finished_at: LogicalTime,
}

impl RunReport {
    /// Names delivered by the composition, if it fulfilled.
    pub fn names(&self) -> Option<&[String]> {
        match &self.outcome {
            Outcome::Fulfilled { names } => Some(names),
            _ => None,
        }
    }

    /// Ordinal of the first entry with `label`.
    pub fn ordinal_of(&self, label: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.ordinal)
    }

    /// Labels in recording order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.label.as_str()).collect()
    }

    /// Payloads of the `result-observed` entries, in recording order.
    pub fn observed_names(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|entry| entry.label.starts_with("result-observed:"))
            .filter_map(|entry| entry.payload.as_deref())
            .collect()
    }
}

/// Ties an event loop, a data source and an execution trace together.
///
/// Strategies issue lookups through [`fetch`](Harness::fetch) and report
/// consumed results through [`observe`](Harness::observe), so every style
/// leaves the same kind of trace behind.
#[derive(Clone)]
pub struct Harness {
    event_loop: EventLoop,
    trace: ExecutionTrace,
    source: Rc<dyn AsyncDataSource>,
}

impl Harness {
    /// Creates a harness recording against `event_loop`'s clock.
    pub fn new(event_loop: EventLoop, source: impl AsyncDataSource + 'static) -> Self {
        let trace = ExecutionTrace::new(event_loop.clock());
        Self {
            event_loop,
            trace,
            source: Rc::new(source),
        }
    }

    /// Creates a fresh loop and simulated source from `config`.
    pub fn from_config(config: &PatternsConfig) -> Self {
        let event_loop =
            EventLoop::with_config(Rc::new(VirtualClock::new()), config.scheduler_config());
        let source = SimulatedSource::new(&event_loop, config.resources.iter().cloned());
        Self::new(event_loop, source)
    }

    /// The loop every composition runs on.
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// The trace shared by every run of this harness.
    pub fn trace(&self) -> &ExecutionTrace {
        &self.trace
    }

    /// The data source lookups go to.
    pub fn source(&self) -> &dyn AsyncDataSource {
        self.source.as_ref()
    }

    /// Records `fetch-issued:<id>` and starts the lookup.
    pub fn fetch(&self, id: u32) -> Deferred<String> {
        self.trace.record(issued_label(id));
        self.source.fetch_named(id)
    }

    /// Starts a lookup whose result is recorded as observed when it arrives.
    pub fn fetch_observed(&self, id: u32) -> Deferred<String> {
        let harness = self.clone();
        self.fetch(id).then(move |name| {
            harness.observe(id, &name);
            Ok(name)
        })
    }

    /// Records `result-observed:<id>` with the name as payload.
    pub fn observe(&self, id: u32, name: &str) {
        self.trace.record_with(observed_label(id), name);
    }

    /// Records a free-form entry.
    pub fn log(&self, label: impl Into<String>) -> u64 {
        self.trace.record(label)
    }

    /// Runs `body` as the synchronous phase, then drives the loop until idle.
    ///
    /// The report only covers this run: trace entries recorded and
    /// rejections left unhandled since `body` started. Local tasks still
    /// suspended once the loop is idle are released, and their
    /// compositions are reported as [`Outcome::Pending`].
    ///
    /// # Errors
    ///
    /// Fails only if the loop itself fails; a rejected composition is
    /// reported through [`RunReport::outcome`].
    pub fn run<F>(&self, name: &str, body: F) -> Result<RunReport, AsyncError>
    where
        F: FnOnce(&Harness) -> Option<Deferred<Vec<String>>>,
    {
        let first = self.trace.len();
        let earlier: HashSet<DeferredId> = self
            .event_loop
            .unhandled_rejections()
            .into_iter()
            .map(|rejection| rejection.deferred)
            .collect();
        tracing::info!(run = name, at = %self.event_loop.now(), "starting run");
        self.trace.record(format!("begin {name}"));
        let composition = body(self);
        self.trace.record(END_OF_SYNC_PHASE);

        if let Some(composition) = &composition {
            let trace = self.trace.clone();
            let _observed = composition.catch(move |error| {
                trace.record_with("composition-rejected", error.to_string());
                Ok(Vec::new())
            });
        }

        let stats = match self.event_loop.run() {
            Ok(stats) => stats,
            Err(error) => {
                tracing::warn!(run = name, %error, "event loop failed");
                return Err(error);
            }
        };

        let outcome = match composition.map(|deferred| deferred.state()) {
            None => Outcome::Detached,
            Some(DeferredState::Pending) => Outcome::Pending,
            Some(DeferredState::Fulfilled(names)) => Outcome::Fulfilled { names },
            Some(DeferredState::Rejected(error)) => Outcome::Rejected { error },
        };
        let unhandled: Vec<AsyncError> = self
            .event_loop
            .unhandled_rejections()
            .into_iter()
            .filter(|rejection| !earlier.contains(&rejection.deferred))
            .map(|rejection| rejection.error)
            .collect();
        // Nothing outside this harness can wake a task once the loop is idle.
        let released = self.event_loop.release_suspended();
        let entries = self.trace.entries().split_off(first);
        tracing::info!(
            run = name,
            tasks = stats.tasks(),
            entries = entries.len(),
            unhandled = unhandled.len(),
            released,
            "run finished"
        );

        Ok(RunReport {
            name: name.to_string(),
            entries,
            stats,
            outcome,
            unhandled,
            finished_at: self.event_loop.now(),
        })
    }

    /// Runs `strategy` over `ids`.
    pub fn run_strategy(&self, strategy: Strategy, ids: &[u32]) -> Result<RunReport, AsyncError> {
        self.run(strategy.name(), |harness| Some(strategy.launch(harness, ids)))
    }

    /// Runs `scenario` over `ids`.
    pub fn run_scenario(&self, scenario: Scenario, ids: &[u32]) -> Result<RunReport, AsyncError> {
        self.run(scenario.name(), |harness| scenario.launch(harness, ids))
    }
}

impl fmt::Debug for Harness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("event_loop", &self.event_loop)
            .field("entries", &self.trace.len())
            .finish_non_exhaustive()
    }
}
