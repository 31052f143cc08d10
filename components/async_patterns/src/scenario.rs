//! Walkthroughs that interleave lookups with plain timers and synchronous
//! "module" code.

use crate::harness::Harness;
use async_runtime::Deferred;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delays of the reference timers armed by [`module_split`].
pub const REFERENCE_TIMERS_MS: [u64; 3] = [500, 250, 100];

/// A walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// See [`module_split`]
    ModuleSplit,
    /// See [`promise_all_for_each`]
    PromiseAll,
}

impl Scenario {
    /// Every scenario.
    pub const ALL: [Scenario; 2] = [Scenario::ModuleSplit, Scenario::PromiseAll];

    /// Stable name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Scenario::ModuleSplit => "scenario-module-split",
            Scenario::PromiseAll => "scenario-promise-all",
        }
    }

    /// Runs the synchronous part of the scenario.
    ///
    /// The module split hands nothing back: nothing ever waits on it.
    pub fn launch(self, harness: &Harness, ids: &[u32]) -> Option<Deferred<Vec<String>>> {
        match self {
            Scenario::ModuleSplit => {
                let _observed = module_split(harness, ids);
                None
            }
            Scenario::PromiseAll => Some(promise_all_for_each(harness, ids)),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Two synchronous modules sharing pending lookups, with no awaiting.
///
/// Module one arms the reference timers and issues the lookups; module two
/// attaches a continuation to each. Both finish before any timer or
/// continuation runs.
pub fn module_split(harness: &Harness, ids: &[u32]) -> Vec<Deferred<String>> {
    let lookups = module_one(harness, ids);
    module_two(harness, ids, lookups)
}

fn module_one(harness: &Harness, ids: &[u32]) -> Vec<Deferred<String>> {
    harness.log("module one: start");
    for delay in REFERENCE_TIMERS_MS {
        let timer = harness.clone();
        harness.event_loop().schedule_timer(delay, move || {
            timer.log(format!("reference timer {delay}ms"));
            Ok(())
        });
    }
    let lookups = ids.iter().map(|&id| harness.fetch(id)).collect();
    harness.log("module one: end");
    lookups
}

fn module_two(harness: &Harness, ids: &[u32], lookups: Vec<Deferred<String>>) -> Vec<Deferred<String>> {
    harness.log("module two: start");
    let observed = ids
        .iter()
        .zip(lookups)
        .map(|(&id, lookup)| {
            let observer = harness.clone();
            lookup.then(move |name| {
                observer.observe(id, &name);
                Ok(name)
            })
        })
        .collect();
    harness.log("module two: end");
    observed
}

/// A synchronous function returning an aggregate; the caller walks the
/// values in order once it fulfils.
pub fn promise_all_for_each(harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
    let observer = harness.clone();
    let ids = ids.to_vec();
    gather(harness, &ids).then(move |names| {
        for (&id, name) in ids.iter().zip(&names) {
            observer.observe(id, name);
        }
        Ok(names)
    })
}

fn gather(harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
    harness.log("gather: start");
    let lookups = ids.iter().map(|&id| harness.fetch(id)).collect();
    let all = Deferred::all_of(harness.event_loop(), lookups);
    harness.log("gather: end");
    all
}
