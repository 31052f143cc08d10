//! One entry point over every composition style.

use crate::harness::Harness;
use crate::{callback, promise_chain, sequential};
use async_runtime::Deferred;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A way of composing the lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Independent callbacks, one per lookup
    CallbackEach,
    /// Each lookup issued from the previous callback
    CallbackNested,
    /// Independent `then` continuations
    PromiseThen,
    /// Aggregated with `all_of`
    PromiseAll,
    /// Sequential `and_then` chain
    PromiseChain,
    /// `async` body awaiting each lookup
    SequentialAwait,
}

impl Strategy {
    /// Every strategy, in presentation order.
    pub const ALL: [Strategy; 6] = [
        Strategy::CallbackEach,
        Strategy::CallbackNested,
        Strategy::PromiseThen,
        Strategy::PromiseAll,
        Strategy::PromiseChain,
        Strategy::SequentialAwait,
    ];

    /// Stable name, as accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Strategy::CallbackEach => "callback-each",
            Strategy::CallbackNested => "callback-nested",
            Strategy::PromiseThen => "promise-then",
            Strategy::PromiseAll => "promise-all",
            Strategy::PromiseChain => "promise-chain",
            Strategy::SequentialAwait => "sequential-await",
        }
    }

    /// Returns true if each lookup waits for the previous result.
    pub fn is_sequential(self) -> bool {
        matches!(
            self,
            Strategy::CallbackNested | Strategy::PromiseChain | Strategy::SequentialAwait
        )
    }

    /// Starts the composition and returns a deferred value for its names.
    ///
    /// Callback styles report names as they arrive; here they are collected
    /// into a deferred value that stays pending if any lookup fails.
    pub fn launch(self, harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
        tracing::debug!(strategy = self.name(), ?ids, "launching");
        match self {
            Strategy::CallbackEach => {
                let (collected, resolver) = harness.event_loop().create_deferred();
                let expected = ids.len();
                if expected == 0 {
                    resolver.fulfill(Vec::new());
                }
                let names = Rc::new(RefCell::new(Vec::with_capacity(expected)));
                callback::fetch_each(harness, ids, move |_, name| {
                    let mut names = names.borrow_mut();
                    names.push(name);
                    if names.len() == expected {
                        resolver.fulfill(names.to_vec());
                    }
                });
                collected
            }
            Strategy::CallbackNested => {
                let (collected, resolver) = harness.event_loop().create_deferred();
                callback::fetch_nested(harness, ids, move |names| {
                    resolver.fulfill(names);
                });
                collected
            }
            Strategy::PromiseThen => {
                let each = promise_chain::then_each(harness, ids);
                Deferred::all_of(harness.event_loop(), each)
            }
            Strategy::PromiseAll => promise_chain::all(harness, ids),
            Strategy::PromiseChain => promise_chain::chain(harness, ids),
            Strategy::SequentialAwait => sequential::sequential(harness, ids),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
