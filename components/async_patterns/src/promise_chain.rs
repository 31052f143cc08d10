//! Deferred-value chaining and aggregation.

use crate::harness::Harness;
use async_runtime::Deferred;

/// Issues every lookup with its own continuation.
///
/// The continuations run in completion order; the returned values are in
/// `ids` order.
pub fn then_each(harness: &Harness, ids: &[u32]) -> Vec<Deferred<String>> {
    ids.iter().map(|&id| harness.fetch_observed(id)).collect()
}

/// Issues every lookup and waits for all of them.
///
/// Results are observed together, in `ids` order, once the last lookup has
/// arrived. The first failure rejects the whole aggregate.
///
/// # Examples
///
/// ```
/// use async_patterns::{promise_chain, Harness, PatternsConfig};
///
/// let harness = Harness::from_config(&PatternsConfig::default());
/// let report = harness
///     .run("all", |h| Some(promise_chain::all(h, &[3, 1])))
///     .unwrap();
/// assert_eq!(report.observed_names(), vec!["speed-boost", "stench"]);
/// ```
pub fn all(harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
    let lookups = ids.iter().map(|&id| harness.fetch(id)).collect();
    let observer = harness.clone();
    let ids = ids.to_vec();
    Deferred::all_of(harness.event_loop(), lookups).then(move |names| {
        for (&id, name) in ids.iter().zip(&names) {
            observer.observe(id, name);
        }
        Ok(names)
    })
}

/// Issues each lookup only after the previous one has been observed.
pub fn chain(harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
    let Some((&first, rest)) = ids.split_first() else {
        return Deferred::fulfilled(harness.event_loop(), Vec::new());
    };
    let mut chained = harness.fetch_observed(first).then(|name| Ok(vec![name]));
    for &id in rest {
        let harness = harness.clone();
        chained = chained.and_then(move |names| {
            harness
                .fetch_observed(id)
                .then(move |name| Ok(collect_into(names, name)))
        });
    }
    chained
}

fn collect_into(mut names: Vec<String>, name: String) -> Vec<String> {
    names.push(name);
    names
}
