//! Await-style composition.

use crate::harness::Harness;
use async_runtime::Deferred;
use core_types::AsyncError;

/// Awaits each lookup before issuing the next.
///
/// A failed lookup ends the body with that lookup's error.
pub async fn fetch_in_sequence(harness: Harness, ids: Vec<u32>) -> Result<Vec<String>, AsyncError> {
    let mut names = Vec::with_capacity(ids.len());
    for id in ids {
        let name = harness.fetch(id).await?;
        harness.observe(id, &name);
        names.push(name);
    }
    Ok(names)
}

/// Spawns [`fetch_in_sequence`] on the harness's event loop.
///
/// The first lookup is issued before this returns; the result settles only
/// once the last lookup has been observed.
///
/// # Examples
///
/// ```
/// use async_patterns::{sequential, Harness, PatternsConfig};
///
/// let harness = Harness::from_config(&PatternsConfig::default());
/// let report = harness
///     .run("await", |h| Some(sequential::sequential(h, &[1, 2])))
///     .unwrap();
/// assert_eq!(report.finished_at.as_millis(), 350);
/// ```
pub fn sequential(harness: &Harness, ids: &[u32]) -> Deferred<Vec<String>> {
    harness
        .event_loop()
        .spawn_local(fetch_in_sequence(harness.clone(), ids.to_vec()))
}
