//! Callback-passing composition.
//!
//! The callback only ever sees successful names. A failed lookup never
//! invokes it, so its rejection stays unobserved and shows up in
//! [`EventLoop::unhandled_rejections`](async_runtime::EventLoop::unhandled_rejections).

use crate::data_source::AsyncDataSource;
use crate::harness::{issued_label, Harness};
use core_types::ExecutionTrace;
use std::cell::Cell;
use std::collections::VecDeque;

/// Looks up `id` and hands the name to `callback` once it arrives.
pub fn fetch_with_callback<F>(source: &dyn AsyncDataSource, id: u32, callback: F)
where
    F: FnOnce(String) + 'static,
{
    let _delivery = source.fetch_named(id).then(move |name| {
        callback(name);
        Ok(())
    });
}

/// Issues every lookup at once. `on_name` runs in completion order.
pub fn fetch_each<F>(harness: &Harness, ids: &[u32], on_name: F)
where
    F: Fn(u32, String) + Clone + 'static,
{
    for &id in ids {
        harness.log(issued_label(id));
        let observer = harness.clone();
        let on_name = on_name.clone();
        fetch_with_callback(harness.source(), id, move |name| {
            observer.observe(id, &name);
            on_name(id, name);
        });
    }
}

/// Issues each lookup from inside the previous one's callback.
///
/// `on_done` receives every name in `ids` order after the last lookup. If a
/// lookup fails the chain stops there and `on_done` is never called.
pub fn fetch_nested<F>(harness: &Harness, ids: &[u32], on_done: F)
where
    F: FnOnce(Vec<String>) + 'static,
{
    step(
        harness.clone(),
        ids.iter().copied().collect(),
        Vec::with_capacity(ids.len()),
        on_done,
    );
}

fn step<F>(harness: Harness, mut remaining: VecDeque<u32>, mut names: Vec<String>, on_done: F)
where
    F: FnOnce(Vec<String>) + 'static,
{
    let Some(id) = remaining.pop_front() else {
        on_done(names);
        return;
    };
    harness.log(issued_label(id));
    let next = harness.clone();
    fetch_with_callback(harness.source(), id, move |name| {
        next.observe(id, &name);
        names.push(name);
        step(next, remaining, names, on_done);
    });
}

fn do_step<F>(init: i64, increment: i64, callback: F)
where
    F: FnOnce(i64),
{
    callback(init + increment);
}

/// Runs three nested callback steps (+1, +2, +3) and sums the intermediate
/// results.
///
/// Nothing here is asynchronous: the sum, 10, is complete when this returns.
/// Each step and the sum are recorded in `trace`.
pub fn sum_steps(trace: &ExecutionTrace) -> i64 {
    let sum = Cell::new(0);
    do_step(0, 1, |first| {
        sum.set(sum.get() + first);
        trace.record_with("step", first.to_string());
        do_step(first, 2, |second| {
            sum.set(sum.get() + second);
            trace.record_with("step", second.to_string());
            do_step(second, 3, |third| {
                sum.set(sum.get() + third);
                trace.record_with("step", third.to_string());
            });
        });
    });
    trace.record_with("step-sum", sum.get().to_string());
    sum.get()
}
