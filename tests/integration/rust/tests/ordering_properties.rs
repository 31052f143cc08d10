//! Ordering properties of the event loop, observed through a shared trace.

use async_runtime::{Deferred, EventLoop, SchedulerConfig};
use core_types::{AsyncError, ErrorKind, ExecutionTrace, VirtualClock};
use proptest::prelude::*;
use std::rc::Rc;

fn setup() -> (EventLoop, ExecutionTrace) {
    let event_loop = EventLoop::new();
    let trace = ExecutionTrace::new(event_loop.clock());
    (event_loop, trace)
}

/// Then-after-settlement still waits for a fresh microtask.
#[test]
fn late_continuation_is_deferred() {
    let (event_loop, trace) = setup();
    let (value, resolver) = Deferred::pending(&event_loop);
    assert!(resolver.fulfill(1));
    assert!(!resolver.fulfill(2));

    let t = trace.clone();
    value.then(move |v: i32| {
        t.record_with("continuation", v.to_string());
        Ok(())
    });
    trace.record("after then");

    event_loop.run().unwrap();
    assert_eq!(trace.labels(), vec!["after then", "continuation"]);
    assert_eq!(trace.payloads_with_prefix("continuation"), vec!["1"]);
}

/// Three deferred values resolved in the order A, B, C continue in that order.
#[test]
fn microtasks_are_fifo() {
    let (event_loop, trace) = setup();
    let mut resolvers = Vec::new();
    for label in ["A", "B", "C"] {
        let (value, resolver) = Deferred::<()>::pending(&event_loop);
        let t = trace.clone();
        value.then(move |()| {
            t.record(label);
            Ok(())
        });
        resolvers.push(resolver);
    }
    for resolver in &resolvers {
        resolver.fulfill(());
    }
    event_loop.run().unwrap();
    assert!(trace.ordinal_of("A") < trace.ordinal_of("B"));
    assert!(trace.ordinal_of("B") < trace.ordinal_of("C"));
}

/// Input 2 fails before inputs 1 and 3 settle: the aggregate fails first.
#[test]
fn all_of_fails_fast() {
    let (event_loop, trace) = setup();
    let inputs: Vec<Deferred<u32>> = [(1, 300), (2, 100), (3, 200)]
        .into_iter()
        .map(|(id, delay)| {
            let (value, resolver) = Deferred::pending(&event_loop);
            let t = trace.clone();
            event_loop.schedule_timer(delay, move || {
                if id == 2 {
                    resolver.reject(AsyncError::transport("input 2"));
                } else {
                    resolver.fulfill(id);
                }
                t.record(format!("settled:{id}"));
                Ok(())
            });
            value
        })
        .collect();

    let t = trace.clone();
    let all = Deferred::all_of(&event_loop, inputs).catch(move |error| {
        t.record_with("aggregate-rejected", error.message.clone());
        Err(error)
    });
    let _handled = all.catch(|_| Ok(Vec::new()));

    event_loop.run().unwrap();
    let rejected = trace.ordinal_of("aggregate-rejected").unwrap();
    assert!(rejected < trace.ordinal_of("settled:1").unwrap());
    assert!(rejected < trace.ordinal_of("settled:3").unwrap());
    assert_eq!(all.error(), Some(AsyncError::transport("input 2")));
    assert_eq!(trace.payloads_with_prefix("aggregate"), vec!["input 2"]);
}

#[test]
fn clock_jumps_to_each_timer() {
    let (event_loop, trace) = setup();
    for delay in [250, 100, 500] {
        let t = trace.clone();
        event_loop.schedule_timer(delay, move || {
            t.record(format!("timer {delay}"));
            Ok(())
        });
    }
    event_loop.run().unwrap();
    let at: Vec<u64> = trace.entries().iter().map(|entry| entry.at.as_millis()).collect();
    assert_eq!(at, vec![100, 250, 500]);
}

#[test]
fn self_rescheduling_microtask_starves() {
    fn again(event_loop: EventLoop) {
        let next = event_loop.clone();
        event_loop.schedule_microtask(move || {
            again(next);
            Ok(())
        });
    }

    let config = SchedulerConfig { task_budget: Some(1_000) };
    let event_loop = EventLoop::with_config(Rc::new(VirtualClock::new()), config);
    event_loop.schedule_timer(0, || Ok(()));
    again(event_loop.clone());

    let err = event_loop.run().unwrap_err();
    assert_eq!(err.kind, ErrorKind::StarvationFault);
    assert_eq!(event_loop.pending_timers(), 1);
}

#[test]
fn unhandled_rejection_is_not_fatal() {
    let (event_loop, _) = setup();
    let _ignored = Deferred::<u8>::rejected(&event_loop, AsyncError::decode("bad body"));
    let stats = event_loop.run().unwrap();
    assert_eq!(stats.tasks(), 0);
    assert_eq!(event_loop.unhandled_rejections().len(), 1);
}

proptest! {
    /// Timers run in (delay, scheduling order) order whatever the delays.
    #[test]
    fn timers_run_in_delay_then_insertion_order(delays in prop::collection::vec(0u64..50, 1..20)) {
        let (event_loop, trace) = setup();
        for (index, delay) in delays.iter().copied().enumerate() {
            let t = trace.clone();
            event_loop.schedule_timer(delay, move || {
                t.record(index.to_string());
                Ok(())
            });
        }
        event_loop.run().unwrap();

        let mut expected: Vec<(u64, usize)> = delays.iter().copied().zip(0..).collect();
        expected.sort();
        let expected: Vec<String> = expected.into_iter().map(|(_, index)| index.to_string()).collect();
        prop_assert_eq!(trace.labels(), expected);
    }
}
