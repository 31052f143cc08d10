//! Contract tests for async_runtime
//!
//! These tests pin down the ordering contract the composition strategies rely
//! on, observed through an ExecutionTrace.

use async_runtime::{Deferred, EventLoop};
use core_types::{AsyncError, ExecutionTrace};
use proptest::prelude::*;

fn setup() -> (EventLoop, ExecutionTrace) {
    let event_loop = EventLoop::new();
    let trace = ExecutionTrace::new(event_loop.clock());
    (event_loop, trace)
}

mod ordering_contract {
    use super::*;

    #[test]
    fn synchronous_code_precedes_every_task() {
        let (event_loop, trace) = setup();

        let t = trace.clone();
        event_loop.schedule_timer(0, move || {
            t.record("timer");
            Ok(())
        });
        let t = trace.clone();
        Deferred::fulfilled(&event_loop, ()).then(move |()| {
            t.record("continuation");
            Ok(())
        });
        trace.record("end of synchronous phase");

        event_loop.run().unwrap();
        assert_eq!(
            trace.labels(),
            vec!["end of synchronous phase", "continuation", "timer"]
        );
    }

    #[test]
    fn microtasks_scheduled_before_a_timer_run_before_it() {
        let (event_loop, trace) = setup();
        let (deferred, resolver) = event_loop.create_deferred::<u8>();

        let t = trace.clone();
        deferred.then(move |_| {
            t.record("continuation");
            Ok(())
        });
        let t = trace.clone();
        event_loop.schedule_timer(0, move || {
            t.record("timer");
            Ok(())
        });
        let t = trace.clone();
        event_loop.schedule_timer(0, move || {
            t.record("second timer");
            Ok(())
        });
        resolver.fulfill(1);

        event_loop.run().unwrap();
        assert_eq!(trace.labels(), vec!["continuation", "timer", "second timer"]);
    }

    #[test]
    fn fifo_continuations_across_independent_values() {
        let (event_loop, trace) = setup();
        let (a, ra) = event_loop.create_deferred::<&str>();
        let (b, rb) = event_loop.create_deferred::<&str>();
        let (c, rc) = event_loop.create_deferred::<&str>();

        for deferred in [&a, &b, &c] {
            let t = trace.clone();
            deferred.then(move |label| {
                t.record(label);
                Ok(())
            });
        }
        ra.fulfill("A");
        rb.fulfill("B");
        rc.fulfill("C");

        event_loop.run().unwrap();
        let a = trace.ordinal_of("A").unwrap();
        let b = trace.ordinal_of("B").unwrap();
        let c = trace.ordinal_of("C").unwrap();
        assert!(a < b && b < c);
    }
}

mod settle_once_contract {
    use super::*;

    #[test]
    fn then_after_settlement_defers_to_fresh_microtask() {
        let (event_loop, trace) = setup();
        let deferred = Deferred::fulfilled(&event_loop, "late registration");

        let t = trace.clone();
        deferred.then(move |label| {
            t.record(label);
            Ok(())
        });
        trace.record("after then() returned");

        event_loop.run().unwrap();
        assert!(
            trace.ordinal_of("after then() returned").unwrap()
                < trace.ordinal_of("late registration").unwrap()
        );
    }

    #[test]
    fn repeated_settlement_runs_reactions_once() {
        let (event_loop, trace) = setup();
        let (deferred, resolver) = event_loop.create_deferred::<u8>();
        let t = trace.clone();
        deferred.then(move |n| {
            t.record_with("fulfilled", n.to_string());
            Ok(())
        });

        resolver.fulfill(1);
        resolver.fulfill(2);
        resolver.reject(AsyncError::transport("ignored"));

        event_loop.run().unwrap();
        assert_eq!(trace.payloads_with_prefix("fulfilled"), vec!["1"]);
        assert!(event_loop.unhandled_rejections().is_empty());
    }
}

mod all_of_contract {
    use super::*;

    #[test]
    fn fail_fast_rejection_precedes_later_settlements() {
        let (event_loop, trace) = setup();
        let mut inputs = Vec::new();
        for (index, delay) in [(1u64, 300u64), (2, 100), (3, 200)] {
            let (deferred, resolver) = event_loop.create_deferred::<String>();
            let t = trace.clone();
            event_loop.schedule_timer(delay, move || {
                if index == 2 {
                    t.record("input 2 rejected");
                    resolver.reject(AsyncError::transport("input 2 failed"));
                } else {
                    t.record(format!("input {index} fulfilled"));
                    resolver.fulfill(format!("value {index}"));
                }
                Ok(())
            });
            inputs.push(deferred);
        }

        let all = Deferred::all_of(&event_loop, inputs);
        let t = trace.clone();
        let observed = all.then_or_else(
            |_| Ok(()),
            move |error| {
                t.record_with("aggregate rejected", error.message);
                Ok(())
            },
        );

        event_loop.run().unwrap();
        assert_eq!(all.error(), Some(AsyncError::transport("input 2 failed")));
        assert_eq!(observed.value(), Some(()));

        let rejected = trace.ordinal_of("aggregate rejected").unwrap();
        assert!(rejected < trace.ordinal_of("input 1 fulfilled").unwrap());
        assert!(rejected < trace.ordinal_of("input 3 fulfilled").unwrap());
    }
}

proptest! {
    #[test]
    fn all_of_always_yields_input_order(delays in proptest::collection::vec(0u64..1_000, 1..12)) {
        let (event_loop, _trace) = setup();
        let inputs: Vec<Deferred<usize>> = delays
            .iter()
            .enumerate()
            .map(|(index, delay)| {
                let (deferred, resolver) = event_loop.create_deferred();
                event_loop.schedule_timer(*delay, move || {
                    resolver.fulfill(index);
                    Ok(())
                });
                deferred
            })
            .collect();

        let all = Deferred::all_of(&event_loop, inputs);
        event_loop.run().unwrap();

        let expected: Vec<usize> = (0..delays.len()).collect();
        prop_assert_eq!(all.value(), Some(expected));
        prop_assert_eq!(event_loop.now().as_millis(), *delays.iter().max().unwrap());
    }

    #[test]
    fn continuations_follow_timer_order(delays in proptest::collection::vec(0u64..500, 1..10)) {
        let (event_loop, trace) = setup();
        for (index, delay) in delays.iter().enumerate() {
            let (deferred, resolver) = event_loop.create_deferred::<usize>();
            let t = trace.clone();
            deferred.then(move |i| {
                t.record_with("settled", i.to_string());
                Ok(())
            });
            event_loop.schedule_timer(*delay, move || {
                resolver.fulfill(index);
                Ok(())
            });
        }
        event_loop.run().unwrap();

        let mut expected: Vec<(u64, usize)> =
            delays.iter().copied().enumerate().map(|(i, d)| (d, i)).collect();
        expected.sort();
        let expected: Vec<String> = expected.into_iter().map(|(_, i)| i.to_string()).collect();
        prop_assert_eq!(trace.payloads_with_prefix("settled"), expected);
    }
}
