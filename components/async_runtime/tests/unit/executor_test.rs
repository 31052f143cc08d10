//! Unit tests for local task execution

use async_runtime::{Deferred, EventLoop};
use core_types::{AsyncError, ErrorKind};
use std::cell::RefCell;
use std::rc::Rc;

fn delayed<T: Clone + 'static>(event_loop: &EventLoop, delay_ms: u64, value: T) -> Deferred<T> {
    let (deferred, resolver) = event_loop.create_deferred();
    event_loop.schedule_timer(delay_ms, move || {
        resolver.fulfill(value);
        Ok(())
    });
    deferred
}

#[test]
fn awaits_run_strictly_in_sequence() {
    let event_loop = EventLoop::new();
    let log = Rc::new(RefCell::new(vec![]));

    let el = event_loop.clone();
    let l = log.clone();
    let done = event_loop.spawn_local(async move {
        for (delay, value) in [(30u64, 1u32), (10, 2), (20, 3)] {
            l.borrow_mut().push(format!("issue {value} at {}", el.now()));
            let got = delayed(&el, delay, value).await?;
            l.borrow_mut().push(format!("got {got} at {}", el.now()));
        }
        Ok(())
    });

    event_loop.run().unwrap();
    assert_eq!(done.value(), Some(()));
    assert_eq!(
        *log.borrow(),
        vec![
            "issue 1 at 0ms",
            "got 1 at 30ms",
            "issue 2 at 30ms",
            "got 2 at 40ms",
            "issue 3 at 40ms",
            "got 3 at 60ms",
        ]
    );
}

#[test]
fn spawned_deferred_can_be_chained() {
    let event_loop = EventLoop::new();
    let el = event_loop.clone();
    let doubled = event_loop
        .spawn_local(async move { delayed(&el, 5, 21u32).await })
        .then(|n| Ok(n * 2));
    event_loop.run().unwrap();
    assert_eq!(doubled.value(), Some(42));
}

#[test]
fn nested_spawn_awaits_inner_task() {
    let event_loop = EventLoop::new();
    let el = event_loop.clone();
    let outer = event_loop.spawn_local(async move {
        let inner_el = el.clone();
        let inner = el.spawn_local(async move {
            let a = delayed(&inner_el, 10, 1u32).await?;
            let b = delayed(&inner_el, 10, 2u32).await?;
            Ok(a + b)
        });
        let sum = inner.await?;
        Ok(sum * 100)
    });
    event_loop.run().unwrap();
    assert_eq!(outer.value(), Some(300));
    assert_eq!(event_loop.suspended_tasks(), 0);
}

#[test]
fn error_can_be_handled_inside_body() {
    let event_loop = EventLoop::new();
    let el = event_loop.clone();
    let out = event_loop.spawn_local(async move {
        let failing = Deferred::<u8>::rejected(&el, AsyncError::transport("gone"));
        match failing.await {
            Ok(value) => Ok(value),
            Err(error) if error.kind == ErrorKind::TransportFailure => Ok(0),
            Err(error) => Err(error),
        }
    });
    event_loop.run().unwrap();
    assert_eq!(out.value(), Some(0));
    assert!(event_loop.unhandled_rejections().is_empty());
}

#[test]
fn pending_forever_leaves_task_suspended() {
    let event_loop = EventLoop::new();
    let (never, _resolver) = event_loop.create_deferred::<u8>();
    let out = event_loop.spawn_local(async move { never.await });
    event_loop.run().unwrap();
    assert!(out.is_pending());
    assert_eq!(event_loop.suspended_tasks(), 1);
}

#[test]
fn release_suspended_drops_stranded_tasks() {
    let event_loop = EventLoop::new();
    let (never, _resolver) = event_loop.create_deferred::<u8>();
    let captured = event_loop.clone();
    let marker = Rc::new(());
    let held = Rc::clone(&marker);
    let out = event_loop.spawn_local(async move {
        let value = never.await?;
        captured.schedule_microtask(move || {
            drop(held);
            Ok(())
        });
        Ok(value)
    });
    event_loop.run().unwrap();
    assert_eq!(Rc::strong_count(&marker), 2);

    assert_eq!(event_loop.release_suspended(), 1);
    assert_eq!(event_loop.suspended_tasks(), 0);
    assert_eq!(Rc::strong_count(&marker), 1);
    assert!(out.is_pending());
    assert_eq!(event_loop.release_suspended(), 0);
}
