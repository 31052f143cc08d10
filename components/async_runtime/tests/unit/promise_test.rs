//! Unit tests for Deferred

use async_runtime::{Deferred, DeferredState, EventLoop, Resolution};
use core_types::{AsyncError, ErrorKind};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn new_deferred_is_pending() {
    let event_loop = EventLoop::new();
    let (deferred, _resolver) = event_loop.create_deferred::<u32>();
    assert!(matches!(deferred.state(), DeferredState::Pending));
}

#[test]
fn fulfill_changes_state_to_fulfilled() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred();
    resolver.fulfill(42);
    assert_eq!(deferred.state(), DeferredState::Fulfilled(42));
}

#[test]
fn reject_changes_state_to_rejected() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred::<u32>();
    resolver.reject(AsyncError::transport("test"));
    assert_eq!(
        deferred.state(),
        DeferredState::Rejected(AsyncError::transport("test"))
    );
}

#[test]
fn cannot_fulfill_already_fulfilled_deferred() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred();
    assert!(resolver.fulfill(42));
    assert!(!resolver.fulfill(100));
    assert_eq!(deferred.value(), Some(42));
}

#[test]
fn cannot_reject_already_fulfilled_deferred() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred();
    resolver.fulfill(42);
    assert!(!resolver.reject(AsyncError::transport("late")));
    assert_eq!(deferred.value(), Some(42));
    assert_eq!(deferred.error(), None);
}

#[test]
fn cannot_fulfill_already_rejected_deferred() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred();
    resolver.reject(AsyncError::transport("first"));
    assert!(!resolver.fulfill(1u8));
    assert_eq!(deferred.error(), Some(AsyncError::transport("first")));
}

#[test]
fn cloned_resolver_shares_settle_once() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred();
    let other = resolver.clone();
    assert!(other.fulfill("a"));
    assert!(!resolver.fulfill("b"));
    assert_eq!(deferred.value(), Some("a"));
}

#[test]
fn settlement_schedules_one_microtask_per_reaction() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred::<u8>();
    let _a = deferred.then(|n| Ok(n));
    let _b = deferred.then(|n| Ok(n));
    assert_eq!(event_loop.pending_microtasks(), 0);
    resolver.fulfill(1);
    assert_eq!(event_loop.pending_microtasks(), 2);
}

#[test]
fn reactions_run_in_registration_order() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred::<u8>();
    let order = Rc::new(RefCell::new(vec![]));
    for label in ["first", "second", "third"] {
        let o = order.clone();
        deferred.then(move |_| {
            o.borrow_mut().push(label);
            Ok(())
        });
    }
    resolver.fulfill(0);
    event_loop.run().unwrap();
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn then_or_else_selects_handler_by_outcome() {
    let event_loop = EventLoop::new();
    let ok = Deferred::fulfilled(&event_loop, 2).then_or_else(|n| Ok(n * 10), |_| Ok(-1));
    let failed = Deferred::<i32>::rejected(&event_loop, AsyncError::transport("x"))
        .then_or_else(|n| Ok(n * 10), |_| Ok(-1));
    event_loop.run().unwrap();
    assert_eq!(ok.value(), Some(20));
    assert_eq!(failed.value(), Some(-1));
}

#[test]
fn continuation_error_rejects_derived_value() {
    let event_loop = EventLoop::new();
    let derived = Deferred::fulfilled(&event_loop, "{").then(|_| -> Result<u8, AsyncError> {
        Err(AsyncError::decode("unexpected end of input"))
    });
    let _observer = derived.catch(|_| Ok(0));
    event_loop.run().unwrap();
    assert_eq!(derived.error().unwrap().kind, ErrorKind::DecodeFailure);
}

#[test]
fn catch_can_rethrow() {
    let event_loop = EventLoop::new();
    let rethrown = Deferred::<u8>::rejected(&event_loop, AsyncError::transport("a"))
        .catch(|error| Err(AsyncError::internal(format!("wrapped {}", error.message))));
    event_loop.run().unwrap();
    assert_eq!(rethrown.error(), Some(AsyncError::internal("wrapped a")));
    assert_eq!(event_loop.unhandled_rejections().len(), 1);
}

#[test]
fn and_then_propagates_inner_rejection() {
    let event_loop = EventLoop::new();
    let el = event_loop.clone();
    let chained = Deferred::fulfilled(&event_loop, 1u8)
        .and_then(move |_| Deferred::<u8>::rejected(&el, AsyncError::transport("inner")));
    let caught = chained.catch(|error| {
        assert_eq!(error.message, "inner");
        Ok(0)
    });
    event_loop.run().unwrap();
    assert_eq!(caught.value(), Some(0));
}

#[test]
fn resolve_with_result_converts() {
    let event_loop = EventLoop::new();
    let (deferred, resolver) = event_loop.create_deferred::<u8>();
    assert!(resolver.resolve(Resolution::from(Ok(3))));
    assert_eq!(deferred.value(), Some(3));
}

#[test]
fn all_of_preserves_input_order() {
    let event_loop = EventLoop::new();
    let (a, ra) = event_loop.create_deferred();
    let (b, rb) = event_loop.create_deferred();
    let (c, rc) = event_loop.create_deferred();
    let all = Deferred::all_of(&event_loop, vec![a, b, c]);

    rc.fulfill("c");
    event_loop.run().unwrap();
    ra.fulfill("a");
    event_loop.run().unwrap();
    assert!(all.is_pending());
    rb.fulfill("b");
    event_loop.run().unwrap();

    assert_eq!(all.value(), Some(vec!["a", "b", "c"]));
}

#[test]
fn all_of_rejects_with_first_rejection() {
    let event_loop = EventLoop::new();
    let (a, ra) = event_loop.create_deferred::<u8>();
    let (b, rb) = event_loop.create_deferred::<u8>();
    let all = Deferred::all_of(&event_loop, vec![a, b]);

    rb.reject(AsyncError::transport("b failed"));
    ra.reject(AsyncError::transport("a failed"));
    let _observer = all.catch(|_| Ok(Vec::new()));
    event_loop.run().unwrap();

    assert_eq!(all.error(), Some(AsyncError::transport("b failed")));
}

#[test]
fn all_of_ignores_fulfilment_after_rejection() {
    let event_loop = EventLoop::new();
    let (a, ra) = event_loop.create_deferred::<u8>();
    let (b, rb) = event_loop.create_deferred::<u8>();
    let all = Deferred::all_of(&event_loop, vec![a, b]);
    let _observer = all.catch(|_| Ok(Vec::new()));

    ra.reject(AsyncError::transport("a failed"));
    event_loop.run().unwrap();
    rb.fulfill(2);
    event_loop.run().unwrap();

    assert_eq!(all.error(), Some(AsyncError::transport("a failed")));
}
