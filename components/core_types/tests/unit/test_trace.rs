//! Unit tests for ExecutionTrace

use core_types::{Clock, ExecutionTrace, LogicalTime, VirtualClock};
use std::rc::Rc;

#[test]
fn test_clones_share_one_log() {
    let trace = ExecutionTrace::new(Rc::new(VirtualClock::new()));
    let other = trace.clone();
    trace.record("first");
    other.record("second");
    assert_eq!(trace.labels(), vec!["first", "second"]);
    assert_eq!(other.len(), 2);
}

#[test]
fn test_entries_is_a_snapshot() {
    let trace = ExecutionTrace::new(Rc::new(VirtualClock::new()));
    trace.record("before");
    let snapshot = trace.entries();
    trace.record("after");
    assert_eq!(snapshot.len(), 1);
    assert_eq!(trace.len(), 2);
}

#[test]
fn test_entry_time_follows_shared_clock() {
    let clock = VirtualClock::new();
    let trace = ExecutionTrace::new(Rc::new(clock.clone()));
    clock.advance_to(LogicalTime::from_millis(500));
    trace.record("late");
    assert_eq!(trace.entries()[0].at.as_millis(), 500);
}

#[test]
fn test_entry_serializes_without_empty_payload() {
    let trace = ExecutionTrace::new(Rc::new(VirtualClock::new()));
    trace.record("end of synchronous phase");
    let json = serde_json::to_value(&trace.entries()[0]).unwrap();
    assert_eq!(json["ordinal"], 0);
    assert_eq!(json["at"], 0);
    assert_eq!(json["label"], "end of synchronous phase");
    assert!(json.get("payload").is_none());
}
