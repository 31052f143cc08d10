//! Execution trace used to verify ordering.
//!
//! The trace is an append-only log. Every entry receives an ordinal that is
//! strictly greater than the ordinal of every earlier entry, which is what
//! ordering assertions compare.

use crate::time::{Clock, LogicalTime};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// One recorded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceEntry {
    /// Position in the trace, starting at 0
    pub ordinal: u64,
    /// Logical time at which the entry was recorded
    pub at: LogicalTime,
    /// What happened
    pub label: String,
    /// Optional detail, such as a fetched name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:<3} {:>6}  {}", self.ordinal, self.at.to_string(), self.label)?;
        if let Some(payload) = &self.payload {
            write!(f, " {payload}")?;
        }
        Ok(())
    }
}

/// Shared, append-only trace handle.
///
/// Clones append to the same log, so continuations can each hold one.
///
/// # Examples
///
/// ```
/// use std::rc::Rc;
/// use core_types::{ExecutionTrace, VirtualClock};
///
/// let trace = ExecutionTrace::new(Rc::new(VirtualClock::new()));
/// let writer = trace.clone();
/// writer.record_with("result-observed:1", "stench");
///
/// let entries = trace.entries();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].payload.as_deref(), Some("stench"));
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionTrace {
    entries: Rc<RefCell<Vec<TraceEntry>>>,
    clock: Rc<dyn Clock>,
}

impl ExecutionTrace {
    /// Creates an empty trace stamping entries with `clock`.
    pub fn new(clock: Rc<dyn Clock>) -> Self {
        Self {
            entries: Rc::new(RefCell::new(Vec::new())),
            clock,
        }
    }

    /// Appends an entry without payload and returns its ordinal.
    pub fn record(&self, label: impl Into<String>) -> u64 {
        self.push(label.into(), None)
    }

    /// Appends an entry with a payload and returns its ordinal.
    pub fn record_with(&self, label: impl Into<String>, payload: impl Into<String>) -> u64 {
        self.push(label.into(), Some(payload.into()))
    }

    fn push(&self, label: String, payload: Option<String>) -> u64 {
        let mut entries = self.entries.borrow_mut();
        let ordinal = entries.len() as u64;
        entries.push(TraceEntry {
            ordinal,
            at: self.clock.now(),
            label,
            payload,
        });
        ordinal
    }

    /// Snapshot of all entries in recording order.
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.entries.borrow().clone()
    }

    /// Labels of all entries in recording order.
    pub fn labels(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .map(|entry| entry.label.clone())
            .collect()
    }

    /// Ordinal of the first entry with `label`.
    pub fn ordinal_of(&self, label: &str) -> Option<u64> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.label == label)
            .map(|entry| entry.ordinal)
    }

    /// Payloads of every entry whose label starts with `prefix`, in order.
    pub fn payloads_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.label.starts_with(prefix))
            .filter_map(|entry| entry.payload.clone())
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}
