//! Task and microtask queue management.
//!
//! This module provides the two queues drained by the event loop: a FIFO
//! microtask queue and a timer queue ordered by readiness time, with ties
//! broken by insertion order.

use core_types::{AsyncError, LogicalTime};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;

/// Identifier of a scheduled task, unique per event loop.
///
/// Ids are handed out in increasing order, so comparing two ids compares
/// their scheduling order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    /// The raw sequence number.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Which queue a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Drained completely before the next timer runs
    Microtask,
    /// Runs once its ready time is reached and all microtasks have drained
    MacrotaskTimer,
}

type Callback = Box<dyn FnOnce() -> Result<(), AsyncError>>;

/// A unit of work owned by the event loop.
///
/// Tasks are consumed when they run.
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    ready_at: LogicalTime,
    callback: Callback,
}

impl Task {
    /// Creates a microtask.
    pub fn microtask<F>(id: TaskId, ready_at: LogicalTime, f: F) -> Self
    where
        F: FnOnce() -> Result<(), AsyncError> + 'static,
    {
        Self {
            id,
            kind: TaskKind::Microtask,
            ready_at,
            callback: Box::new(f),
        }
    }

    /// Creates a timer task that becomes ready at `ready_at`.
    pub fn timer<F>(id: TaskId, ready_at: LogicalTime, f: F) -> Self
    where
        F: FnOnce() -> Result<(), AsyncError> + 'static,
    {
        Self {
            id,
            kind: TaskKind::MacrotaskTimer,
            ready_at,
            callback: Box::new(f),
        }
    }

    /// The task's id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// The task's kind.
    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    /// When the task becomes eligible to run.
    pub fn ready_at(&self) -> LogicalTime {
        self.ready_at
    }

    /// Executes the task.
    pub fn run(self) -> Result<(), AsyncError> {
        (self.callback)()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("ready_at", &self.ready_at)
            .finish_non_exhaustive()
    }
}

/// A microtask that has not yet been given an id.
///
/// The event loop assigns the id when it is enqueued.
pub struct MicroTask {
    callback: Callback,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), AsyncError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    pub(crate) fn into_task(self, id: TaskId, now: LogicalTime) -> Task {
        Task {
            id,
            kind: TaskKind::Microtask,
            ready_at: now,
            callback: self.callback,
        }
    }
}

impl fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A queue for microtasks.
///
/// Microtasks are processed in FIFO order.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<Task>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        debug_assert_eq!(task.kind, TaskKind::Microtask);
        self.queue.push_back(task);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

struct TimerEntry(Task);

impl TimerEntry {
    fn key(&self) -> (LogicalTime, TaskId) {
        (self.0.ready_at, self.0.id)
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// A queue for timer tasks.
///
/// The earliest-ready task is popped first; tasks ready at the same instant
/// pop in the order they were scheduled.
#[derive(Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Reverse<TimerEntry>>,
}

impl TimerQueue {
    /// Creates a new empty TimerQueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a timer task.
    pub fn enqueue(&mut self, task: Task) {
        debug_assert_eq!(task.kind, TaskKind::MacrotaskTimer);
        self.heap.push(Reverse(TimerEntry(task)));
    }

    /// Removes and returns the earliest-ready timer.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.heap.pop().map(|Reverse(TimerEntry(task))| task)
    }

    /// Ready time of the next timer, if any.
    pub fn next_ready_at(&self) -> Option<LogicalTime> {
        self.heap.peek().map(|Reverse(entry)| entry.0.ready_at)
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Returns the number of timers in the queue.
    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("len", &self.heap.len())
            .field("next_ready_at", &self.next_ready_at())
            .finish()
    }
}
