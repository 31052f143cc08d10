//! Event loop implementation.
//!
//! This module provides the cooperative, single-threaded scheduler that owns
//! the microtask queue, the timer queue and the logical clock.

use crate::promise::DeferredId;
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskId, TaskKind, TimerQueue};
use core_types::{AsyncError, Clock, LogicalTime, VirtualClock};
use parking_lot::Mutex;
use serde::Serialize;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

/// Tasks a single [`EventLoop::run`] may execute before it reports starvation.
pub const DEFAULT_TASK_BUDGET: u64 = 1_000_000;

/// Tunables for an [`EventLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Maximum number of tasks executed by one call to `run`, or `None` for no limit
    pub task_budget: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            task_budget: Some(DEFAULT_TASK_BUDGET),
        }
    }
}

/// Counters collected while the loop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Microtasks executed
    pub microtasks: u64,
    /// Timer tasks executed
    pub timers: u64,
    /// Times a suspended local task was resumed
    pub resumptions: u64,
}

impl RunStats {
    /// Total number of queued tasks executed.
    pub fn tasks(&self) -> u64 {
        self.microtasks + self.timers
    }
}

/// A rejection that nothing was observing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnhandledRejection {
    /// The rejected deferred value
    pub deferred: DeferredId,
    /// Its rejection reason
    pub error: AsyncError,
}

pub(crate) type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

pub(crate) struct Inner {
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    next_id: Cell<u64>,
    running: Cell<bool>,
    microtasks: RefCell<MicrotaskQueue>,
    timers: RefCell<TimerQueue>,
    unhandled: RefCell<BTreeMap<DeferredId, (AsyncError, bool)>>,
    pub(crate) local_tasks: RefCell<HashMap<TaskId, LocalFuture>>,
    pub(crate) woken: Arc<Mutex<VecDeque<TaskId>>>,
}

/// The event loop.
///
/// Each turn of [`run`](EventLoop::run):
/// 1. Drains the microtask queue completely, including microtasks enqueued
///    while draining
/// 2. Pops the earliest-ready timer (ties broken by scheduling order),
///    advances the clock to its ready time and executes it
/// 3. Repeats until both queues are empty
///
/// `EventLoop` is a cheap handle: clones drive the same queues. Deferred
/// values keep one so they can schedule their continuations.
///
/// # Examples
///
/// ```
/// use async_runtime::EventLoop;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let event_loop = EventLoop::new();
/// let order = Rc::new(RefCell::new(Vec::new()));
///
/// let o = order.clone();
/// event_loop.schedule_timer(0, move || {
///     o.borrow_mut().push("timer");
///     Ok(())
/// });
/// let o = order.clone();
/// event_loop.schedule_microtask(move || {
///     o.borrow_mut().push("microtask");
///     Ok(())
/// });
///
/// event_loop.run().unwrap();
/// assert_eq!(*order.borrow(), vec!["microtask", "timer"]);
/// ```
#[derive(Clone)]
pub struct EventLoop {
    pub(crate) inner: Rc<Inner>,
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl EventLoop {
    /// Creates an event loop on a fresh [`VirtualClock`].
    pub fn new() -> Self {
        Self::with_clock(Rc::new(VirtualClock::new()))
    }

    /// Creates an event loop reading time from `clock`.
    pub fn with_clock(clock: Rc<dyn Clock>) -> Self {
        Self::with_config(clock, SchedulerConfig::default())
    }

    /// Creates an event loop with explicit tunables.
    pub fn with_config(clock: Rc<dyn Clock>, config: SchedulerConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                clock,
                config,
                next_id: Cell::new(0),
                running: Cell::new(false),
                microtasks: RefCell::new(MicrotaskQueue::new()),
                timers: RefCell::new(TimerQueue::new()),
                unhandled: RefCell::new(BTreeMap::new()),
                local_tasks: RefCell::new(HashMap::new()),
                woken: Arc::new(Mutex::new(VecDeque::new())),
            }),
        }
    }

    /// The clock this loop advances.
    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.inner.clock)
    }

    /// Current logical time.
    pub fn now(&self) -> LogicalTime {
        self.inner.clock.now()
    }

    /// The loop's tunables.
    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    /// Returns true while `run` (or a stepping method) is executing tasks.
    pub fn is_running(&self) -> bool {
        self.inner.running.get()
    }

    pub(crate) fn next_task_id(&self) -> TaskId {
        TaskId(self.next_sequence())
    }

    pub(crate) fn next_deferred_id(&self) -> DeferredId {
        DeferredId(self.next_sequence())
    }

    fn next_sequence(&self) -> u64 {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        id
    }

    /// Schedules `action` to run as a microtask.
    pub fn schedule_microtask<F>(&self, action: F) -> TaskId
    where
        F: FnOnce() -> Result<(), AsyncError> + 'static,
    {
        self.enqueue_microtask(MicroTask::new(action))
    }

    /// Adds a microtask to the microtask queue.
    ///
    /// The microtask will be executed after the current task completes.
    pub fn enqueue_microtask(&self, microtask: MicroTask) -> TaskId {
        let id = self.next_task_id();
        let task = microtask.into_task(id, self.now());
        self.inner.microtasks.borrow_mut().enqueue(task);
        id
    }

    /// Schedules `action` to run as a timer task `delay_ms` after the current time.
    ///
    /// Once scheduled, a timer cannot be cancelled.
    pub fn schedule_timer<F>(&self, delay_ms: u64, action: F) -> TaskId
    where
        F: FnOnce() -> Result<(), AsyncError> + 'static,
    {
        let id = self.next_task_id();
        let ready_at = self.now().after(delay_ms);
        tracing::trace!(task = %id, %ready_at, "timer scheduled");
        self.inner
            .timers
            .borrow_mut()
            .enqueue(Task::timer(id, ready_at, action));
        id
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.inner.microtasks.borrow().is_empty()
    }

    /// Returns true if the timer queue is empty.
    pub fn is_timer_queue_empty(&self) -> bool {
        self.inner.timers.borrow().is_empty()
    }

    /// Number of queued microtasks.
    pub fn pending_microtasks(&self) -> usize {
        self.inner.microtasks.borrow().len()
    }

    /// Number of queued timers.
    pub fn pending_timers(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Runs the loop until both queues are empty.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Internal`](core_types::ErrorKind::Internal) if the loop is already running
    /// - [`ErrorKind::StarvationFault`](core_types::ErrorKind::StarvationFault) if the task
    ///   budget is exhausted before the queues drain; queued work is left in place
    /// - any error returned by a task body, which aborts the run
    pub fn run(&self) -> Result<RunStats, AsyncError> {
        let _guard = self.enter()?;
        let mut stats = RunStats::default();
        let result = self.drive(&mut stats);
        self.report_unhandled();
        result.map(|()| stats)
    }

    /// Runs all microtasks in the queue until empty.
    ///
    /// New microtasks added during execution are also processed before this
    /// method returns. Timers are not touched.
    pub fn run_all_microtasks(&self) -> Result<RunStats, AsyncError> {
        let _guard = self.enter()?;
        let mut stats = RunStats::default();
        self.drain_microtasks(&mut stats)?;
        Ok(stats)
    }

    /// Processes one complete cycle: all microtasks, then at most one timer.
    ///
    /// Returns `true` if a timer ran.
    pub fn process_one_cycle(&self) -> Result<bool, AsyncError> {
        let _guard = self.enter()?;
        let mut stats = RunStats::default();
        self.drain_microtasks(&mut stats)?;
        self.run_next_timer(&mut stats)
    }

    fn enter(&self) -> Result<RunningGuard<'_>, AsyncError> {
        if self.inner.running.replace(true) {
            return Err(AsyncError::internal("event loop is already running"));
        }
        Ok(RunningGuard(&self.inner.running))
    }

    fn drive(&self, stats: &mut RunStats) -> Result<(), AsyncError> {
        self.resume_woken(stats);
        loop {
            self.drain_microtasks(stats)?;
            if !self.run_next_timer(stats)? {
                return Ok(());
            }
        }
    }

    fn drain_microtasks(&self, stats: &mut RunStats) -> Result<(), AsyncError> {
        while !self.is_microtask_queue_empty() {
            self.check_budget(stats)?;
            let next = self.inner.microtasks.borrow_mut().dequeue();
            if let Some(task) = next {
                self.execute(task, stats)?;
            }
        }
        Ok(())
    }

    fn run_next_timer(&self, stats: &mut RunStats) -> Result<bool, AsyncError> {
        if self.is_timer_queue_empty() {
            return Ok(false);
        }
        self.check_budget(stats)?;
        let next = self.inner.timers.borrow_mut().dequeue();
        match next {
            Some(task) => {
                self.inner.clock.advance_to(task.ready_at());
                self.execute(task, stats)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn check_budget(&self, stats: &RunStats) -> Result<(), AsyncError> {
        match self.inner.config.task_budget {
            Some(budget) if stats.tasks() >= budget => {
                tracing::warn!(
                    budget,
                    pending_microtasks = self.pending_microtasks(),
                    pending_timers = self.pending_timers(),
                    "task budget exhausted; the loop is starved"
                );
                Err(AsyncError::starvation(format!(
                    "task budget of {budget} exhausted before the queues drained"
                )))
            }
            _ => Ok(()),
        }
    }

    fn execute(&self, task: Task, stats: &mut RunStats) -> Result<(), AsyncError> {
        tracing::trace!(task = %task.id(), kind = ?task.kind(), at = %self.now(), "running task");
        match task.kind() {
            TaskKind::Microtask => stats.microtasks += 1,
            TaskKind::MacrotaskTimer => stats.timers += 1,
        }
        task.run()?;
        // A task may have woken suspended local tasks; they resume as part of it.
        self.resume_woken(stats);
        Ok(())
    }

    pub(crate) fn resume_woken(&self, stats: &mut RunStats) {
        loop {
            let next = self.inner.woken.lock().pop_front();
            let Some(id) = next else {
                return;
            };
            if self.poll_local(id) {
                stats.resumptions += 1;
            }
        }
    }

    pub(crate) fn note_unhandled(&self, deferred: DeferredId, error: AsyncError) {
        tracing::debug!(%deferred, %error, "rejected with no reactions attached");
        self.inner
            .unhandled
            .borrow_mut()
            .insert(deferred, (error, false));
    }

    pub(crate) fn forget_unhandled(&self, deferred: DeferredId) {
        self.inner.unhandled.borrow_mut().remove(&deferred);
    }

    fn report_unhandled(&self) {
        for (deferred, (error, reported)) in self.inner.unhandled.borrow_mut().iter_mut() {
            if !*reported {
                tracing::warn!(%deferred, %error, "unhandled rejection");
                *reported = true;
            }
        }
    }

    /// Rejections that no continuation has observed so far.
    ///
    /// Attaching a continuation to one of these deferred values removes it
    /// from the list. Unhandled rejections are diagnostics only.
    pub fn unhandled_rejections(&self) -> Vec<UnhandledRejection> {
        self.inner
            .unhandled
            .borrow()
            .iter()
            .map(|(deferred, (error, _))| UnhandledRejection {
                deferred: *deferred,
                error: error.clone(),
            })
            .collect()
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("now", &self.now())
            .field("running", &self.is_running())
            .field("microtasks", &self.pending_microtasks())
            .field("timers", &self.pending_timers())
            .field("local_tasks", &self.inner.local_tasks.borrow().len())
            .finish()
    }
}
