//! Await-style composition on top of the event loop.
//!
//! [`EventLoop::spawn_local`] drives a future the way an async function body
//! runs: synchronously up to its first suspension point, then resumed by the
//! loop whenever a deferred value it awaits settles. Awaiting never resumes
//! inline; the resumption happens inside the microtask that delivers the
//! outcome.

use crate::event_loop::{EventLoop, LocalFuture};
use crate::promise::Deferred;
use crate::task_queue::TaskId;
use core_types::AsyncError;
use parking_lot::Mutex;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};

struct TaskWaker {
    id: TaskId,
    woken: Arc<Mutex<VecDeque<TaskId>>>,
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.woken.lock().push_back(self.id);
    }
}

impl EventLoop {
    /// Runs `future` as a local task and returns a deferred value for its output.
    ///
    /// The future is polled once immediately, so everything before its first
    /// `.await` on a pending value happens before this method returns. The
    /// returned value settles when the future completes: an `Err` output
    /// (for instance a rejection propagated with `?`) rejects it with the same
    /// error.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{Deferred, EventLoop};
    ///
    /// let event_loop = EventLoop::new();
    /// let (first, resolver) = Deferred::<u32>::pending(&event_loop);
    /// let sum = event_loop.spawn_local(async move {
    ///     let a = first.await?;
    ///     Ok(a + 1)
    /// });
    ///
    /// resolver.fulfill(41);
    /// assert!(sum.is_pending());
    /// event_loop.run().unwrap();
    /// assert_eq!(sum.value(), Some(42));
    /// ```
    pub fn spawn_local<T, F>(&self, future: F) -> Deferred<T>
    where
        T: Clone + 'static,
        F: Future<Output = Result<T, AsyncError>> + 'static,
    {
        let (deferred, resolver) = Deferred::pending(self);
        let id = self.next_task_id();
        let body: LocalFuture = Box::pin(async move {
            resolver.settle(future.await);
        });
        self.inner.local_tasks.borrow_mut().insert(id, body);
        tracing::debug!(task = %id, deferred = %deferred.id(), "spawned local task");
        self.poll_local(id);
        deferred
    }

    /// Number of local tasks suspended at an `.await`.
    pub fn suspended_tasks(&self) -> usize {
        self.inner.local_tasks.borrow().len()
    }

    /// Drops every suspended local task and returns how many there were.
    ///
    /// A suspended task keeps its captures alive, including handles to this
    /// loop, so a task that can no longer be woken would otherwise pin the
    /// loop in memory. The deferred values returned by
    /// [`spawn_local`](EventLoop::spawn_local) for released tasks stay
    /// pending.
    pub fn release_suspended(&self) -> usize {
        let released = std::mem::take(&mut *self.inner.local_tasks.borrow_mut());
        if !released.is_empty() {
            tracing::debug!(tasks = released.len(), "released suspended local tasks");
        }
        released.len()
    }

    /// Polls the local task `id` once. Returns `false` if it no longer exists.
    pub(crate) fn poll_local(&self, id: TaskId) -> bool {
        // Taken out of the map while polling: the body may spawn or wake others.
        let taken = self.inner.local_tasks.borrow_mut().remove(&id);
        let Some(mut future) = taken else {
            return false;
        };
        let waker = Waker::from(Arc::new(TaskWaker {
            id,
            woken: Arc::clone(&self.inner.woken),
        }));
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => tracing::trace!(task = %id, "local task completed"),
            Poll::Pending => {
                self.inner.local_tasks.borrow_mut().insert(id, future);
            }
        }
        true
    }
}

/// Future returned by awaiting a [`Deferred`].
///
/// Resolves to the deferred value's outcome. The first poll registers a
/// reaction; the outcome is delivered in a microtask even if the value had
/// already settled.
pub struct Awaited<T> {
    deferred: Deferred<T>,
    slot: Rc<RefCell<Option<Result<T, AsyncError>>>>,
    registered: bool,
}

impl<T: Clone + 'static> Future for Awaited<T> {
    type Output = Result<T, AsyncError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(outcome) = this.slot.borrow_mut().take() {
            return Poll::Ready(outcome);
        }
        if !this.registered {
            this.registered = true;
            let slot = Rc::clone(&this.slot);
            let waker = cx.waker().clone();
            this.deferred.subscribe(move |outcome| {
                *slot.borrow_mut() = Some(outcome);
                waker.wake();
            });
        }
        Poll::Pending
    }
}

impl<T: Clone + 'static> IntoFuture for Deferred<T> {
    type Output = Result<T, AsyncError>;
    type IntoFuture = Awaited<T>;

    fn into_future(self) -> Self::IntoFuture {
        Awaited {
            deferred: self,
            slot: Rc::new(RefCell::new(None)),
            registered: false,
        }
    }
}
