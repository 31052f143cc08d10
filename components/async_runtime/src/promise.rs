//! Deferred values.
//!
//! A [`Deferred`] is a three-state container (pending, fulfilled, rejected)
//! with an ordered list of reactions. Settlement happens at most once and
//! schedules every registered reaction as a microtask, in registration
//! order. Reactions registered after settlement are scheduled as fresh
//! microtasks; no reaction ever runs inline.

use crate::event_loop::EventLoop;
use core_types::AsyncError;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Identifier of a deferred value, unique per event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredId(pub(crate) u64);

impl fmt::Display for DeferredId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "deferred#{}", self.0)
    }
}

/// The state of a [`Deferred`].
///
/// Once settled (Fulfilled or Rejected), a Deferred cannot change state.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredState<T> {
    /// Not settled yet
    Pending,
    /// Settled with a value
    Fulfilled(T),
    /// Settled with an error
    Rejected(AsyncError),
}

impl<T> DeferredState<T> {
    /// Returns true if the value has not settled.
    pub fn is_pending(&self) -> bool {
        matches!(self, DeferredState::Pending)
    }

    fn outcome(&self) -> Option<Result<T, AsyncError>>
    where
        T: Clone,
    {
        match self {
            DeferredState::Pending => None,
            DeferredState::Fulfilled(value) => Some(Ok(value.clone())),
            DeferredState::Rejected(error) => Some(Err(error.clone())),
        }
    }
}

/// How a derived deferred value should be resolved.
///
/// Continuations produce a `Resolution`: a value, an error, or another
/// deferred value to adopt the outcome of.
pub enum Resolution<T> {
    /// Fulfill with a value
    Fulfill(T),
    /// Reject with an error
    Reject(AsyncError),
    /// Settle the same way as another deferred value once it settles
    Follow(Deferred<T>),
}

impl<T> From<Result<T, AsyncError>> for Resolution<T> {
    fn from(result: Result<T, AsyncError>) -> Self {
        match result {
            Ok(value) => Resolution::Fulfill(value),
            Err(error) => Resolution::Reject(error),
        }
    }
}

impl<T> From<Deferred<T>> for Resolution<T> {
    fn from(deferred: Deferred<T>) -> Self {
        Resolution::Follow(deferred)
    }
}

type Reaction<T> = Box<dyn FnOnce(Result<T, AsyncError>)>;

struct Shared<T> {
    id: DeferredId,
    state: DeferredState<T>,
    reactions: Vec<Reaction<T>>,
    /// Set by the first settlement call, including one that adopts another deferred
    resolved: bool,
}

/// A value that will be available later.
///
/// `Deferred` is a handle; clones observe the same state.
///
/// # Examples
///
/// ```
/// use async_runtime::{Deferred, DeferredState, EventLoop};
///
/// let event_loop = EventLoop::new();
/// let (deferred, resolver) = Deferred::<u32>::pending(&event_loop);
/// let doubled = deferred.then(|n| Ok(n * 2));
///
/// resolver.fulfill(21);
/// assert!(doubled.is_pending());
///
/// event_loop.run().unwrap();
/// assert_eq!(doubled.state(), DeferredState::Fulfilled(42));
/// ```
pub struct Deferred<T> {
    shared: Rc<RefCell<Shared<T>>>,
    event_loop: EventLoop,
}

/// The settlement capability of a [`Deferred`].
///
/// Only the first call to any settling method has an effect; later calls
/// return `false`.
pub struct Resolver<T> {
    shared: Rc<RefCell<Shared<T>>>,
    event_loop: EventLoop,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            event_loop: self.event_loop.clone(),
        }
    }
}

impl<T> Clone for Resolver<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            event_loop: self.event_loop.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("Deferred")
            .field("id", &shared.id)
            .field("state", &shared.state)
            .field("reactions", &shared.reactions.len())
            .finish()
    }
}

impl<T> fmt::Debug for Resolver<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.borrow();
        f.debug_struct("Resolver")
            .field("id", &shared.id)
            .field("resolved", &shared.resolved)
            .finish()
    }
}

impl EventLoop {
    /// Creates a pending deferred value and its resolver on this loop.
    pub fn create_deferred<T: Clone + 'static>(&self) -> (Deferred<T>, Resolver<T>) {
        Deferred::pending(self)
    }
}

impl<T: Clone + 'static> Deferred<T> {
    /// Creates a pending deferred value and its resolver.
    pub fn pending(event_loop: &EventLoop) -> (Self, Resolver<T>) {
        let shared = Rc::new(RefCell::new(Shared {
            id: event_loop.next_deferred_id(),
            state: DeferredState::Pending,
            reactions: Vec::new(),
            resolved: false,
        }));
        let deferred = Self {
            shared: Rc::clone(&shared),
            event_loop: event_loop.clone(),
        };
        let resolver = Resolver {
            shared,
            event_loop: event_loop.clone(),
        };
        (deferred, resolver)
    }

    /// Creates an already fulfilled deferred value.
    pub fn fulfilled(event_loop: &EventLoop, value: T) -> Self {
        let (deferred, resolver) = Self::pending(event_loop);
        resolver.fulfill(value);
        deferred
    }

    /// Creates an already rejected deferred value.
    pub fn rejected(event_loop: &EventLoop, error: AsyncError) -> Self {
        let (deferred, resolver) = Self::pending(event_loop);
        resolver.reject(error);
        deferred
    }

    /// The value's id.
    pub fn id(&self) -> DeferredId {
        self.shared.borrow().id
    }

    /// The loop this value schedules its continuations on.
    pub fn event_loop(&self) -> &EventLoop {
        &self.event_loop
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> DeferredState<T> {
        self.shared.borrow().state.clone()
    }

    /// Returns true if the value has not settled.
    pub fn is_pending(&self) -> bool {
        self.shared.borrow().state.is_pending()
    }

    /// The fulfilment value, if fulfilled.
    pub fn value(&self) -> Option<T> {
        match &self.shared.borrow().state {
            DeferredState::Fulfilled(value) => Some(value.clone()),
            _ => None,
        }
    }

    /// The rejection reason, if rejected.
    pub fn error(&self) -> Option<AsyncError> {
        match &self.shared.borrow().state {
            DeferredState::Rejected(error) => Some(error.clone()),
            _ => None,
        }
    }

    /// Registers a raw reaction.
    ///
    /// The reaction runs in a microtask once the value settles, or in a new
    /// microtask right away if it already has.
    pub(crate) fn subscribe<F>(&self, reaction: F)
    where
        F: FnOnce(Result<T, AsyncError>) + 'static,
    {
        let (id, outcome) = {
            let mut shared = self.shared.borrow_mut();
            let settled = shared.state.outcome();
            match settled {
                Some(outcome) => (shared.id, outcome),
                None => {
                    shared.reactions.push(Box::new(reaction));
                    return;
                }
            }
        };
        if outcome.is_err() {
            self.event_loop.forget_unhandled(id);
        }
        self.event_loop.schedule_microtask(move || {
            reaction(outcome);
            Ok(())
        });
    }

    fn react<U, F, R>(&self, on_fulfill: F, on_reject: R) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Resolution<U> + 'static,
        R: FnOnce(AsyncError) -> Resolution<U> + 'static,
    {
        let (derived, resolver) = Deferred::pending(&self.event_loop);
        self.subscribe(move |outcome| {
            let resolution = match outcome {
                Ok(value) => on_fulfill(value),
                Err(error) => on_reject(error),
            };
            resolver.resolve(resolution);
        });
        derived
    }

    /// Chains a continuation on fulfilment.
    ///
    /// The returned value settles with the continuation's result. A rejection
    /// skips the continuation and passes through unchanged.
    pub fn then<U, F>(&self, on_fulfill: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, AsyncError> + 'static,
    {
        self.react(move |value| on_fulfill(value).into(), Resolution::Reject)
    }

    /// Chains continuations for both outcomes.
    pub fn then_or_else<U, F, R>(&self, on_fulfill: F, on_reject: R) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Result<U, AsyncError> + 'static,
        R: FnOnce(AsyncError) -> Result<U, AsyncError> + 'static,
    {
        self.react(
            move |value| on_fulfill(value).into(),
            move |error| on_reject(error).into(),
        )
    }

    /// Handles a rejection. Fulfilment passes through unchanged.
    pub fn catch<R>(&self, on_reject: R) -> Deferred<T>
    where
        R: FnOnce(AsyncError) -> Result<T, AsyncError> + 'static,
    {
        self.react(Resolution::Fulfill, move |error| on_reject(error).into())
    }

    /// Chains a continuation that starts another asynchronous step.
    ///
    /// The returned value adopts the outcome of the deferred value the
    /// continuation returns.
    pub fn and_then<U, F>(&self, on_fulfill: F) -> Deferred<U>
    where
        U: Clone + 'static,
        F: FnOnce(T) -> Deferred<U> + 'static,
    {
        self.react(move |value| Resolution::Follow(on_fulfill(value)), Resolution::Reject)
    }

    /// Aggregates several deferred values.
    ///
    /// Fulfils with every value, in input order, once all inputs have
    /// fulfilled. Rejects with the first rejection observed, whatever its
    /// position; settlements observed afterwards are discarded.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_runtime::{Deferred, EventLoop};
    ///
    /// let event_loop = EventLoop::new();
    /// let (slow, slow_resolver) = Deferred::pending(&event_loop);
    /// let fast = Deferred::fulfilled(&event_loop, "fast");
    /// let all = Deferred::all_of(&event_loop, vec![slow, fast]);
    ///
    /// slow_resolver.fulfill("slow");
    /// event_loop.run().unwrap();
    /// assert_eq!(all.value(), Some(vec!["slow", "fast"]));
    /// ```
    pub fn all_of(event_loop: &EventLoop, inputs: Vec<Deferred<T>>) -> Deferred<Vec<T>> {
        let (aggregate, resolver) = Deferred::pending(event_loop);
        if inputs.is_empty() {
            resolver.fulfill(Vec::new());
            return aggregate;
        }

        let slots: Rc<RefCell<Vec<Option<T>>>> = Rc::new(RefCell::new(vec![None; inputs.len()]));
        let remaining = Rc::new(Cell::new(inputs.len()));
        let aggregate_id = aggregate.id();

        for (index, input) in inputs.into_iter().enumerate() {
            let slots = Rc::clone(&slots);
            let remaining = Rc::clone(&remaining);
            let resolver = resolver.clone();
            input.subscribe(move |outcome| match outcome {
                Ok(value) => {
                    if resolver.is_resolved() {
                        tracing::debug!(%aggregate_id, index, "discarding fulfilment after aggregate settled");
                        return;
                    }
                    slots.borrow_mut()[index] = Some(value);
                    remaining.set(remaining.get() - 1);
                    if remaining.get() == 0 {
                        let values: Vec<T> = slots.borrow_mut().drain(..).flatten().collect();
                        resolver.fulfill(values);
                    }
                }
                Err(error) => {
                    if resolver.reject(error.clone()) {
                        tracing::debug!(%aggregate_id, index, %error, "aggregation failed fast");
                    } else {
                        tracing::debug!(%aggregate_id, index, %error, "discarding rejection after aggregate settled");
                    }
                }
            });
        }
        aggregate
    }
}

impl<T: Clone + 'static> Resolver<T> {
    /// Fulfils the deferred value. Returns `false` if it was already resolved.
    pub fn fulfill(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the deferred value. Returns `false` if it was already resolved.
    pub fn reject(&self, error: AsyncError) -> bool {
        self.settle(Err(error))
    }

    /// Settles with `outcome`. Returns `false` if already resolved.
    pub fn settle(&self, outcome: Result<T, AsyncError>) -> bool {
        if !self.lock() {
            return false;
        }
        self.complete(outcome);
        true
    }

    /// Resolves according to `resolution`.
    ///
    /// Following another deferred value resolves this one immediately, so
    /// later settlement attempts are ignored, but its state stays pending
    /// until the followed value settles. Following itself is a chaining cycle
    /// and rejects with an internal error.
    pub fn resolve(&self, resolution: Resolution<T>) -> bool {
        match resolution {
            Resolution::Fulfill(value) => self.fulfill(value),
            Resolution::Reject(error) => self.reject(error),
            Resolution::Follow(source) => {
                if Rc::ptr_eq(&self.shared, &source.shared) {
                    let id = self.shared.borrow().id;
                    return self.reject(AsyncError::internal(format!(
                        "chaining cycle detected for {id}"
                    )));
                }
                if !self.lock() {
                    return false;
                }
                let resolver = self.clone();
                source.subscribe(move |outcome| resolver.complete(outcome));
                true
            }
        }
    }

    /// Returns true once any settling method has taken effect.
    pub fn is_resolved(&self) -> bool {
        self.shared.borrow().resolved
    }

    fn lock(&self) -> bool {
        let mut shared = self.shared.borrow_mut();
        if shared.resolved {
            tracing::trace!(deferred = %shared.id, "ignoring repeated settlement");
            return false;
        }
        shared.resolved = true;
        true
    }

    fn complete(&self, outcome: Result<T, AsyncError>) {
        let (id, reactions) = {
            let mut shared = self.shared.borrow_mut();
            shared.state = match &outcome {
                Ok(value) => DeferredState::Fulfilled(value.clone()),
                Err(error) => DeferredState::Rejected(error.clone()),
            };
            (shared.id, std::mem::take(&mut shared.reactions))
        };
        tracing::debug!(
            deferred = %id,
            fulfilled = outcome.is_ok(),
            reactions = reactions.len(),
            "settled"
        );
        if let Err(error) = &outcome {
            if reactions.is_empty() {
                self.event_loop.note_unhandled(id, error.clone());
            }
        }
        for reaction in reactions {
            let outcome = outcome.clone();
            self.event_loop.schedule_microtask(move || {
                reaction(outcome);
                Ok(())
            });
        }
    }
}
