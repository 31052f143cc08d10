//! Async runtime for deterministic control-flow simulation.
//!
//! This crate provides the cooperative, single-threaded machinery the
//! composition strategies run on:
//! - Event loop with a FIFO microtask queue and a timer queue
//! - Deferred values with settle-once semantics and chaining
//! - Fail-fast aggregation of several deferred values
//! - A local task driver so deferred values can be awaited
//!
//! # Overview
//!
//! - [`EventLoop`] - Owns the queues and the logical clock
//! - [`Deferred`] / [`Resolver`] - A value available later, and its settlement capability
//! - [`Deferred::all_of`] - Input-ordered, fail-fast aggregation
//! - [`EventLoop::spawn_local`] - Runs an `async` body, returning a [`Deferred`]
//!
//! # Examples
//!
//! ## Ordering
//!
//! ```
//! use async_runtime::{Deferred, EventLoop};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let event_loop = EventLoop::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let l = log.clone();
//! Deferred::fulfilled(&event_loop, "continuation").then(move |label| {
//!     l.borrow_mut().push(label);
//!     Ok(())
//! });
//! log.borrow_mut().push("synchronous");
//!
//! event_loop.run().unwrap();
//! assert_eq!(*log.borrow(), vec!["synchronous", "continuation"]);
//! ```
//!
//! ## Await
//!
//! ```
//! use async_runtime::{Deferred, EventLoop};
//!
//! let event_loop = EventLoop::new();
//! let (name, resolver) = Deferred::pending(&event_loop);
//! let greeting = event_loop.spawn_local(async move {
//!     let name: String = name.await?;
//!     Ok(format!("hello {name}"))
//! });
//!
//! let el = event_loop.clone();
//! event_loop.schedule_timer(100, move || {
//!     resolver.fulfill("stench".to_string());
//!     Ok(())
//! });
//!
//! event_loop.run().unwrap();
//! assert_eq!(greeting.value().as_deref(), Some("hello stench"));
//! assert_eq!(el.now().as_millis(), 100);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod event_loop;
pub mod executor;
pub mod promise;
pub mod task_queue;

// Re-export main types at crate root
pub use event_loop::{EventLoop, RunStats, SchedulerConfig, UnhandledRejection, DEFAULT_TASK_BUDGET};
pub use executor::Awaited;
pub use promise::{Deferred, DeferredId, DeferredState, Resolution, Resolver};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskId, TaskKind, TimerQueue};
