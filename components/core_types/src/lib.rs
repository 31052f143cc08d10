//! Core types shared by the scheduler, the composition strategies and the harness.
//!
//! This crate provides the foundational vocabulary of the workspace:
//! typed errors, logical time and the execution trace used to assert
//! ordering properties.
//!
//! # Overview
//!
//! - [`AsyncError`] - Error carried by rejected deferred values
//! - [`ErrorKind`] - Failure taxonomy
//! - [`LogicalTime`] - Millisecond instant on the simulated timeline
//! - [`Clock`] / [`VirtualClock`] - Injectable time source
//! - [`ExecutionTrace`] - Append-only, ordinal-stamped log of events
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use core_types::{AsyncError, ErrorKind, ExecutionTrace, VirtualClock};
//!
//! let trace = ExecutionTrace::new(Rc::new(VirtualClock::new()));
//! let first = trace.record("begin");
//! let second = trace.record_with("result", "stench");
//! assert!(first < second);
//!
//! let error = AsyncError::transport("connection reset");
//! assert_eq!(error.kind, ErrorKind::TransportFailure);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod time;
mod trace;

pub use error::{AsyncError, ErrorKind};
pub use time::{Clock, LogicalTime, VirtualClock};
pub use trace::{ExecutionTrace, TraceEntry};
