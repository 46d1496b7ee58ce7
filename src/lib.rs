//! # rxplus: a reactive streams runtime
//!
//! Push-based observables with explicit cancellation, pluggable schedulers
//! and concurrency-safe combining operators.
//!
//! ## Quick Start
//!
//! ```rust
//! use rxplus::prelude::*;
//!
//! observable::from_iter(0..10)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 2)
//!   .subscribe(|v| println!("Value: {}", v));
//! ```
//!
//! ## Key Concepts
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Disposable`] | Cancellation token; subscriptions form disposable trees |
//! | [`Scheduler`] / [`Worker`] | Where and when work runs |
//! | [`Observable`] | A stored subscription strategy, cheap to clone |
//! | [`Subscriber`] | The serialized, terminal-exclusive observer every source drives |
//! | [`PublishSubject`] | Both an observer and an observable, multicasting values |
//!
//! ## Feature Flags
//!
//! - **`futures-interop`** (default): `into_stream` and `blocking_iter`
//!   through the `futures` crate.
//!
//! [`Disposable`]: disposable::Disposable
//! [`Scheduler`]: scheduler::Scheduler
//! [`Worker`]: scheduler::Worker
//! [`Observable`]: observable::Observable
//! [`Subscriber`]: observer::Subscriber
//! [`PublishSubject`]: subject::PublishSubject
pub mod disposable;
pub mod error;
pub mod observable;
pub mod observer;
pub mod ops;
pub mod prelude;
pub mod scheduler;
pub mod subject;
mod util;

// Re-export the prelude module
pub use prelude::*;

#[cfg(doctest)]
mod readme {
  #![doc = include_str!("../README.md")]
}
