//! Operators, as [`Operator`] values for [`Observable::pipe`] and as
//! methods on [`Observable`].
//!
//! [`Operator`]: crate::observable::Operator
//! [`Observable`]: crate::observable::Observable
//! [`Observable::pipe`]: crate::observable::Observable::pipe
use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::{
  error::RxError,
  observer::{Observer, Subscriber},
  scheduler::{Scheduler, Worker},
};

pub mod combine_latest;
pub mod concat;
pub mod debounce;
pub mod delay;
pub mod filter;
pub mod group_by;
pub mod map;
pub mod merge;
pub mod observe_on;
pub mod on_error_resume_next;
pub mod retry;
pub mod retry_when;
pub mod sample;
pub mod subscribe_on;
pub mod switch_on_next;
pub mod take;
pub mod take_until;
pub mod tap;
pub mod throttle;
pub mod timeout;
pub mod window;
pub mod with_latest_from;
pub mod zip;

pub use combine_latest::{combine_latest, combine_latest_by, CombineLatestAll};
pub use concat::{concat, concat_map, ConcatAll};
pub use debounce::{debounce, Debounce};
pub use delay::{delay, DelayOp};
pub use filter::{filter, Filter};
pub use group_by::{group_by, GroupBy, GroupedObservable};
pub use map::{map, Map};
pub use merge::{flat_map, merge, MergeAll};
pub use observe_on::{observe_on, ObserveOn};
pub use on_error_resume_next::{on_error_resume_next, OnErrorResumeNext};
pub use retry::{retry, retry_forever, Retry};
pub use retry_when::{retry_when, RetryWhen};
pub use sample::{sample, Sample};
pub use subscribe_on::{subscribe_on, SubscribeOn};
pub use switch_on_next::{switch_map, SwitchOnNext};
pub use take::{take, Take};
pub use take_until::{take_until, TakeUntil};
pub use tap::{tap, Tap};
pub use throttle::{throttle, Throttle};
pub use timeout::{timeout, timeout_with, Timeout};
pub use window::{window, Window};
pub use with_latest_from::{with_latest_from, WithLatestFrom};
pub use zip::{zip, zip_by, ZipAll};

// Coordinator state: the reentrant lock serializes the sources, the cell is
// only borrowed while computing what to emit, never while emitting.
pub(crate) type Gate<S> = ReentrantMutex<RefCell<S>>;

pub(crate) fn gate<S>(state: S) -> Gate<S> { ReentrantMutex::new(RefCell::new(state)) }

/// Creates a worker for one subscription; the worker stops with `down`.
pub(crate) fn bind_worker<S: Scheduler, T: Send + 'static>(scheduler: &S, down: &Subscriber<T>) -> S::Worker {
  let worker = scheduler.create_worker();
  if let Some(d) = worker.disposable() {
    down.set_upstream(d);
  }
  worker
}

/// Passes every notification through to `down`; used for fallback and
/// resubscribed sources.
pub(crate) struct Forward<T>(pub(crate) Subscriber<T>);

impl<T: Send + 'static> Observer<T> for Forward<T> {
  #[inline]
  fn on_next(&mut self, value: T) { self.0.on_next(value) }

  fn on_error(&mut self, err: RxError) { self.0.on_error(err) }

  fn on_completed(&mut self) { self.0.on_completed() }
}
