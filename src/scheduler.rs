//! Schedulers, workers and the schedulable queue.
//!
//! A [`Scheduler`] only knows how to create a [`Worker`]. A worker accepts
//! [`Schedulable`]s: closures bound to a [`TaskHandle`] that run at a time
//! point and may ask to be run again by returning a [`Delay`].
//!
//! Every worker guarantees the same ordering: schedulables run by ascending
//! time point, ties in the order they were scheduled. A schedulable whose
//! handle is disposed is dropped without running. There is no other way to
//! cancel a task.
use std::{
  cmp::Ordering,
  fmt::{Debug, Formatter},
  panic::{self, AssertUnwindSafe},
  time::{Duration, Instant},
};

use crate::{
  disposable::{CompositeDisposable, Disposable, DisposableHandle},
  error::RxError,
};

mod immediate;
mod new_thread;
mod queue;
mod run_loop;
mod test_scheduler;
mod thread_pool;
mod trampoline;

pub use immediate::{Immediate, ImmediateWorker};
pub use new_thread::{NewThread, NewThreadWorker};
pub use queue::SchedulablesQueue;
pub use run_loop::{RunLoop, RunLoopWorker};
pub use test_scheduler::{TestScheduler, TestWorker};
pub use thread_pool::{ThreadPool, ThreadPoolWorker};
pub use trampoline::{Trampoline, TrampolineWorker};

/// The scheduler that queues work on the calling thread.
pub type CurrentThread = Trampoline;

/// What a schedulable returns to run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
  /// Relative to the moment the schedulable finished running.
  FromNow(Duration),
  /// Relative to the time point the schedulable was scheduled for. Keeps
  /// periodic tasks free of drift.
  FromThisTimepoint(Duration),
  /// An absolute time point.
  To(Instant),
}

/// The observer or disposable a schedulable is bound to. The schedulable
/// is dropped once the handle is disposed.
pub trait TaskHandle: Disposable + 'static {
  /// Receives the panic of the bound closure.
  fn on_error(&self, err: RxError);
}

impl TaskHandle for CompositeDisposable {
  fn on_error(&self, err: RxError) {
    tracing::error!(target: "rxplus::unhandled", error = %err, "scheduled task failed");
    self.dispose();
  }
}

impl TaskHandle for DisposableHandle {
  fn on_error(&self, err: RxError) {
    tracing::error!(target: "rxplus::unhandled", error = %err, "scheduled task failed");
    self.dispose();
  }
}

trait Runnable: Send {
  fn run(&mut self) -> Option<Delay>;

  fn is_disposed(&self) -> bool;
}

struct Bound<H, F> {
  handle: H,
  f: F,
}

impl<H, F> Runnable for Bound<H, F>
where
  H: TaskHandle,
  F: FnMut(&H) -> Option<Delay> + Send,
{
  fn run(&mut self) -> Option<Delay> {
    let Self { handle, f } = self;
    match panic::catch_unwind(AssertUnwindSafe(|| f(handle))) {
      Ok(delay) => delay,
      Err(payload) => {
        handle.on_error(RxError::from_panic(payload));
        None
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.handle.is_disposed() }
}

/// A deferred unit of work.
///
/// Ordered by time point, then by the sequence number its queue assigned on
/// insertion.
pub struct Schedulable {
  at: Instant,
  seq: u64,
  task: Box<dyn Runnable>,
}

impl Schedulable {
  pub fn new<H, F>(at: Instant, handle: H, f: F) -> Self
  where
    H: TaskHandle,
    F: FnMut(&H) -> Option<Delay> + Send + 'static,
  {
    Schedulable { at, seq: 0, task: Box::new(Bound { handle, f }) }
  }

  #[inline]
  pub fn time_point(&self) -> Instant { self.at }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.task.is_disposed() }

  /// Runs the closure once. Returns the time point to run it again at, if
  /// it asked for one and its handle is still alive.
  pub fn run(&mut self, now: impl FnOnce() -> Instant) -> Option<Instant> {
    let next = match self.task.run()? {
      Delay::FromNow(d) => now() + d,
      Delay::FromThisTimepoint(d) => self.at + d,
      Delay::To(at) => at,
    };
    if self.is_disposed() {
      tracing::trace!(target: "rxplus", "reschedule dropped, handle disposed");
      None
    } else {
      Some(next)
    }
  }

  pub(crate) fn set_time_point(&mut self, at: Instant) { self.at = at }
}

impl Debug for Schedulable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Schedulable").field("at", &self.at).field("seq", &self.seq).finish()
  }
}

impl PartialEq for Schedulable {
  fn eq(&self, other: &Self) -> bool { self.at == other.at && self.seq == other.seq }
}

impl Eq for Schedulable {}

impl PartialOrd for Schedulable {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Schedulable {
  fn cmp(&self, other: &Self) -> Ordering {
    // Min-heap: earlier time points first, then FIFO by sequence.
    other.at.cmp(&self.at).then_with(|| other.seq.cmp(&self.seq))
  }
}

/// An execution context accepting schedulables.
pub trait Worker: Send + Sync {
  /// The worker's clock.
  fn now(&self) -> Instant;

  /// Queues `task` to run at its time point.
  fn defer(&self, task: Schedulable);

  /// The disposable controlling the worker's own lifetime, if it has one.
  /// Operators attach it to their subscription so the worker stops with it.
  fn disposable(&self) -> Option<DisposableHandle> { None }
}

/// Convenience constructors for schedulables, available on every worker.
pub trait WorkerExt: Worker {
  /// Runs `f` after `delay`, then again as long as it returns a [`Delay`].
  fn schedule<H, F>(&self, delay: Duration, handle: H, f: F)
  where
    H: TaskHandle,
    F: FnMut(&H) -> Option<Delay> + Send + 'static,
  {
    if handle.is_disposed() {
      return;
    }
    self.defer(Schedulable::new(self.now() + delay, handle, f))
  }

  fn schedule_at<H, F>(&self, at: Instant, handle: H, f: F)
  where
    H: TaskHandle,
    F: FnMut(&H) -> Option<Delay> + Send + 'static,
  {
    if handle.is_disposed() {
      return;
    }
    self.defer(Schedulable::new(at, handle, f))
  }

  /// Runs `f` once after `delay`.
  fn schedule_once<H, F>(&self, delay: Duration, handle: H, f: F)
  where
    H: TaskHandle,
    F: FnOnce(&H) + Send + 'static,
  {
    let mut f = Some(f);
    self.schedule(delay, handle, move |h| {
      if let Some(f) = f.take() {
        f(h)
      }
      None
    })
  }
}

impl<W: Worker + ?Sized> WorkerExt for W {}

/// A factory of workers.
pub trait Scheduler: Clone + Send + Sync + 'static {
  type Worker: Worker + Clone + 'static;

  fn create_worker(&self) -> Self::Worker;

  /// The clock its workers use, read without creating one.
  fn now(&self) -> Instant { Instant::now() }
}

pub(crate) fn sleep_until(at: Instant) {
  let now = Instant::now();
  if at > now {
    std::thread::sleep(at - now);
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use super::*;

  #[test]
  fn panicking_task_reports_to_handle() {
    struct Recorder(Mutex<Option<RxError>>);
    impl Disposable for Recorder {
      fn dispose(&self) {}
      fn is_disposed(&self) -> bool { false }
    }
    impl TaskHandle for Arc<Recorder> {
      fn on_error(&self, err: RxError) { *self.0.lock() = Some(err) }
    }

    let recorder = Arc::new(Recorder(Mutex::new(None)));
    let mut task = Schedulable::new(Instant::now(), recorder.clone(), |_| panic!("task failed"));
    assert_eq!(task.run(Instant::now), None);
    assert_eq!(*recorder.0.lock(), Some(RxError::Panicked("task failed".into())));
  }

  #[test]
  fn delay_kinds() {
    let start = Instant::now();
    let handle = CompositeDisposable::new();
    let mut delays =
      vec![Delay::To(start), Delay::FromNow(Duration::from_secs(1)), Delay::FromThisTimepoint(Duration::from_secs(2))]
        .into_iter();
    let mut task = Schedulable::new(start, handle, move |_| delays.next());
    let later = start + Duration::from_secs(10);

    assert_eq!(task.run(|| later), Some(start));
    assert_eq!(task.run(|| later), Some(later + Duration::from_secs(1)));
    assert_eq!(task.run(|| later), Some(start + Duration::from_secs(2)));
    assert_eq!(task.run(|| later), None);
  }

  #[test]
  fn composite_handle_disposal_state() {
    fn alive<H: TaskHandle>(handle: &H) -> bool { !handle.is_disposed() }

    let handle = CompositeDisposable::new();
    assert!(alive(&handle));
    assert!(!handle.is_disposed());
    handle.dispose();
    assert!(!alive(&handle));
    assert!(handle.is_disposed());
  }
}
