//! Virtual-time scheduler for deterministic tests of time-based operators.
//!
//! Time only moves when [`TestScheduler::time_advance`] is called. Scheduling
//! a task that is already due runs it right away; advancing the clock runs
//! every task that became due, in queue order. Every scheduling and every
//! execution is recorded as an offset from the scheduler's start.
//!
//! ```
//! use std::time::Duration;
//! use rxplus::prelude::*;
//!
//! let scheduler = TestScheduler::new();
//! let worker = scheduler.create_worker();
//! worker.schedule_once(Duration::from_secs(2), CompositeDisposable::new(), |_| {});
//!
//! scheduler.time_advance(Duration::from_secs(2));
//! assert_eq!(scheduler.executions(), vec![Duration::from_secs(2)]);
//! ```
use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use super::{Schedulable, SchedulablesQueue, Scheduler, Worker};

// Every test scheduler starts its virtual clock here.
static EPOCH: Lazy<Instant> = Lazy::new(Instant::now);

// ==================== Internal State ====================

struct State {
  now: Instant,
  queue: SchedulablesQueue,
  draining: bool,
  schedulings: Vec<Duration>,
  executions: Vec<Duration>,
}

impl State {
  fn offset(&self, at: Instant) -> Duration { at.saturating_duration_since(*EPOCH) }
}

// ==================== TestScheduler ====================

/// A scheduler driven by a virtual clock. Clones share the clock.
#[derive(Clone)]
pub struct TestScheduler(Arc<Mutex<State>>);

/// Worker of a [`TestScheduler`].
#[derive(Clone)]
pub struct TestWorker(Arc<Mutex<State>>);

impl Default for TestScheduler {
  fn default() -> Self {
    TestScheduler(Arc::new(Mutex::new(State {
      now: *EPOCH,
      queue: SchedulablesQueue::new(),
      draining: false,
      schedulings: vec![],
      executions: vec![],
    })))
  }
}

impl TestScheduler {
  pub fn new() -> Self { Self::default() }

  /// Current virtual time.
  pub fn now(&self) -> Instant { self.0.lock().now }

  /// Virtual time elapsed since the scheduler was created.
  pub fn elapsed(&self) -> Duration {
    let state = self.0.lock();
    state.offset(state.now)
  }

  /// Moves the clock forward by `by` and runs everything that became due.
  pub fn time_advance(&self, by: Duration) {
    self.0.lock().now += by;
    drain(&self.0);
  }

  /// Time points (as offsets from the start) every task was scheduled for,
  /// reschedules included.
  pub fn schedulings(&self) -> Vec<Duration> { self.0.lock().schedulings.clone() }

  /// Virtual times (as offsets from the start) at which tasks ran.
  pub fn executions(&self) -> Vec<Duration> { self.0.lock().executions.clone() }

  /// Number of tasks waiting in the queue.
  pub fn pending_count(&self) -> usize { self.0.lock().queue.len() }
}

impl Scheduler for TestScheduler {
  type Worker = TestWorker;

  fn create_worker(&self) -> TestWorker { TestWorker(self.0.clone()) }

  fn now(&self) -> Instant { self.0.lock().now }
}

impl Worker for TestWorker {
  fn now(&self) -> Instant { self.0.lock().now }

  fn defer(&self, task: Schedulable) {
    {
      let mut state = self.0.lock();
      let at = state.offset(task.time_point());
      state.schedulings.push(at);
      state.queue.push(task);
    }
    drain(&self.0);
  }
}

// Runs due tasks without holding the lock. A drain already in progress
// picks up whatever nested calls enqueue.
fn drain(shared: &Mutex<State>) {
  {
    let mut state = shared.lock();
    if state.draining {
      return;
    }
    state.draining = true;
  }
  loop {
    let (mut task, now) = {
      let mut state = shared.lock();
      let now = state.now;
      match state.queue.pop_ready(now) {
        Some(task) => (task, now),
        None => {
          state.draining = false;
          return;
        }
      }
    };
    if task.is_disposed() {
      continue;
    }
    {
      let mut state = shared.lock();
      let offset = state.offset(now);
      state.executions.push(offset);
    }
    let next = {
      // Reset the flag if the task unwinds through here.
      let reset = ResetDraining(shared);
      let next = task.run(|| now);
      std::mem::forget(reset);
      next
    };
    if let Some(at) = next {
      let mut state = shared.lock();
      let at = at.max(state.now);
      let offset = state.offset(at);
      state.schedulings.push(offset);
      task.set_time_point(at);
      state.queue.push(task);
    }
  }
}

struct ResetDraining<'a>(&'a Mutex<State>);

impl Drop for ResetDraining<'_> {
  fn drop(&mut self) { self.0.lock().draining = false }
}
