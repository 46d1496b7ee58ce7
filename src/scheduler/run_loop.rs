use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Instant,
};

use parking_lot::{Condvar, Mutex};

use super::{Schedulable, SchedulablesQueue, Scheduler, Worker};
use crate::disposable::Disposable;

/// A queue pumped by the embedding application.
///
/// Schedulables from every worker of a run loop go into one queue; they run
/// only when the owner calls [`dispatch`](Self::dispatch) or
/// [`dispatch_if_ready`](Self::dispatch_if_ready), on the owner's thread.
#[derive(Clone, Default)]
pub struct RunLoop(Arc<Shared>);

#[derive(Default)]
struct Shared {
  queue: Mutex<SchedulablesQueue>,
  wake: Condvar,
  disposed: AtomicBool,
}

#[derive(Clone)]
pub struct RunLoopWorker(Arc<Shared>);

impl RunLoop {
  pub fn new() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.0.queue.lock().is_empty() }

  /// Runs the next schedulable if it is due. Returns whether one ran.
  pub fn dispatch_if_ready(&self) -> bool {
    let task = self.0.queue.lock().pop_ready(Instant::now());
    match task {
      Some(task) => {
        self.execute(task);
        true
      }
      None => false,
    }
  }

  /// Blocks until a schedulable is due and runs it. Returns immediately once
  /// the run loop is disposed.
  pub fn dispatch(&self) {
    let task = {
      let mut queue = self.0.queue.lock();
      loop {
        if self.0.disposed.load(Ordering::Acquire) {
          return;
        }
        match queue.next_time_point() {
          None => self.0.wake.wait(&mut queue),
          Some(at) if at <= Instant::now() => break queue.pop(),
          Some(at) => {
            self.0.wake.wait_until(&mut queue, at);
          }
        }
      }
    };
    if let Some(task) = task {
      self.execute(task);
    }
  }

  fn execute(&self, mut task: Schedulable) {
    if task.is_disposed() {
      return;
    }
    if let Some(at) = task.run(Instant::now) {
      task.set_time_point(at);
      self.0.queue.lock().push(task);
    }
  }
}

impl Disposable for RunLoop {
  fn dispose(&self) {
    if self.0.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let leftover = self.0.queue.lock().take_all();
    self.0.wake.notify_all();
    drop(leftover);
    tracing::debug!(target: "rxplus", "run loop disposed");
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.disposed.load(Ordering::Acquire) }
}

impl Scheduler for RunLoop {
  type Worker = RunLoopWorker;

  fn create_worker(&self) -> RunLoopWorker { RunLoopWorker(self.0.clone()) }
}

impl Worker for RunLoopWorker {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn defer(&self, task: Schedulable) {
    if self.0.disposed.load(Ordering::Acquire) || task.is_disposed() {
      return;
    }
    self.0.queue.lock().push(task);
    self.0.wake.notify_one();
  }
}
