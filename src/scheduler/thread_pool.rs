use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
  time::Instant,
};

use super::{NewThread, NewThreadWorker, Schedulable, Scheduler, Worker};

/// A fixed set of worker threads handed out round-robin.
///
/// Workers created from a pool share its threads, so disposing a
/// subscription never stops a pool thread. The threads exit once the pool
/// and every worker taken from it are dropped.
#[derive(Clone)]
pub struct ThreadPool {
  threads: Arc<[NewThreadWorker]>,
  next: Arc<AtomicUsize>,
}

impl ThreadPool {
  /// A pool with `size` threads (at least one).
  pub fn new(size: usize) -> Self {
    let spawner = NewThread::with_name("rxplus-pool");
    let threads: Vec<_> = (0..size.max(1)).map(|_| spawner.create_worker()).collect();
    ThreadPool { threads: threads.into(), next: Arc::new(AtomicUsize::new(0)) }
  }

  pub fn size(&self) -> usize { self.threads.len() }
}

impl Default for ThreadPool {
  /// One thread per available core.
  fn default() -> Self { Self::new(thread::available_parallelism().map_or(1, |n| n.get())) }
}

impl Scheduler for ThreadPool {
  type Worker = ThreadPoolWorker;

  fn create_worker(&self) -> ThreadPoolWorker {
    let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.threads.len();
    ThreadPoolWorker(self.threads[idx].clone())
  }
}

/// One pool thread, borrowed by a subscription.
#[derive(Clone)]
pub struct ThreadPoolWorker(NewThreadWorker);

impl Worker for ThreadPoolWorker {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  #[inline]
  fn defer(&self, task: Schedulable) { self.0.defer(task) }
}
