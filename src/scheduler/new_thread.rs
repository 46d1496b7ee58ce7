use std::{
  sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
  },
  thread::{self, JoinHandle, ThreadId},
  time::Instant,
};

use once_cell::sync::OnceCell;
use parking_lot::{Condvar, Mutex};

use super::{Schedulable, SchedulablesQueue, Scheduler, Worker};
use crate::disposable::{Disposable, DisposableHandle};

static THREAD_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Spawns one dedicated thread per worker.
///
/// All schedulables of a worker run on its thread, in queue order. The
/// thread stops when the worker's disposable is disposed, or once every
/// clone of the worker is dropped and its queue is drained.
#[derive(Debug, Clone, Default)]
pub struct NewThread {
  name: Option<Arc<str>>,
}

impl NewThread {
  pub fn new() -> Self { Self::default() }

  /// Worker threads are named `{prefix}-{n}`.
  pub fn with_name(prefix: impl Into<Arc<str>>) -> Self { NewThread { name: Some(prefix.into()) } }
}

impl Scheduler for NewThread {
  type Worker = NewThreadWorker;

  fn create_worker(&self) -> NewThreadWorker {
    let prefix = self.name.as_deref().unwrap_or("rxplus-worker");
    NewThreadWorker::spawn(format!("{prefix}-{}", THREAD_COUNTER.fetch_add(1, Ordering::Relaxed)))
  }
}

struct State {
  queue: SchedulablesQueue,
  // Set while the thread runs a schedulable outside the lock.
  running: bool,
  released: bool,
}

struct Shared {
  state: Mutex<State>,
  wake: Condvar,
  disposed: AtomicBool,
  thread_id: OnceCell<ThreadId>,
  join: Mutex<Option<JoinHandle<()>>>,
}

// Dropped with the last clone of a worker.
struct Owner(Arc<Shared>);

impl Drop for Owner {
  fn drop(&mut self) {
    self.0.state.lock().released = true;
    self.0.wake.notify_one();
  }
}

/// Handle to one dedicated thread.
#[derive(Clone)]
pub struct NewThreadWorker {
  owner: Arc<Owner>,
}

impl NewThreadWorker {
  fn spawn(name: String) -> Self {
    let shared = Arc::new(Shared {
      state: Mutex::new(State { queue: SchedulablesQueue::new(), running: false, released: false }),
      wake: Condvar::new(),
      disposed: AtomicBool::new(false),
      thread_id: OnceCell::new(),
      join: Mutex::new(None),
    });

    let c_shared = shared.clone();
    match thread::Builder::new().name(name.clone()).spawn(move || run(c_shared)) {
      Ok(handle) => {
        let _ = shared.thread_id.set(handle.thread().id());
        *shared.join.lock() = Some(handle);
        tracing::debug!(target: "rxplus", thread = %name, "worker thread started");
      }
      Err(err) => {
        tracing::error!(target: "rxplus", thread = %name, error = %err, "failed to spawn worker thread");
        shared.disposed.store(true, Ordering::Release);
      }
    }
    NewThreadWorker { owner: Arc::new(Owner(shared)) }
  }

  fn shared(&self) -> &Arc<Shared> { &self.owner.0 }

  /// Whether the current thread is this worker's thread.
  pub fn is_current(&self) -> bool { self.shared().thread_id.get() == Some(&thread::current().id()) }

  /// Disposable stopping the worker thread.
  pub fn stopper(&self) -> WorkerStopper { WorkerStopper(self.shared().clone()) }
}

impl Worker for NewThreadWorker {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn defer(&self, task: Schedulable) {
    let shared = self.shared();
    if shared.disposed.load(Ordering::Acquire) || task.is_disposed() {
      return;
    }
    shared.state.lock().queue.push(task);
    shared.wake.notify_one();
  }

  fn disposable(&self) -> Option<DisposableHandle> { Some(Arc::new(self.stopper())) }
}

fn run(shared: Arc<Shared>) {
  loop {
    let mut task = {
      let mut state = shared.state.lock();
      loop {
        if shared.disposed.load(Ordering::Acquire) {
          drop(state);
          return finish(&shared);
        }
        match state.queue.next_time_point() {
          None if state.released => {
            drop(state);
            return finish(&shared);
          }
          None => shared.wake.wait(&mut state),
          Some(at) if at <= Instant::now() => {
            if let Some(task) = state.queue.pop() {
              state.running = true;
              break task;
            }
          }
          Some(at) => {
            shared.wake.wait_until(&mut state, at);
          }
        }
      }
    };

    let next = if task.is_disposed() { None } else { task.run(Instant::now) };

    let mut state = shared.state.lock();
    state.running = false;
    if let Some(at) = next {
      task.set_time_point(at);
      state.queue.push(task);
    } else {
      drop(state);
      drop(task);
    }
  }
}

fn finish(shared: &Shared) {
  let leftover = shared.state.lock().queue.take_all();
  drop(leftover);
  tracing::debug!(
    target: "rxplus",
    thread = thread::current().name().unwrap_or_default(),
    "worker thread stopped"
  );
}

/// Stops a [`NewThreadWorker`]'s thread.
///
/// Pending schedulables are dropped. The thread is joined when it is idle,
/// otherwise (including disposal from the worker thread itself) it is
/// detached and exits right after the schedulable it is running.
pub struct WorkerStopper(Arc<Shared>);

impl Disposable for WorkerStopper {
  fn dispose(&self) {
    let shared = &self.0;
    if shared.disposed.swap(true, Ordering::AcqRel) {
      return;
    }
    let (busy, leftover) = {
      let mut state = shared.state.lock();
      (state.running, state.queue.take_all())
    };
    shared.wake.notify_all();
    drop(leftover);

    let on_own_thread = shared.thread_id.get() == Some(&thread::current().id());
    let handle = shared.join.lock().take();
    if let Some(handle) = handle {
      if !busy && !on_own_thread {
        let _ = handle.join();
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.disposed.load(Ordering::Acquire) }
}

#[cfg(test)]
mod tests {
  use std::{sync::mpsc, time::Duration};

  use super::*;
  use crate::{
    disposable::CompositeDisposable,
    scheduler::{Delay, WorkerExt},
  };

  #[test]
  fn runs_on_dedicated_thread() {
    let worker = NewThread::with_name("test-pool").create_worker();
    let (tx, rx) = mpsc::channel();
    worker.schedule_once(Duration::ZERO, CompositeDisposable::new(), move |_| {
      let _ = tx.send(thread::current().name().map(str::to_owned));
    });
    let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(name.starts_with("test-pool-"));
    assert_ne!(thread::current().id(), worker.shared().thread_id.get().copied().unwrap());
  }

  #[test]
  fn keeps_queue_order() {
    let worker = NewThread::new().create_worker();
    let (tx, rx) = mpsc::channel();
    let at = Instant::now() + Duration::from_millis(20);
    for i in 0..10 {
      let tx = tx.clone();
      worker.schedule_at(at, CompositeDisposable::new(), move |_| {
        let _ = tx.send(i);
        None
      });
    }
    let got: Vec<_> = (0..10).map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap()).collect();
    assert_eq!(got, (0..10).collect::<Vec<_>>());
  }

  #[test]
  fn disposing_handle_stops_recurring_task() {
    let worker = NewThread::new().create_worker();
    let handle = CompositeDisposable::new();
    let (tx, rx) = mpsc::channel();
    worker.schedule(Duration::ZERO, handle.clone(), move |_| {
      let _ = tx.send(());
      Some(Delay::FromNow(Duration::from_millis(1)))
    });
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    handle.dispose();
    // Drain whatever was in flight, then the channel must go quiet.
    thread::sleep(Duration::from_millis(20));
    while rx.try_recv().is_ok() {}
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
  }

  #[test]
  fn dispose_from_worker_thread_detaches() {
    let worker = NewThread::new().create_worker();
    let stopper = worker.stopper();
    let (tx, rx) = mpsc::channel();
    worker.schedule_once(Duration::ZERO, CompositeDisposable::new(), move |_| {
      stopper.dispose();
      let _ = tx.send(stopper.is_disposed());
    });
    assert!(rx.recv_timeout(Duration::from_secs(5)).unwrap());
  }

  #[test]
  fn thread_exits_after_last_handle_dropped() {
    let worker = NewThread::new().create_worker();
    let shared = worker.shared().clone();
    drop(worker);
    let handle = shared.join.lock().take().unwrap();
    handle.join().unwrap();
  }
}
