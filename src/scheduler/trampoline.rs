use std::{cell::RefCell, time::Instant};

use super::{sleep_until, Schedulable, SchedulablesQueue, Scheduler, Worker};

thread_local! {
  // `Some` while a call on this thread owns the queue and drains it.
  static QUEUE: RefCell<Option<SchedulablesQueue>> = const { RefCell::new(None) };
}

/// Queues work on the calling thread.
///
/// The first `schedule` on a thread claims the thread-local queue and drains
/// it before returning. Schedulables submitted while the queue is claimed are
/// only enqueued, so recursive scheduling never grows the stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trampoline;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrampolineWorker;

impl Scheduler for Trampoline {
  type Worker = TrampolineWorker;

  #[inline]
  fn create_worker(&self) -> TrampolineWorker { TrampolineWorker }
}

impl Trampoline {
  /// Whether a call on the current thread is draining the queue.
  pub fn is_queue_owned() -> bool { QUEUE.with(|q| q.borrow().is_some()) }
}

struct Claim;

impl Drop for Claim {
  fn drop(&mut self) {
    let leftover = QUEUE.with(|q| q.borrow_mut().take());
    // Only left over when a schedulable unwound through the drain.
    drop(leftover);
  }
}

fn is_queue_empty() -> bool { QUEUE.with(|q| q.borrow().as_ref().map_or(true, |q| q.is_empty())) }

fn enqueue(task: Schedulable) {
  QUEUE.with(|q| {
    if let Some(queue) = q.borrow_mut().as_mut() {
      queue.push(task)
    }
  })
}

fn pop() -> Option<Schedulable> { QUEUE.with(|q| q.borrow_mut().as_mut().and_then(|q| q.pop())) }

impl Worker for TrampolineWorker {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn defer(&self, task: Schedulable) {
    if task.is_disposed() {
      return;
    }
    let task = QUEUE.with(|q| {
      let mut q = q.borrow_mut();
      match q.as_mut() {
        Some(queue) => {
          queue.push(task);
          None
        }
        None => {
          *q = Some(SchedulablesQueue::new());
          Some(task)
        }
      }
    });
    let Some(mut task) = task else { return };
    let _claim = Claim;

    // Nothing else is waiting yet: run the first schedulable in place.
    loop {
      sleep_until(task.time_point());
      if task.is_disposed() {
        break;
      }
      match task.run(Instant::now) {
        Some(at) => {
          task.set_time_point(at);
          if !is_queue_empty() {
            enqueue(task);
            break;
          }
        }
        None => break,
      }
    }

    while let Some(mut task) = pop() {
      if task.is_disposed() {
        tracing::trace!(target: "rxplus", "dropped disposed schedulable");
        continue;
      }
      sleep_until(task.time_point());
      if task.is_disposed() {
        continue;
      }
      if let Some(at) = task.run(Instant::now) {
        task.set_time_point(at);
        enqueue(task);
      }
    }
  }
}
