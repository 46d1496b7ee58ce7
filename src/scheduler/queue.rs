use std::{collections::BinaryHeap, time::Instant};

use super::Schedulable;

/// Priority queue of schedulables: earliest time point first, FIFO among
/// equal time points.
///
/// Every insertion takes a fresh sequence number, so a rescheduled task
/// queues behind tasks already waiting for the same time point.
#[derive(Debug, Default)]
pub struct SchedulablesQueue {
  heap: BinaryHeap<Schedulable>,
  next_seq: u64,
}

impl SchedulablesQueue {
  pub fn new() -> Self { Self::default() }

  pub fn push(&mut self, mut task: Schedulable) {
    task.seq = self.next_seq;
    self.next_seq += 1;
    self.heap.push(task);
  }

  #[inline]
  pub fn pop(&mut self) -> Option<Schedulable> { self.heap.pop() }

  /// Time point of the next schedulable.
  #[inline]
  pub fn next_time_point(&self) -> Option<Instant> { self.heap.peek().map(|t| t.at) }

  /// Pops the next schedulable if it is due at `now`.
  pub fn pop_ready(&mut self, now: Instant) -> Option<Schedulable> {
    match self.next_time_point() {
      Some(at) if at <= now => self.heap.pop(),
      _ => None,
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool { self.heap.is_empty() }

  #[inline]
  pub fn len(&self) -> usize { self.heap.len() }

  /// Removes every schedulable, handing them back so they can be dropped
  /// outside of any lock.
  pub fn take_all(&mut self) -> Vec<Schedulable> { std::mem::take(&mut self.heap).into_vec() }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::Arc,
    time::{Duration, Instant},
  };

  use parking_lot::Mutex;

  use super::*;
  use crate::disposable::CompositeDisposable;

  fn recording(at: Instant, log: &Arc<Mutex<Vec<u32>>>, id: u32) -> Schedulable {
    let log = log.clone();
    Schedulable::new(at, CompositeDisposable::new(), move |_| {
      log.lock().push(id);
      None
    })
  }

  #[test]
  fn equal_time_points_run_fifo() {
    let log = Arc::new(Mutex::new(vec![]));
    let now = Instant::now();
    let mut queue = SchedulablesQueue::new();
    for id in 0..5 {
      queue.push(recording(now, &log, id));
    }
    while let Some(mut task) = queue.pop() {
      task.run(Instant::now);
    }
    assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
  }

  #[test]
  fn earlier_first() {
    let log = Arc::new(Mutex::new(vec![]));
    let now = Instant::now();
    let mut queue = SchedulablesQueue::new();
    queue.push(recording(now + Duration::from_secs(2), &log, 2));
    queue.push(recording(now + Duration::from_secs(1), &log, 1));
    queue.push(recording(now + Duration::from_secs(2), &log, 3));
    queue.push(recording(now, &log, 0));

    assert!(queue.pop_ready(now - Duration::from_millis(1)).is_none());
    while let Some(mut task) = queue.pop() {
      task.run(Instant::now);
    }
    assert_eq!(*log.lock(), vec![0, 1, 2, 3]);
  }

  #[test]
  fn reinsert_goes_behind_equal_time_points() {
    let log = Arc::new(Mutex::new(vec![]));
    let now = Instant::now();
    let mut queue = SchedulablesQueue::new();
    queue.push(recording(now, &log, 0));
    queue.push(recording(now, &log, 1));

    let mut first = queue.pop().unwrap();
    first.run(Instant::now);
    queue.push(first);
    while let Some(mut task) = queue.pop() {
      task.run(Instant::now);
    }
    assert_eq!(*log.lock(), vec![0, 1, 0]);
  }
}
