use std::time::Instant;

use super::{sleep_until, Schedulable, Scheduler, Worker};

/// Runs every schedulable on the calling thread, before `schedule` returns.
///
/// A schedulable asking to run again is looped over in place, sleeping until
/// its next time point. Scheduling from inside a running schedulable runs the
/// nested one right away, like a plain function call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateWorker;

impl Scheduler for Immediate {
  type Worker = ImmediateWorker;

  #[inline]
  fn create_worker(&self) -> ImmediateWorker { ImmediateWorker }
}

impl Worker for ImmediateWorker {
  #[inline]
  fn now(&self) -> Instant { Instant::now() }

  fn defer(&self, mut task: Schedulable) {
    loop {
      if task.is_disposed() {
        return;
      }
      sleep_until(task.time_point());
      if task.is_disposed() {
        return;
      }
      match task.run(Instant::now) {
        Some(at) => task.set_time_point(at),
        None => return,
      }
    }
  }
}
