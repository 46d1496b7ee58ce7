use std::time::Duration;

use crate::{
  observable::Observable,
  observer::Subscriber,
  scheduler::{Delay, Scheduler, Worker, WorkerExt},
};

/// Emits `0, 1, 2, ...` every `period`, starting one period after
/// subscription. Ticks stay aligned to the subscription time.
pub fn interval<S: Scheduler>(period: Duration, scheduler: S) -> Observable<usize> {
  Observable::create(move |s: Subscriber<usize>| {
    let worker = scheduler.create_worker();
    if let Some(d) = worker.disposable() {
      s.set_upstream(d);
    }
    let mut tick = 0;
    worker.schedule(period, s, move |s| {
      s.on_next(tick);
      tick += 1;
      Some(Delay::FromThisTimepoint(period))
    });
  })
}

/// Emits `0` once after `delay`, then completes.
pub fn timer<S: Scheduler>(delay: Duration, scheduler: S) -> Observable<usize> {
  Observable::create(move |s: Subscriber<usize>| {
    let worker = scheduler.create_worker();
    if let Some(d) = worker.disposable() {
      s.set_upstream(d);
    }
    worker.schedule_once(delay, s, |s| {
      s.on_next(0);
      s.on_completed();
    });
  })
}
