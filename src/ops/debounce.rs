use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{bind_worker, gate, Gate},
  scheduler::{Delay, Scheduler, Worker, WorkerExt},
};

/// Emits a value only after `period` passed without another value.
///
/// Completion flushes the pending value; an error discards it.
#[derive(Debug, Clone)]
pub struct Debounce<S> {
  period: Duration,
  scheduler: S,
}

pub fn debounce<S: Scheduler>(period: Duration, scheduler: S) -> Debounce<S> { Debounce { period, scheduler } }

struct Pending<T> {
  value: Option<T>,
  due: Instant,
  // A firing task is queued on the worker.
  scheduled: bool,
}

struct Shared<T, W> {
  down: Subscriber<T>,
  worker: W,
  state: Gate<Pending<T>>,
}

impl<T: Send + 'static, S: Scheduler> Operator<T> for Debounce<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let Debounce { period, scheduler } = self;
    source.lift(move |down: Subscriber<T>| {
      let worker = bind_worker(&scheduler, &down);
      let due = worker.now();
      DebounceObserver {
        period,
        shared: Arc::new(Shared { down, worker, state: gate(Pending { value: None, due, scheduled: false }) }),
      }
    })
  }
}

struct DebounceObserver<T, W> {
  period: Duration,
  shared: Arc<Shared<T, W>>,
}

impl<T: Send + 'static, W: Worker + 'static> Shared<T, W> {
  // Runs on the worker when the firing task is due.
  fn fire(&self) -> Option<Delay> {
    let lock = self.state.lock();
    let value = {
      let mut pending = lock.borrow_mut();
      if pending.value.is_some() && self.worker.now() < pending.due {
        return Some(Delay::To(pending.due));
      }
      pending.scheduled = false;
      pending.value.take()
    };
    if let Some(value) = value {
      self.down.on_next(value);
    }
    None
  }
}

impl<T: Send + 'static, W: Worker + 'static> Observer<T> for DebounceObserver<T, W> {
  fn on_next(&mut self, value: T) {
    let shared = &self.shared;
    let due = shared.worker.now() + self.period;
    let schedule = {
      let lock = shared.state.lock();
      let mut pending = lock.borrow_mut();
      pending.value = Some(value);
      pending.due = due;
      !std::mem::replace(&mut pending.scheduled, true)
    };
    if schedule {
      let task = shared.clone();
      shared.worker.schedule_at(due, shared.down.clone(), move |_| task.fire());
    }
  }

  fn on_error(&mut self, err: RxError) {
    let lock = self.shared.state.lock();
    lock.borrow_mut().value = None;
    self.shared.down.on_error(err);
  }

  fn on_completed(&mut self) {
    let lock = self.shared.state.lock();
    let value = lock.borrow_mut().value.take();
    if let Some(value) = value {
      self.shared.down.on_next(value);
    }
    self.shared.down.on_completed();
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn debounce<S: Scheduler>(self, period: Duration, scheduler: S) -> Observable<T> {
    self.pipe(debounce(period, scheduler))
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::{scheduler::TestScheduler, subject::PublishSubject};

  fn record(scheduler: &TestScheduler, source: &PublishSubject<i32>) -> Arc<Mutex<Vec<(Duration, i32)>>> {
    let log = Arc::new(Mutex::new(vec![]));
    let (c_log, c_done) = (log.clone(), log.clone());
    let (clock, done_clock) = (scheduler.clone(), scheduler.clone());
    source.observable().debounce(Duration::from_secs(2), scheduler.clone()).subscribe_all(
      move |v| c_log.lock().push((clock.elapsed(), v)),
      |_| {},
      move || c_done.lock().push((done_clock.elapsed(), -1)),
    );
    log
  }

  #[test]
  fn collapses_bursts() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::new();
    let log = record(&scheduler, &source);

    source.next(1);
    scheduler.time_advance(Duration::from_secs(1));
    source.next(2);
    for _ in 0..4 {
      scheduler.time_advance(Duration::from_secs(1));
    }

    assert_eq!(*log.lock(), vec![(Duration::from_secs(3), 2)]);
  }

  #[test]
  fn completion_flushes_pending_value() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::new();
    let log = record(&scheduler, &source);

    source.next(1);
    source.complete();
    assert_eq!(*log.lock(), vec![(Duration::ZERO, 1), (Duration::ZERO, -1)]);
    scheduler.time_advance(Duration::from_secs(5));
    assert_eq!(log.lock().len(), 2);
  }

  #[test]
  fn error_discards_pending_value() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::new();
    let log = record(&scheduler, &source);

    source.next(1);
    source.error("gone");
    scheduler.time_advance(Duration::from_secs(5));
    assert!(log.lock().is_empty());
  }

  #[test]
  fn quiet_values_pass_separately() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::new();
    let log = record(&scheduler, &source);

    source.next(1);
    scheduler.time_advance(Duration::from_secs(2));
    scheduler.time_advance(Duration::from_secs(1));
    source.next(2);
    scheduler.time_advance(Duration::from_secs(2));

    assert_eq!(*log.lock(), vec![(Duration::from_secs(2), 1), (Duration::from_secs(5), 2)]);
  }
}
