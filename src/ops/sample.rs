use std::{sync::Arc, time::Duration};

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{bind_worker, gate, Gate},
  scheduler::{Delay, Scheduler, WorkerExt},
};

/// Emits the newest value not emitted yet once every `period`.
///
/// Completion emits a value still waiting for its tick.
#[derive(Debug, Clone)]
pub struct Sample<S> {
  period: Duration,
  scheduler: S,
}

pub fn sample<S: Scheduler>(period: Duration, scheduler: S) -> Sample<S> { Sample { period, scheduler } }

struct Shared<T> {
  down: Subscriber<T>,
  latest: Gate<Option<T>>,
}

impl<T: Send + 'static> Shared<T> {
  fn flush(&self) {
    let lock = self.latest.lock();
    let value = lock.borrow_mut().take();
    if let Some(value) = value {
      self.down.on_next(value);
    }
  }
}

impl<T: Send + 'static, S: Scheduler> Operator<T> for Sample<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let Sample { period, scheduler } = self;
    source.lift(move |down: Subscriber<T>| {
      let worker = bind_worker(&scheduler, &down);
      let shared = Arc::new(Shared { down: down.clone(), latest: gate(None) });
      let tick = shared.clone();
      worker.schedule(period, down, move |_| {
        tick.flush();
        Some(Delay::FromThisTimepoint(period))
      });
      SampleObserver(shared)
    })
  }
}

struct SampleObserver<T>(Arc<Shared<T>>);

impl<T: Send + 'static> Observer<T> for SampleObserver<T> {
  fn on_next(&mut self, value: T) {
    let lock = self.0.latest.lock();
    *lock.borrow_mut() = Some(value);
  }

  fn on_error(&mut self, err: RxError) { self.0.down.on_error(err) }

  fn on_completed(&mut self) {
    self.0.flush();
    self.0.down.on_completed();
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn sample<S: Scheduler>(self, period: Duration, scheduler: S) -> Observable<T> {
    self.pipe(sample(period, scheduler))
  }
}
