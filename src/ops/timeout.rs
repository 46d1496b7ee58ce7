use std::{
  sync::Arc,
  time::{Duration, Instant},
};

use parking_lot::Mutex;

use crate::{
  disposable::SerialDisposable,
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{bind_worker, Forward},
  scheduler::{Delay, Scheduler, Worker, WorkerExt},
};

/// Fails with [`RxError::Timeout`], or switches to a fallback observable,
/// when no notification arrives within `period` of subscription or of the
/// previous value.
#[derive(Debug, Clone)]
pub struct Timeout<T, S> {
  period: Duration,
  fallback: Option<Observable<T>>,
  scheduler: S,
}

pub fn timeout<T, S: Scheduler>(period: Duration, scheduler: S) -> Timeout<T, S> {
  Timeout { period, fallback: None, scheduler }
}

pub fn timeout_with<T, S: Scheduler>(period: Duration, fallback: Observable<T>, scheduler: S) -> Timeout<T, S> {
  Timeout { period, fallback: Some(fallback), scheduler }
}

struct Deadline {
  at: Instant,
  // Set once the source terminated or the timeout fired.
  done: bool,
}

struct Shared<T, W> {
  down: Subscriber<T>,
  worker: W,
  upstream: SerialDisposable,
  fallback: Option<Observable<T>>,
  deadline: Mutex<Deadline>,
}

impl<T: Send + 'static, W: Worker + 'static> Shared<T, W> {
  fn check(&self) -> Option<Delay> {
    {
      let mut deadline = self.deadline.lock();
      if deadline.done {
        return None;
      }
      if self.worker.now() < deadline.at {
        return Some(Delay::To(deadline.at));
      }
      deadline.done = true;
    }
    match &self.fallback {
      Some(fallback) => {
        let up = Subscriber::new(Forward(self.down.clone()));
        self.upstream.set(up.disposable().to_handle());
        fallback.subscribe_with(up);
      }
      None => self.down.on_error(RxError::Timeout),
    }
    None
  }

  // Returns false once the timeout fired.
  fn settle(&self, terminal: bool) -> bool {
    let mut deadline = self.deadline.lock();
    if deadline.done {
      return false;
    }
    if terminal {
      deadline.done = true;
    }
    true
  }
}

impl<T: Send + 'static, S: Scheduler> Operator<T> for Timeout<T, S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let Timeout { period, fallback, scheduler } = self;
    Observable::create(move |down: Subscriber<T>| {
      let worker = bind_worker(&scheduler, &down);
      let upstream = SerialDisposable::new();
      down.set_upstream(upstream.clone());
      let at = worker.now() + period;
      let shared = Arc::new(Shared {
        down: down.clone(),
        worker,
        upstream,
        fallback: fallback.clone(),
        deadline: Mutex::new(Deadline { at, done: false }),
      });

      let task = shared.clone();
      shared.worker.schedule_at(at, down, move |_| task.check());

      let up = Subscriber::new(TimeoutObserver { shared: shared.clone(), period });
      shared.upstream.set(up.disposable().to_handle());
      source.subscribe_with(up);
    })
  }
}

struct TimeoutObserver<T, W> {
  shared: Arc<Shared<T, W>>,
  period: Duration,
}

impl<T: Send + 'static, W: Worker + 'static> Observer<T> for TimeoutObserver<T, W> {
  fn on_next(&mut self, value: T) {
    {
      let mut deadline = self.shared.deadline.lock();
      if deadline.done {
        return;
      }
      deadline.at = self.shared.worker.now() + self.period;
    }
    self.shared.down.on_next(value);
  }

  fn on_error(&mut self, err: RxError) {
    if self.shared.settle(true) {
      self.shared.down.on_error(err);
    }
  }

  fn on_completed(&mut self) {
    if self.shared.settle(true) {
      self.shared.down.on_completed();
    }
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn timeout<S: Scheduler>(self, period: Duration, scheduler: S) -> Observable<T> {
    self.pipe(timeout(period, scheduler))
  }

  pub fn timeout_with<S: Scheduler>(self, period: Duration, fallback: Observable<T>, scheduler: S) -> Observable<T> {
    self.pipe(timeout_with(period, fallback, scheduler))
  }
}
