//! Resubscription after errors.
//!
//! A source failing synchronously inside its own subscribe call does not
//! resubscribe recursively: the request is recorded and picked up by the loop
//! that is still subscribing, so the stack stays flat however many attempts
//! fail in a row.
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  disposable::SerialDisposable,
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  Idle,
  Subscribing,
  // Another attempt was requested while still subscribing.
  Requested,
}

/// Owns the current attempt of a source that is subscribed again and again.
pub(crate) struct Resubscriber<T> {
  source: Observable<T>,
  pub(crate) down: Subscriber<T>,
  attempt: SerialDisposable,
  stage: Mutex<Stage>,
}

impl<T: Send + 'static> Resubscriber<T> {
  pub(crate) fn new(source: Observable<T>, down: Subscriber<T>) -> Self {
    let attempt = SerialDisposable::new();
    down.set_upstream(attempt.clone());
    Resubscriber { source, down, attempt, stage: Mutex::new(Stage::Idle) }
  }

  /// Subscribes a fresh observer built by `make`, replacing the previous
  /// attempt.
  pub(crate) fn subscribe<O: Observer<T>>(&self, make: impl Fn() -> O) {
    {
      let mut stage = self.stage.lock();
      if *stage != Stage::Idle {
        *stage = Stage::Requested;
        return;
      }
      *stage = Stage::Subscribing;
    }
    loop {
      if self.down.is_disposed() {
        *self.stage.lock() = Stage::Idle;
        return;
      }
      let up = Subscriber::new(make());
      self.attempt.set(up.disposable().to_handle());
      self.source.subscribe_with(up);

      let mut stage = self.stage.lock();
      if *stage == Stage::Requested {
        *stage = Stage::Subscribing;
        tracing::trace!(target: "rxplus", "resubscribing");
        continue;
      }
      *stage = Stage::Idle;
      return;
    }
  }
}

/// Resubscribes to the source when it fails, up to a number of times or
/// forever.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
  // `None` retries forever.
  count: Option<usize>,
}

/// Retries at most `count` times; the error of the last attempt is
/// forwarded.
pub fn retry(count: usize) -> Retry { Retry { count: Some(count) } }

pub fn retry_forever() -> Retry { Retry { count: None } }

struct Coordinator<T> {
  resubscriber: Resubscriber<T>,
  remaining: Mutex<Option<usize>>,
}

impl<T: Send + 'static> Operator<T> for Retry {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let count = self.count;
    Observable::create(move |down: Subscriber<T>| {
      let coordinator =
        Arc::new(Coordinator { resubscriber: Resubscriber::new(source.clone(), down), remaining: Mutex::new(count) });
      coordinator.resubscriber.subscribe(|| RetryObserver(coordinator.clone()));
    })
  }
}

struct RetryObserver<T>(Arc<Coordinator<T>>);

impl<T: Send + 'static> Observer<T> for RetryObserver<T> {
  #[inline]
  fn on_next(&mut self, value: T) { self.0.resubscriber.down.on_next(value) }

  fn on_error(&mut self, err: RxError) {
    let again = match &mut *self.0.remaining.lock() {
      Some(0) => false,
      Some(n) => {
        *n -= 1;
        true
      }
      None => true,
    };
    if again {
      let coordinator = self.0.clone();
      self.0.resubscriber.subscribe(|| RetryObserver(coordinator.clone()));
    } else {
      self.0.resubscriber.down.on_error(err);
    }
  }

  fn on_completed(&mut self) { self.0.resubscriber.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn retry(self, count: usize) -> Observable<T> { self.pipe(retry(count)) }

  pub fn retry_forever(self) -> Observable<T> { self.pipe(retry_forever()) }
}
