//! The [`Observable`] type and source factories.
//!
//! An observable stores its subscription strategy: a closure driving the
//! [`Subscriber`] handed to it. Subscribing invokes the strategy; operators
//! wrap it through [`Observable::lift`] and are attached with
//! [`Observable::pipe`] or the `|` operator.
//!
//! ```
//! use rxplus::prelude::*;
//!
//! let mut got = vec![];
//! observable::from_iter(1..=4)
//!   .filter(|v| v % 2 == 0)
//!   .map(|v| v * 10)
//!   .subscribe(move |v| got.push(v));
//! ```
use std::{
  fmt::{Debug, Formatter},
  ops::BitOr,
  panic::{self, AssertUnwindSafe},
  sync::Arc,
};

use crate::{
  disposable::CompositeDisposable,
  error::RxError,
  observer::{log_unhandled, LambdaObserver, Observer, Subscriber},
};

mod connectable;
mod create;
mod defer;
mod from_iter;
mod interval;
#[cfg(feature = "futures-interop")]
mod stream;
mod trivial;

pub use connectable::ConnectableObservable;
pub use create::create;
pub use defer::defer;
pub use from_iter::{from_iter, just};
pub use interval::{interval, timer};
#[cfg(feature = "futures-interop")]
pub use stream::BlockingIter;
pub use trivial::{empty, never, throw};

pub use crate::ops::{concat::concat, merge::merge};

type OnSubscribe<T> = dyn Fn(Subscriber<T>) + Send + Sync;

/// A push-based source of `T`.
///
/// Cheap to clone: clones share the subscription strategy.
pub struct Observable<T> {
  on_subscribe: Arc<OnSubscribe<T>>,
}

/// A transformation applied to an observable with [`Observable::pipe`] or
/// `|`.
pub trait Operator<T> {
  type Output;

  fn apply(self, source: Observable<T>) -> Self::Output;
}

impl<T> Clone for Observable<T> {
  fn clone(&self) -> Self { Observable { on_subscribe: self.on_subscribe.clone() } }
}

impl<T> Debug for Observable<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result { f.write_str("Observable") }
}

impl<T: Send + 'static> Observable<T> {
  /// An observable running `on_subscribe` for every subscriber.
  pub fn create<F>(on_subscribe: F) -> Self
  where
    F: Fn(Subscriber<T>) + Send + Sync + 'static,
  {
    Observable { on_subscribe: Arc::new(on_subscribe) }
  }

  /// Subscribes an already built subscriber.
  ///
  /// A panic escaping the subscription strategy is delivered to `subscriber`
  /// as [`RxError::Panicked`] while it is still active. Once it has
  /// terminated the panic has nowhere to go and resumes unwinding.
  pub fn subscribe_with(&self, subscriber: Subscriber<T>) {
    let target = subscriber.clone();
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| (self.on_subscribe)(subscriber))) {
      if target.is_disposed() {
        panic::resume_unwind(payload);
      }
      target.on_error(RxError::from_panic(payload));
    }
  }

  /// Subscribes `observer` and returns the subscription.
  pub fn subscribe_observer<O: Observer<T>>(&self, observer: O) -> CompositeDisposable {
    let subscriber = Subscriber::new(observer);
    let subscription = subscriber.disposable();
    self.subscribe_with(subscriber);
    subscription
  }

  /// Subscribes to values only. Errors are logged on target
  /// `rxplus::unhandled`.
  pub fn subscribe<N>(&self, next: N) -> CompositeDisposable
  where
    N: FnMut(T) + Send + 'static,
  {
    self.subscribe_observer(LambdaObserver::new(next, log_unhandled, || {}))
  }

  pub fn subscribe_err<N, E>(&self, next: N, error: E) -> CompositeDisposable
  where
    N: FnMut(T) + Send + 'static,
    E: FnOnce(RxError) + Send + 'static,
  {
    self.subscribe_observer(LambdaObserver::new(next, error, || {}))
  }

  pub fn subscribe_all<N, E, C>(&self, next: N, error: E, complete: C) -> CompositeDisposable
  where
    N: FnMut(T) + Send + 'static,
    E: FnOnce(RxError) + Send + 'static,
    C: FnOnce() + Send + 'static,
  {
    self.subscribe_observer(LambdaObserver::new(next, error, complete))
  }

  /// Builds an operator: for every subscriber `down` of the result, `make`
  /// creates the observer subscribed to `self`. The upstream subscription is
  /// owned by `down`.
  pub fn lift<U, F, O>(&self, make: F) -> Observable<U>
  where
    U: Send + 'static,
    F: Fn(Subscriber<U>) -> O + Send + Sync + 'static,
    O: Observer<T>,
  {
    let source = self.clone();
    Observable::create(move |down: Subscriber<U>| {
      let up = Subscriber::new(make(down.clone()));
      down.set_upstream(up.disposable());
      source.subscribe_with(up);
    })
  }

  /// Applies `op` to `self`.
  #[inline]
  pub fn pipe<Op: Operator<T>>(self, op: Op) -> Op::Output { op.apply(self) }
}

impl<T, Op: Operator<T>> BitOr<Op> for Observable<T> {
  type Output = Op::Output;

  #[inline]
  fn bitor(self, op: Op) -> Op::Output { op.apply(self) }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::{disposable::Disposable, ops};

  #[test]
  fn panicking_strategy_becomes_error() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    Observable::<i32>::create(|_| panic!("source failed"))
      .subscribe_err(|_| {}, move |e| *c_err.lock() = Some(e));
    assert_eq!(*err.lock(), Some(RxError::Panicked("source failed".into())));
  }

  #[test]
  #[should_panic(expected = "after completion")]
  fn panic_after_termination_resumes() {
    Observable::<i32>::create(|s| {
      s.on_completed();
      panic!("after completion");
    })
    .subscribe(|_| {});
  }

  #[test]
  fn pipe_and_bitor() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let source = from_iter(1..=5);
    (source.clone() | ops::map(|v: i32| v + 1) | ops::filter(|v: &i32| v % 2 == 0))
      .subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*got.lock(), vec![2, 4, 6]);

    let c_got = got.clone();
    source.pipe(ops::take(2)).subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*got.lock(), vec![2, 4, 6, 1, 2]);
  }

  #[test]
  fn each_subscription_is_independent() {
    let source = from_iter(0..3);
    let a = Arc::new(Mutex::new(0));
    let b = a.clone();
    source.subscribe(move |v| *b.lock() += v);
    let b = a.clone();
    source.subscribe(move |v| *b.lock() += v);
    assert_eq!(*a.lock(), 6);
  }

  #[test]
  fn dispose_stops_emission() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let subject = crate::subject::PublishSubject::new();
    let subscription = subject.observable().subscribe(move |v| c_got.lock().push(v));
    subject.next(1);
    subscription.dispose();
    subject.next(2);
    assert_eq!(*got.lock(), vec![1]);
  }
}
