//! Observers and the contract-enforcing [`Subscriber`].
//!
//! [`Observer`] is the strategy: what to do with a value, an error or the
//! completion. [`Subscriber`] wraps a strategy and enforces the contract
//! around it:
//!
//! * nothing is delivered once it is disposed;
//! * `on_error` and `on_completed` are terminal, exclusive and fire at most
//!   once; termination disposes the subscriber's disposable *before* the
//!   strategy runs, so the release happens even if the strategy panics;
//! * calls are serialized: concurrent callers block, and calls reentering
//!   from inside the strategy on the same thread are queued and delivered in
//!   order by the outer call once it returns.
use std::{
  cell::RefCell,
  collections::VecDeque,
  fmt::{Debug, Formatter},
  sync::Arc,
};

use parking_lot::ReentrantMutex;

use crate::{
  disposable::{CompositeDisposable, Disposable},
  error::RxError,
  scheduler::TaskHandle,
};

/// Receiver of notifications.
pub trait Observer<T>: Send + 'static {
  fn on_next(&mut self, value: T);

  fn on_error(&mut self, err: RxError);

  fn on_completed(&mut self);
}

impl<T, O: Observer<T> + ?Sized> Observer<T> for Box<O> {
  #[inline]
  fn on_next(&mut self, value: T) { (**self).on_next(value) }

  #[inline]
  fn on_error(&mut self, err: RxError) { (**self).on_error(err) }

  #[inline]
  fn on_completed(&mut self) { (**self).on_completed() }
}

/// A materialized notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
  Next(T),
  Error(RxError),
  Completed,
}

impl<T> Notification<T> {
  /// Delivers `self` to `observer`.
  pub fn accept<O: Observer<T> + ?Sized>(self, observer: &mut O) {
    match self {
      Notification::Next(v) => observer.on_next(v),
      Notification::Error(e) => observer.on_error(e),
      Notification::Completed => observer.on_completed(),
    }
  }

  #[inline]
  pub fn is_terminal(&self) -> bool { !matches!(self, Notification::Next(_)) }
}

// ==================== Subscriber ====================

/// The observer every observable and operator drives.
///
/// Cloning shares the same subscriber.
pub struct Subscriber<T>(Arc<Core<T>>);

struct Core<T> {
  disposable: CompositeDisposable,
  slot: ReentrantMutex<Slot<T>>,
}

struct Slot<T> {
  // Taken out on termination.
  observer: RefCell<Option<Box<dyn Observer<T>>>>,
  // Notifications that reentered while the observer was busy.
  pending: RefCell<VecDeque<Notification<T>>>,
}

impl<T: Send + 'static> Subscriber<T> {
  pub fn new<O: Observer<T>>(observer: O) -> Self {
    Self::with_disposable(observer, CompositeDisposable::new())
  }

  /// A subscriber owning `disposable` as its upstream subscription.
  pub fn with_disposable<O: Observer<T>>(observer: O, disposable: CompositeDisposable) -> Self {
    Subscriber(Arc::new(Core {
      disposable,
      slot: ReentrantMutex::new(Slot {
        observer: RefCell::new(Some(Box::new(observer))),
        pending: RefCell::new(VecDeque::new()),
      }),
    }))
  }

  #[inline]
  pub fn on_next(&self, value: T) { self.deliver(Notification::Next(value)) }

  #[inline]
  pub fn on_error(&self, err: RxError) { self.deliver(Notification::Error(err)) }

  #[inline]
  pub fn on_completed(&self) { self.deliver(Notification::Completed) }

  /// Delivers a materialized notification.
  pub fn notify(&self, notification: Notification<T>) { self.deliver(notification) }

  fn deliver(&self, notification: Notification<T>) {
    if self.is_disposed() {
      return;
    }
    let slot = self.0.slot.lock();
    let Ok(mut observer) = slot.observer.try_borrow_mut() else {
      slot.pending.borrow_mut().push_back(notification);
      return;
    };

    let mut next = Some(notification);
    while let Some(notification) = next.take().or_else(|| slot.pending.borrow_mut().pop_front()) {
      if self.is_disposed() {
        slot.pending.borrow_mut().clear();
        break;
      }
      match notification {
        Notification::Next(v) => {
          if let Some(o) = observer.as_mut() {
            o.on_next(v)
          }
        }
        terminal => {
          self.0.disposable.dispose();
          slot.pending.borrow_mut().clear();
          if let Some(mut o) = observer.take() {
            terminal.accept(&mut o);
          }
        }
      }
    }
  }

  /// Attaches an upstream subscription; it is disposed together with this
  /// subscriber.
  #[inline]
  pub fn set_upstream<D: Disposable + 'static>(&self, upstream: D) { self.0.disposable.add(upstream) }

  #[inline]
  pub fn is_disposed(&self) -> bool { self.0.disposable.is_disposed() }

  /// Stops delivery and releases the upstream and the strategy.
  pub fn dispose(&self) {
    self.0.disposable.dispose();
    let released = self.0.slot.try_lock().and_then(|slot| {
      let mut observer = slot.observer.try_borrow_mut().ok()?;
      observer.take()
    });
    drop(released);
  }

  /// The disposable owning this subscriber's upstream.
  #[inline]
  pub fn disposable(&self) -> CompositeDisposable { self.0.disposable.clone() }
}

impl<T> Clone for Subscriber<T> {
  fn clone(&self) -> Self { Subscriber(self.0.clone()) }
}

impl<T> Debug for Subscriber<T> {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscriber").field("disposable", &self.0.disposable).finish()
  }
}

impl<T: Send + 'static> Observer<T> for Subscriber<T> {
  #[inline]
  fn on_next(&mut self, value: T) { Subscriber::on_next(self, value) }

  #[inline]
  fn on_error(&mut self, err: RxError) { Subscriber::on_error(self, err) }

  #[inline]
  fn on_completed(&mut self) { Subscriber::on_completed(self) }
}

impl<T: Send + 'static> Disposable for Subscriber<T> {
  #[inline]
  fn dispose(&self) { Subscriber::dispose(self) }

  #[inline]
  fn is_disposed(&self) -> bool { Subscriber::is_disposed(self) }
}

impl<T: Send + 'static> TaskHandle for Subscriber<T> {
  #[inline]
  fn on_error(&self, err: RxError) { Subscriber::on_error(self, err) }
}

// ==================== Lambda observers ====================

/// An observer built from closures.
pub struct LambdaObserver<N, E, C> {
  next: N,
  // Terminal callbacks run at most once.
  error: Option<E>,
  complete: Option<C>,
}

impl<N, E, C> LambdaObserver<N, E, C> {
  pub fn new(next: N, error: E, complete: C) -> Self {
    LambdaObserver { next, error: Some(error), complete: Some(complete) }
  }
}

impl<T, N, E, C> Observer<T> for LambdaObserver<N, E, C>
where
  N: FnMut(T) + Send + 'static,
  E: FnOnce(RxError) + Send + 'static,
  C: FnOnce() + Send + 'static,
{
  #[inline]
  fn on_next(&mut self, value: T) { (self.next)(value) }

  fn on_error(&mut self, err: RxError) {
    if let Some(error) = self.error.take() {
      error(err)
    }
  }

  fn on_completed(&mut self) {
    if let Some(complete) = self.complete.take() {
      complete()
    }
  }
}

/// Error handler used when none is given: the error is reported through
/// `tracing` on target `rxplus::unhandled` and dropped.
pub fn log_unhandled(err: RxError) {
  tracing::error!(target: "rxplus::unhandled", error = %err, "unhandled error");
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
  };

  use parking_lot::Mutex;

  use super::*;

  #[derive(Clone, Default)]
  struct Recorder(Arc<Mutex<Vec<Notification<i32>>>>);

  impl Observer<i32> for Recorder {
    fn on_next(&mut self, value: i32) { self.0.lock().push(Notification::Next(value)) }
    fn on_error(&mut self, err: RxError) { self.0.lock().push(Notification::Error(err)) }
    fn on_completed(&mut self) { self.0.lock().push(Notification::Completed) }
  }

  #[test]
  fn terminal_exclusivity() {
    let rec = Recorder::default();
    let sub = Subscriber::new(rec.clone());
    sub.on_next(1);
    sub.on_completed();
    sub.on_next(2);
    sub.on_error(RxError::Timeout);
    sub.on_completed();

    assert!(sub.is_disposed());
    assert_eq!(*rec.0.lock(), vec![Notification::Next(1), Notification::Completed]);
  }

  #[test]
  fn error_then_complete_is_ignored() {
    let rec = Recorder::default();
    let sub = Subscriber::new(rec.clone());
    sub.on_error("first".into());
    sub.on_error("second".into());
    sub.on_completed();
    assert_eq!(*rec.0.lock(), vec![Notification::Error("first".into())]);
  }

  #[test]
  fn disposed_before_strategy_runs() {
    struct Inspector(Arc<Mutex<Option<Subscriber<i32>>>>, Arc<Mutex<Option<bool>>>);
    impl Observer<i32> for Inspector {
      fn on_next(&mut self, _: i32) {}
      fn on_error(&mut self, _: RxError) {}
      fn on_completed(&mut self) {
        let disposed = self.0.lock().as_ref().map(|s| s.is_disposed());
        *self.1.lock() = disposed;
      }
    }
    let me = Arc::new(Mutex::new(None));
    let seen = Arc::new(Mutex::new(None));
    let sub = Subscriber::new(Inspector(me.clone(), seen.clone()));
    *me.lock() = Some(sub.clone());
    sub.on_completed();
    assert_eq!(*seen.lock(), Some(true));
    me.lock().take();
  }

  #[test]
  fn upstream_released_even_if_strategy_panics() {
    struct Panicky;
    impl Observer<i32> for Panicky {
      fn on_next(&mut self, _: i32) {}
      fn on_error(&mut self, _: RxError) { panic!("handler failed") }
      fn on_completed(&mut self) {}
    }
    let sub = Subscriber::new(Panicky);
    let upstream = CompositeDisposable::new();
    sub.set_upstream(upstream.clone());

    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| sub.on_error(RxError::Timeout)));
    assert!(res.is_err());
    assert!(upstream.is_disposed());
    sub.on_next(1);
  }

  #[test]
  fn reentrant_calls_are_queued_in_order() {
    struct Echo(Arc<Mutex<Option<Subscriber<i32>>>>, Arc<Mutex<Vec<i32>>>);
    impl Observer<i32> for Echo {
      fn on_next(&mut self, v: i32) {
        self.1.lock().push(v);
        if v < 3 {
          let me = self.0.lock().clone();
          if let Some(me) = me {
            me.on_next(v * 10);
            me.on_next(v + 1);
          }
        }
      }
      fn on_error(&mut self, _: RxError) {}
      fn on_completed(&mut self) { self.1.lock().push(-1) }
    }

    let me = Arc::new(Mutex::new(None));
    let log = Arc::new(Mutex::new(vec![]));
    let sub = Subscriber::new(Echo(me.clone(), log.clone()));
    *me.lock() = Some(sub.clone());
    sub.on_next(1);
    sub.on_completed();
    me.lock().take();
    // 1 queues (10, 2); 2 queues (20, 3).
    assert_eq!(*log.lock(), vec![1, 10, 2, 20, 3, -1]);
  }

  #[test]
  fn concurrent_calls_never_overlap() {
    struct Exclusive(Arc<AtomicUsize>, Arc<AtomicUsize>);
    impl Observer<i32> for Exclusive {
      fn on_next(&mut self, _: i32) {
        assert_eq!(self.0.fetch_add(1, Ordering::SeqCst), 0);
        thread::yield_now();
        self.0.fetch_sub(1, Ordering::SeqCst);
        self.1.fetch_add(1, Ordering::SeqCst);
      }
      fn on_error(&mut self, _: RxError) {}
      fn on_completed(&mut self) {}
    }

    let count = Arc::new(AtomicUsize::new(0));
    let sub = Subscriber::new(Exclusive(Arc::new(AtomicUsize::new(0)), count.clone()));
    let threads: Vec<_> = (0..4)
      .map(|_| {
        let sub = sub.clone();
        thread::spawn(move || (0..250).for_each(|i| sub.on_next(i)))
      })
      .collect();
    threads.into_iter().for_each(|t| t.join().unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 1000);
  }

  #[test]
  fn lambda_observer_defaults() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let sub = Subscriber::new(LambdaObserver::new(
      move |v: i32| c_got.lock().push(v),
      log_unhandled,
      || {},
    ));
    sub.on_next(7);
    sub.on_error(RxError::Timeout);
    assert_eq!(*got.lock(), vec![7]);
  }
}
