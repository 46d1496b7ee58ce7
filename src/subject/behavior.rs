use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use super::{subject_core::SubjectCore, Subject, Terminal};
use crate::{
  disposable::{CompositeDisposable, Disposable},
  error::RxError,
  observable::Observable,
  observer::{Observer, Subscriber},
};

/// A subject holding a current value.
///
/// Every new subscriber first receives the current value, then every later
/// one. After termination, late subscribers only get the terminal
/// notification.
pub struct BehaviorSubject<T>(Arc<Inner<T>>);

struct Inner<T> {
  core: Arc<SubjectCore<T>>,
  value: Mutex<T>,
  // Orders "store + broadcast" against "register + send current value".
  emission: ReentrantMutex<()>,
}

impl<T> Clone for BehaviorSubject<T> {
  fn clone(&self) -> Self { BehaviorSubject(self.0.clone()) }
}

impl<T: Clone + Send + 'static> BehaviorSubject<T> {
  pub fn new(initial: T) -> Self {
    BehaviorSubject(Arc::new(Inner {
      core: SubjectCore::new(),
      value: Mutex::new(initial),
      emission: ReentrantMutex::new(()),
    }))
  }

  /// The latest value.
  pub fn value(&self) -> T { self.0.value.lock().clone() }

  pub fn next(&self, value: T) { self.0.next(value) }

  pub fn error(&self, err: impl Into<RxError>) { self.0.core.terminate(Terminal::Error(err.into())) }

  pub fn complete(&self) { self.0.core.terminate(Terminal::Completed) }

  pub fn observable(&self) -> Observable<T> {
    let inner = self.0.clone();
    Observable::create(move |s: Subscriber<T>| {
      let _emission = inner.emission.lock();
      match inner.core.add(&s) {
        Ok(()) => {
          let current = inner.value.lock().clone();
          s.on_next(current);
        }
        Err(terminal) => terminal.deliver(&s),
      }
    })
  }

  pub fn is_disposed(&self) -> bool { self.0.core.disposable().is_disposed() }
}

impl<T: Clone + Send + 'static> Inner<T> {
  fn next(&self, value: T) {
    let _emission = self.emission.lock();
    if self.core.terminal().is_some() {
      return;
    }
    *self.value.lock() = value.clone();
    self.core.next(value);
  }
}

struct BehaviorObserver<T>(Arc<Inner<T>>);

impl<T: Clone + Send + 'static> Observer<T> for BehaviorObserver<T> {
  fn on_next(&mut self, value: T) { self.0.next(value) }

  fn on_error(&mut self, err: RxError) { self.0.core.terminate(Terminal::Error(err)) }

  fn on_completed(&mut self) { self.0.core.terminate(Terminal::Completed) }
}

impl<T: Clone + Send + 'static> Subject<T> for BehaviorSubject<T> {
  fn get_observer(&self) -> Subscriber<T> {
    let s = Subscriber::new(BehaviorObserver(self.0.clone()));
    self.0.core.disposable().add(s.disposable());
    s
  }

  fn get_observable(&self) -> Observable<T> { self.observable() }

  fn get_disposable(&self) -> CompositeDisposable { self.0.core.disposable() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn replays_current_value() {
    let subject = BehaviorSubject::new(0);
    let got = Arc::new(Mutex::new(vec![]));

    let c_got = got.clone();
    subject.observable().subscribe(move |v| c_got.lock().push(("a", v)));
    subject.next(1);
    let c_got = got.clone();
    subject.observable().subscribe(move |v| c_got.lock().push(("b", v)));
    subject.next(2);

    assert_eq!(*got.lock(), vec![("a", 0), ("a", 1), ("b", 1), ("a", 2), ("b", 2)]);
    assert_eq!(subject.value(), 2);
  }

  #[test]
  fn terminated_subject_replays_terminal_only() {
    let subject = BehaviorSubject::new(1);
    subject.complete();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    subject.observable().subscribe_all(move |v| l1.lock().push(v), |_| {}, move || l2.lock().push(-1));
    subject.next(5);
    assert_eq!(*log.lock(), vec![-1]);
    assert_eq!(subject.value(), 1);
  }

  #[test]
  fn reentrant_next_from_subscriber() {
    let subject = BehaviorSubject::new(0);
    let got = Arc::new(Mutex::new(vec![]));
    let (c_subject, c_got) = (subject.clone(), got.clone());
    subject.observable().subscribe(move |v| {
      c_got.lock().push(v);
      if v < 2 {
        c_subject.next(v + 1);
      }
    });
    assert_eq!(*got.lock(), vec![0, 1, 2]);
  }
}
