use std::{collections::VecDeque, sync::Arc};

use parking_lot::{Mutex, ReentrantMutex};

use super::{subject_core::SubjectCore, Subject, Terminal};
use crate::{
  disposable::CompositeDisposable,
  error::RxError,
  observable::Observable,
  observer::{Observer, Subscriber},
};

/// A subject replaying past values to every new subscriber, followed by the
/// terminal notification if the subject already terminated.
pub struct ReplaySubject<T>(Arc<Inner<T>>);

struct Inner<T> {
  core: Arc<SubjectCore<T>>,
  buffer: Mutex<VecDeque<T>>,
  capacity: Option<usize>,
  emission: ReentrantMutex<()>,
}

impl<T> Clone for ReplaySubject<T> {
  fn clone(&self) -> Self { ReplaySubject(self.0.clone()) }
}

impl<T: Clone + Send + 'static> Default for ReplaySubject<T> {
  fn default() -> Self { Self::build(None) }
}

impl<T: Clone + Send + 'static> ReplaySubject<T> {
  /// Replays every value.
  pub fn new() -> Self { Self::default() }

  /// Replays the last `capacity` values.
  pub fn with_capacity(capacity: usize) -> Self { Self::build(Some(capacity)) }

  fn build(capacity: Option<usize>) -> Self {
    ReplaySubject(Arc::new(Inner {
      core: SubjectCore::new(),
      buffer: Mutex::new(VecDeque::new()),
      capacity,
      emission: ReentrantMutex::new(()),
    }))
  }

  pub fn next(&self, value: T) { self.0.next(value) }

  pub fn error(&self, err: impl Into<RxError>) { self.0.terminate(Terminal::Error(err.into())) }

  pub fn complete(&self) { self.0.terminate(Terminal::Completed) }

  pub fn observable(&self) -> Observable<T> {
    let inner = self.0.clone();
    Observable::create(move |s: Subscriber<T>| {
      let _emission = inner.emission.lock();
      let replay: Vec<T> = inner.buffer.lock().iter().cloned().collect();
      let registered = inner.core.add(&s);
      for v in replay {
        s.on_next(v);
      }
      if let Err(terminal) = registered {
        terminal.deliver(&s);
      }
    })
  }
}

impl<T: Clone + Send + 'static> Inner<T> {
  fn next(&self, value: T) {
    let _emission = self.emission.lock();
    if self.core.terminal().is_some() {
      return;
    }
    {
      let mut buffer = self.buffer.lock();
      if self.capacity == Some(0) {
        buffer.clear();
      } else {
        buffer.push_back(value.clone());
        if let Some(cap) = self.capacity {
          while buffer.len() > cap {
            buffer.pop_front();
          }
        }
      }
    }
    self.core.next(value);
  }

  fn terminate(&self, terminal: Terminal) {
    let _emission = self.emission.lock();
    self.core.terminate(terminal);
  }
}

struct ReplayObserver<T>(Arc<Inner<T>>);

impl<T: Clone + Send + 'static> Observer<T> for ReplayObserver<T> {
  fn on_next(&mut self, value: T) { self.0.next(value) }

  fn on_error(&mut self, err: RxError) { self.0.terminate(Terminal::Error(err)) }

  fn on_completed(&mut self) { self.0.terminate(Terminal::Completed) }
}

impl<T: Clone + Send + 'static> Subject<T> for ReplaySubject<T> {
  fn get_observer(&self) -> Subscriber<T> {
    let s = Subscriber::new(ReplayObserver(self.0.clone()));
    self.0.core.disposable().add(s.disposable());
    s
  }

  fn get_observable(&self) -> Observable<T> { self.observable() }

  fn get_disposable(&self) -> CompositeDisposable { self.0.core.disposable() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn collect(subject: &ReplaySubject<i32>) -> Arc<Mutex<Vec<i32>>> {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    subject.observable().subscribe_all(move |v| l1.lock().push(v), |_| {}, move || l2.lock().push(-1));
    log
  }

  #[test]
  fn replays_everything() {
    let subject = ReplaySubject::new();
    subject.next(1);
    subject.next(2);
    let early = collect(&subject);
    subject.next(3);
    subject.complete();
    let late = collect(&subject);

    assert_eq!(*early.lock(), vec![1, 2, 3, -1]);
    assert_eq!(*late.lock(), vec![1, 2, 3, -1]);
  }

  #[test]
  fn bounded_replay() {
    let subject = ReplaySubject::with_capacity(2);
    (1..=5).for_each(|v| subject.next(v));
    assert_eq!(*collect(&subject).lock(), vec![4, 5]);
  }
}
