use super::{PublishSubject, Subject};
use crate::{
  disposable::CompositeDisposable, error::RxError, observable::Observable, observer::Subscriber,
};

/// A [`PublishSubject`] that may be fed from several threads at once.
///
/// Emissions pass through one shared [`Subscriber`], so concurrent callers
/// are serialized and a terminal notification wins over anything after it.
#[derive(Clone)]
pub struct SerializedSubject<T> {
  subject: PublishSubject<T>,
  gate: Subscriber<T>,
}

impl<T: Clone + Send + 'static> Default for SerializedSubject<T> {
  fn default() -> Self {
    let subject = PublishSubject::new();
    let gate = subject.get_observer();
    SerializedSubject { subject, gate }
  }
}

impl<T: Clone + Send + 'static> SerializedSubject<T> {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn next(&self, value: T) { self.gate.on_next(value) }

  #[inline]
  pub fn error(&self, err: impl Into<RxError>) { self.gate.on_error(err.into()) }

  #[inline]
  pub fn complete(&self) { self.gate.on_completed() }

  pub fn observable(&self) -> Observable<T> { self.subject.observable() }
}

impl<T: Clone + Send + 'static> Subject<T> for SerializedSubject<T> {
  fn get_observer(&self) -> Subscriber<T> { self.gate.clone() }

  fn get_observable(&self) -> Observable<T> { self.subject.observable() }

  fn get_disposable(&self) -> CompositeDisposable { self.subject.get_disposable() }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{
      atomic::{AtomicBool, AtomicUsize, Ordering},
      Arc,
    },
    thread,
  };

  use super::*;

  #[test]
  fn concurrent_feeders_never_overlap() {
    let subject = SerializedSubject::<usize>::new();
    let busy = Arc::new(AtomicBool::new(false));
    let total = Arc::new(AtomicUsize::new(0));
    let (c_busy, c_total) = (busy.clone(), total.clone());
    subject.observable().subscribe(move |v| {
      assert!(!c_busy.swap(true, Ordering::SeqCst));
      c_total.fetch_add(v, Ordering::SeqCst);
      c_busy.store(false, Ordering::SeqCst);
    });

    let feeders: Vec<_> = (0..4)
      .map(|_| {
        let subject = subject.clone();
        thread::spawn(move || (0..100).for_each(|_| subject.next(1)))
      })
      .collect();
    feeders.into_iter().for_each(|t| t.join().unwrap());
    subject.complete();
    subject.next(1);
    assert_eq!(total.load(Ordering::SeqCst), 400);
  }
}
