use std::sync::Arc;

use super::{subject_core::SubjectCore, Subject};
use crate::{
  disposable::{CompositeDisposable, Disposable},
  error::RxError,
  observable::Observable,
  observer::Subscriber,
};

/// Multicasts every notification to the observers subscribed at the time.
///
/// `next`, `error` and `complete` must not be called concurrently with each
/// other; use [`SerializedSubject`](super::SerializedSubject) when several
/// threads feed the subject.
pub struct PublishSubject<T>(pub(crate) Arc<SubjectCore<T>>);

impl<T> Clone for PublishSubject<T> {
  fn clone(&self) -> Self { PublishSubject(self.0.clone()) }
}

impl<T: Clone + Send + 'static> Default for PublishSubject<T> {
  fn default() -> Self { PublishSubject(SubjectCore::new()) }
}

impl<T: Clone + Send + 'static> PublishSubject<T> {
  pub fn new() -> Self { Self::default() }

  #[inline]
  pub fn next(&self, value: T) { self.0.next(value) }

  #[inline]
  pub fn error(&self, err: impl Into<RxError>) { self.0.terminate(super::Terminal::Error(err.into())) }

  #[inline]
  pub fn complete(&self) { self.0.terminate(super::Terminal::Completed) }

  /// Subscribing registers with the subject; after termination the cached
  /// terminal notification is replayed instead.
  pub fn observable(&self) -> Observable<T> {
    let core = self.0.clone();
    Observable::create(move |s: Subscriber<T>| {
      if let Err(terminal) = core.add(&s) {
        terminal.deliver(&s)
      }
    })
  }

  pub fn observer_count(&self) -> usize { self.0.observer_count() }

  pub fn is_disposed(&self) -> bool { self.0.disposable().is_disposed() }

  /// Disposes the subject; current subscribers are released without a
  /// notification.
  pub fn dispose(&self) { self.0.disposable().dispose() }
}

impl<T: Clone + Send + 'static> Subject<T> for PublishSubject<T> {
  fn get_observer(&self) -> Subscriber<T> { self.0.observer() }

  fn get_observable(&self) -> Observable<T> { self.observable() }

  fn get_disposable(&self) -> CompositeDisposable { self.0.disposable() }
}
