//! Subjects: observers that are also observables.
//!
//! Every subject multicasts what it receives to its current subscribers and
//! caches its terminal notification, so a subscriber arriving after the
//! subject terminated gets that notification right away, exactly once.
use crate::{
  disposable::CompositeDisposable,
  error::RxError,
  observable::Observable,
  observer::{Notification, Subscriber},
};

mod behavior;
mod publish;
mod replay;
mod serialized;
mod subject_core;
mod unicast;

pub use behavior::BehaviorSubject;
pub use publish::PublishSubject;
pub use replay::ReplaySubject;
pub use serialized::SerializedSubject;
pub use unicast::UnicastSubject;

/// The three faces of a subject, as used by operators building fan-out on
/// top of subjects (`group_by`, `window`, `multicast`).
pub trait Subject<T: Send + 'static> {
  /// An observer feeding the subject.
  fn get_observer(&self) -> Subscriber<T>;

  /// The observable side.
  fn get_observable(&self) -> Observable<T>;

  /// Disposing it disposes the subject and silently releases its
  /// subscribers.
  fn get_disposable(&self) -> CompositeDisposable;
}

/// The state a subject ends in.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Terminal {
  Error(RxError),
  Completed,
  Disposed,
}

impl Terminal {
  pub(crate) fn from_notification<T>(n: Notification<T>) -> Option<Self> {
    match n {
      Notification::Next(_) => None,
      Notification::Error(e) => Some(Terminal::Error(e)),
      Notification::Completed => Some(Terminal::Completed),
    }
  }

  pub(crate) fn deliver<T: Send + 'static>(self, s: &Subscriber<T>) {
    match self {
      Terminal::Error(e) => s.on_error(e),
      Terminal::Completed => s.on_completed(),
      Terminal::Disposed => s.dispose(),
    }
  }
}
