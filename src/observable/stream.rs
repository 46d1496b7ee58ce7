//! Conversion of an [`Observable`] into a `futures` stream.
//!
//! ```
//! use futures::{executor::block_on, StreamExt};
//! use rxplus::prelude::*;
//!
//! let mut stream = observable::from_iter(1..=2).into_stream();
//! block_on(async {
//!   assert_eq!(stream.next().await, Some(Ok(1)));
//!   assert_eq!(stream.next().await, Some(Ok(2)));
//!   assert_eq!(stream.next().await, None);
//! });
//! ```
use std::{
  pin::Pin,
  task::{Context, Poll},
};

use futures::{
  channel::mpsc::{self, UnboundedReceiver, UnboundedSender},
  executor::{self, BlockingStream},
  Stream,
};

use crate::{
  disposable::{CompositeDisposable, DisposableGuard},
  error::RxError,
  observable::Observable,
  observer::Observer,
};

/// A `Stream` yielding `Ok` for every value and `Err` for an error, ending
/// after the terminal notification.
///
/// Dropping the stream disposes the subscription.
pub struct IntoStream<T> {
  rx: UnboundedReceiver<Result<T, RxError>>,
  _subscription: DisposableGuard<CompositeDisposable>,
}

/// Blocking iterator over an observable, see [`Observable::blocking_iter`].
pub type BlockingIter<T> = BlockingStream<IntoStream<T>>;

struct ChannelObserver<T>(Option<UnboundedSender<Result<T, RxError>>>);

impl<T: Send + 'static> Observer<T> for ChannelObserver<T> {
  fn on_next(&mut self, value: T) {
    if let Some(tx) = &self.0 {
      let _ = tx.unbounded_send(Ok(value));
    }
  }

  fn on_error(&mut self, err: RxError) {
    if let Some(tx) = self.0.take() {
      let _ = tx.unbounded_send(Err(err));
    }
  }

  fn on_completed(&mut self) { self.0 = None }
}

impl<T> Stream for IntoStream<T> {
  type Item = Result<T, RxError>;

  fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
    Pin::new(&mut self.rx).poll_next(cx)
  }
}

impl<T: Send + 'static> Observable<T> {
  /// Subscribes and exposes the notifications as a stream.
  pub fn into_stream(self) -> IntoStream<T> {
    let (tx, rx) = mpsc::unbounded();
    let subscription = self.subscribe_observer(ChannelObserver(Some(tx)));
    IntoStream { rx, _subscription: DisposableGuard::new(subscription) }
  }

  /// Subscribes and blocks the current thread on every item.
  ///
  /// Only useful with a source emitting from another thread or completing
  /// synchronously; waiting on a source driven by the current thread blocks
  /// forever.
  pub fn blocking_iter(self) -> BlockingIter<T> { executor::block_on_stream(self.into_stream()) }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::{
    observable::{from_iter, interval, throw},
    scheduler::NewThread,
  };

  #[test]
  fn error_ends_stream() {
    let items: Vec<_> = throw::<i32>("bad").blocking_iter().collect();
    assert_eq!(items, vec![Err(RxError::msg("bad"))]);
  }

  #[test]
  fn sync_source() {
    let items: Vec<_> = from_iter(0..3).blocking_iter().map(Result::unwrap).collect();
    assert_eq!(items, vec![0, 1, 2]);
  }

  #[test]
  fn threaded_source() {
    let items: Vec<_> = interval(Duration::from_millis(1), NewThread::new())
      .take(4)
      .blocking_iter()
      .map(Result::unwrap)
      .collect();
    assert_eq!(items, vec![0, 1, 2, 3]);
  }
}
