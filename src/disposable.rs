//! Cancellation tokens and their ownership trees.
//!
//! A [`Disposable`] is the only flow-control primitive of the crate: every
//! subscription, every scheduled task and every operator coordinator is torn
//! down by disposing the disposable it is bound to. Disposables compose into
//! trees through [`CompositeDisposable`]; disposing a parent disposes every
//! child, and a child attached to an already disposed parent is disposed on
//! the spot.
use std::{
  fmt::{Debug, Formatter},
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
};

mod callback;
mod composite;
mod refcount;
mod serial;

pub use callback::CallbackDisposable;
pub use composite::CompositeDisposable;
pub use refcount::{RefCountDependent, RefCountDisposable};
pub use serial::SerialDisposable;

/// A cancellation token.
///
/// Implementations must make `dispose` idempotent and callable from any
/// thread; `is_disposed` is a pure read.
pub trait Disposable: Send + Sync {
  /// Releases the resource. Calling it more than once has no further effect.
  fn dispose(&self);

  fn is_disposed(&self) -> bool;

  /// Activates "RAII" behavior: the returned guard disposes `self` when it
  /// goes out of scope.
  ///
  /// **Attention:** If you don't bind the guard to a variable, it is dropped
  /// (and disposes) immediately.
  fn dispose_when_dropped(self) -> DisposableGuard<Self>
  where
    Self: Sized,
  {
    DisposableGuard::new(self)
  }
}

/// Type-erased, shareable disposable.
pub type DisposableHandle = Arc<dyn Disposable>;

impl<T: Disposable + ?Sized> Disposable for Arc<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl<T: Disposable + ?Sized> Disposable for Box<T> {
  #[inline]
  fn dispose(&self) { (**self).dispose() }

  #[inline]
  fn is_disposed(&self) -> bool { (**self).is_disposed() }
}

impl Debug for dyn Disposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("dyn Disposable").field("is_disposed", &self.is_disposed()).finish()
  }
}

/// Wraps any disposable into a [`DisposableHandle`].
pub fn handle<D: Disposable + 'static>(disposable: D) -> DisposableHandle { Arc::new(disposable) }

/// A disposable that is disposed from the start.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disposed;

impl Disposable for Disposed {
  #[inline]
  fn dispose(&self) {}

  #[inline]
  fn is_disposed(&self) -> bool { true }
}

/// A plain flag without any attached resource.
#[derive(Debug, Default)]
pub struct BoolDisposable(AtomicBool);

impl BoolDisposable {
  pub fn new() -> Self { Self::default() }
}

impl Disposable for BoolDisposable {
  #[inline]
  fn dispose(&self) { self.0.store(true, Ordering::Release) }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// An RAII implementation of a "scoped subscription". When this structure is
/// dropped (falls out of scope), the disposable will be disposed.
///
/// If you want to drop it immediately, wrap it in its own scope.
#[derive(Debug)]
#[must_use]
pub struct DisposableGuard<T: Disposable>(Option<T>);

impl<T: Disposable> DisposableGuard<T> {
  pub fn new(disposable: T) -> DisposableGuard<T> { DisposableGuard(Some(disposable)) }

  /// Gives the disposable back without disposing it.
  pub fn into_inner(mut self) -> Option<T> { self.0.take() }
}

impl<T: Disposable> Drop for DisposableGuard<T> {
  #[inline]
  fn drop(&mut self) {
    if let Some(d) = self.0.take() {
      d.dispose()
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn guard_disposes_on_drop() {
    let flag = Arc::new(BoolDisposable::new());
    {
      let _guard = flag.clone().dispose_when_dropped();
      assert!(!flag.is_disposed());
    }
    assert!(flag.is_disposed());
  }

  #[test]
  fn guard_into_inner_keeps_alive() {
    let flag = Arc::new(BoolDisposable::new());
    let inner = flag.clone().dispose_when_dropped().into_inner().unwrap();
    assert!(!flag.is_disposed());
    inner.dispose();
    assert!(flag.is_disposed());
  }

  #[test]
  fn disposed_is_always_disposed() {
    let d = handle(Disposed);
    d.dispose();
    assert!(d.is_disposed());
  }
}
