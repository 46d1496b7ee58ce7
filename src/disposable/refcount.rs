use std::sync::{
  atomic::{AtomicBool, AtomicUsize, Ordering},
  Arc,
};

use parking_lot::Mutex;

use super::{Disposable, DisposableHandle};

const RELEASED: usize = usize::MAX;

/// Shares one underlying disposable between an owner and any number of
/// dependents.
///
/// The underlying disposable is disposed once the owner disposed `self` and
/// every dependent returned by [`add_ref`](Self::add_ref) has been disposed.
/// `group_by` uses it to keep the source alive while any group is observed.
#[derive(Clone)]
pub struct RefCountDisposable(Arc<Inner>);

struct Inner {
  underlying: DisposableHandle,
  // Owner's reference plus one per live dependent, `RELEASED` once the
  // underlying disposable has been disposed.
  refs: AtomicUsize,
  owner_released: AtomicBool,
}

impl RefCountDisposable {
  pub fn new(underlying: DisposableHandle) -> Self {
    RefCountDisposable(Arc::new(Inner {
      underlying,
      refs: AtomicUsize::new(1),
      owner_released: AtomicBool::new(false),
    }))
  }

  /// Takes one more reference. A reference taken after the underlying
  /// disposable is gone is returned already disposed.
  pub fn add_ref(&self) -> RefCountDependent {
    let mut current = self.0.refs.load(Ordering::Acquire);
    loop {
      if current == RELEASED {
        return RefCountDependent { owner: Mutex::new(None) };
      }
      match self.0.refs.compare_exchange_weak(
        current,
        current + 1,
        Ordering::AcqRel,
        Ordering::Acquire,
      ) {
        Ok(_) => {
          return RefCountDependent { owner: Mutex::new(Some(self.0.clone())) }
        }
        Err(actual) => current = actual,
      }
    }
  }

  /// Number of live references, the owner's included.
  pub fn ref_count(&self) -> usize {
    match self.0.refs.load(Ordering::Acquire) {
      RELEASED => 0,
      n => n,
    }
  }
}

impl Inner {
  fn release(&self) {
    let mut current = self.refs.load(Ordering::Acquire);
    loop {
      if current == RELEASED {
        return;
      }
      let next = if current == 1 { RELEASED } else { current - 1 };
      match self.refs.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
          if next == RELEASED {
            self.underlying.dispose();
          }
          return;
        }
        Err(actual) => current = actual,
      }
    }
  }
}

impl Disposable for RefCountDisposable {
  fn dispose(&self) {
    if !self.0.owner_released.swap(true, Ordering::AcqRel) {
      self.0.release();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.owner_released.load(Ordering::Acquire) }
}

/// One dependent reference of a [`RefCountDisposable`].
pub struct RefCountDependent {
  owner: Mutex<Option<Arc<Inner>>>,
}

impl Disposable for RefCountDependent {
  fn dispose(&self) {
    let owner = self.owner.lock().take();
    if let Some(owner) = owner {
      owner.release();
    }
  }

  fn is_disposed(&self) -> bool { self.owner.lock().is_none() }
}

impl Drop for RefCountDependent {
  fn drop(&mut self) { self.dispose() }
}
