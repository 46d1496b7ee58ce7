use std::{
  any::Any,
  fmt::{Debug, Formatter},
  hint,
  panic::{self, AssertUnwindSafe},
  sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
  },
};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::{Disposable, DisposableHandle};

const ACTIVE: u8 = 0;
// Held while the child list is mutated. Transient, always returns to ACTIVE.
const EDITING: u8 = 1;
const DISPOSED: u8 = 2;

/// A disposable owning a list of child disposables.
///
/// Cloning shares the same node. Disposing the node disposes every child in
/// the order they were added; a child added after disposal is disposed
/// immediately and never stored.
#[derive(Clone, Default)]
pub struct CompositeDisposable(Arc<Inner>);

#[derive(Default)]
struct Inner {
  state: AtomicU8,
  children: Mutex<SmallVec<[DisposableHandle; 2]>>,
}

impl CompositeDisposable {
  pub fn new() -> Self { Self::default() }

  /// Attaches `child` so that it is disposed together with `self`.
  pub fn add<D: Disposable + 'static>(&self, child: D) {
    if self.is_same(&child) || child.is_disposed() {
      return;
    }
    self.add_handle(Arc::new(child));
  }

  /// Attaches an already shared child. Keep a clone of `child` to
  /// [`remove`](Self::remove) it later.
  pub fn add_handle(&self, child: DisposableHandle) {
    if child.is_disposed() {
      return;
    }
    loop {
      match self.0.state.compare_exchange(ACTIVE, EDITING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
          {
            let mut children = self.0.children.lock();
            children.retain(|c| !c.is_disposed());
            children.push(child);
          }
          self.0.state.store(ACTIVE, Ordering::Release);
          return;
        }
        Err(DISPOSED) => {
          dispose_child(&child);
          return;
        }
        Err(_) => hint::spin_loop(),
      }
    }
  }

  /// Detaches `child` without disposing it.
  pub fn remove(&self, child: &DisposableHandle) {
    self.edit(|children| children.retain(|c| !std::ptr::addr_eq(Arc::as_ptr(c), Arc::as_ptr(child))));
  }

  /// Disposes and drops every child while keeping `self` active.
  pub fn clear(&self) {
    let mut taken = SmallVec::<[DisposableHandle; 2]>::new();
    self.edit(|children| std::mem::swap(children, &mut taken));
    taken.iter().for_each(dispose_child);
  }

  /// Number of children currently stored.
  pub fn len(&self) -> usize { self.0.children.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// Wraps `self` into a shareable handle pointing at the same node.
  pub fn to_handle(&self) -> DisposableHandle { Arc::new(self.clone()) }

  fn edit(&self, f: impl FnOnce(&mut SmallVec<[DisposableHandle; 2]>)) {
    loop {
      match self.0.state.compare_exchange(ACTIVE, EDITING, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
          f(&mut self.0.children.lock());
          self.0.state.store(ACTIVE, Ordering::Release);
          return;
        }
        Err(DISPOSED) => return,
        Err(_) => hint::spin_loop(),
      }
    }
  }

  fn is_same(&self, other: &dyn Any) -> bool {
    other.downcast_ref::<Self>().is_some_and(|other| Arc::ptr_eq(&self.0, &other.0))
  }
}

impl Disposable for CompositeDisposable {
  fn dispose(&self) {
    loop {
      match self.0.state.compare_exchange(ACTIVE, DISPOSED, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
          let children = std::mem::take(&mut *self.0.children.lock());
          children.iter().for_each(dispose_child);
          return;
        }
        Err(DISPOSED) => return,
        Err(_) => hint::spin_loop(),
      }
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.state.load(Ordering::Acquire) == DISPOSED }
}

impl Debug for CompositeDisposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CompositeDisposable")
      .field("is_disposed", &self.is_disposed())
      .field("children", &self.len())
      .finish()
  }
}

// A panicking child must not leave its siblings alive.
fn dispose_child(child: &DisposableHandle) {
  if panic::catch_unwind(AssertUnwindSafe(|| child.dispose())).is_err() {
    tracing::error!(target: "rxplus", "a child disposable panicked while being disposed");
  }
}
