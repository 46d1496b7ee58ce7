use std::sync::Arc;

use parking_lot::Mutex;

use super::{Disposable, DisposableHandle};

/// Holds at most one child disposable; replacing it disposes the previous
/// child.
///
/// Once the serial disposable itself is disposed, every child handed to
/// [`set`](Self::set) is disposed immediately.
#[derive(Clone, Default)]
pub struct SerialDisposable(Arc<Mutex<Slot>>);

#[derive(Default)]
struct Slot {
  current: Option<DisposableHandle>,
  disposed: bool,
}

impl SerialDisposable {
  pub fn new() -> Self { Self::default() }

  pub fn set(&self, next: DisposableHandle) {
    let previous = {
      let mut slot = self.0.lock();
      if slot.disposed {
        Some(next)
      } else {
        slot.current.replace(next)
      }
    };
    if let Some(previous) = previous {
      previous.dispose();
    }
  }

  /// Current child, if any.
  pub fn get(&self) -> Option<DisposableHandle> { self.0.lock().current.clone() }
}

impl Disposable for SerialDisposable {
  fn dispose(&self) {
    let current = {
      let mut slot = self.0.lock();
      slot.disposed = true;
      slot.current.take()
    };
    if let Some(current) = current {
      current.dispose();
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.lock().disposed }
}
