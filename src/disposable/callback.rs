use std::fmt::{Debug, Formatter};

use parking_lot::Mutex;

use super::Disposable;

type Teardown = Box<dyn FnOnce() + Send>;

/// Runs a teardown closure exactly once, on the first `dispose`.
pub struct CallbackDisposable(Mutex<Option<Teardown>>);

impl CallbackDisposable {
  pub fn new<F: FnOnce() + Send + 'static>(teardown: F) -> Self {
    CallbackDisposable(Mutex::new(Some(Box::new(teardown))))
  }
}

impl Disposable for CallbackDisposable {
  fn dispose(&self) {
    // Release the lock before running user code.
    let teardown = self.0.lock().take();
    if let Some(teardown) = teardown {
      teardown()
    }
  }

  #[inline]
  fn is_disposed(&self) -> bool { self.0.lock().is_none() }
}

impl Debug for CallbackDisposable {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CallbackDisposable").field("is_disposed", &self.is_disposed()).finish()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  };

  use super::*;

  #[test]
  fn runs_once() {
    let hits = Arc::new(AtomicUsize::new(0));
    let c_hits = hits.clone();
    let d = CallbackDisposable::new(move || {
      c_hits.fetch_add(1, Ordering::SeqCst);
    });
    assert!(!d.is_disposed());
    d.dispose();
    d.dispose();
    assert!(d.is_disposed());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn teardown_may_dispose_itself() {
    let slot: Arc<Mutex<Option<Arc<CallbackDisposable>>>> = Arc::default();
    let c_slot = slot.clone();
    let d = Arc::new(CallbackDisposable::new(move || {
      if let Some(me) = c_slot.lock().take() {
        me.dispose();
      }
    }));
    *slot.lock() = Some(d.clone());
    d.dispose();
    assert!(d.is_disposed());
  }
}
