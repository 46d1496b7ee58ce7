use crate::{observable::Observable, observer::Subscriber};

/// Creates an observable from a subscription strategy.
///
/// The strategy receives the subscriber of every subscription and drives it.
/// It may hand the subscriber to another thread or keep it to emit later.
///
/// ```
/// use rxplus::prelude::*;
///
/// let source = observable::create(|s: Subscriber<i32>| {
///   s.on_next(1);
///   s.on_next(2);
///   s.on_completed();
/// });
/// source.subscribe(|v| println!("{v}"));
/// ```
pub fn create<T, F>(on_subscribe: F) -> Observable<T>
where
  T: Send + 'static,
  F: Fn(Subscriber<T>) + Send + Sync + 'static,
{
  Observable::create(on_subscribe)
}

#[cfg(test)]
mod tests {
  use std::{sync::Arc, thread};

  use parking_lot::Mutex;

  use super::*;

  #[test]
  fn emits_from_other_thread() {
    let got = Arc::new(Mutex::new(vec![]));
    let done = Arc::new(Mutex::new(false));
    let handle = Arc::new(Mutex::new(None));
    let c_handle = handle.clone();
    let source = create(move |s: Subscriber<i32>| {
      *c_handle.lock() = Some(thread::spawn(move || {
        (0..3).for_each(|v| s.on_next(v));
        s.on_completed();
      }));
    });

    let (c_got, c_done) = (got.clone(), done.clone());
    source.subscribe_all(move |v| c_got.lock().push(v), |_| {}, move || *c_done.lock() = true);
    let thread = handle.lock().take().unwrap();
    thread.join().unwrap();
    assert_eq!(*got.lock(), vec![0, 1, 2]);
    assert!(*done.lock());
  }
}
