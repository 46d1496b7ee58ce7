use crate::{observable::Observable, observer::Subscriber};

/// Creates an observable that produces values from an iterator.
///
/// Completes when all elements have been emitted. Stops as soon as the
/// subscriber is disposed.
///
/// ```
/// use rxplus::prelude::*;
///
/// observable::from_iter(vec![0, 1, 2, 3]).subscribe(|v| println!("{v},"));
/// ```
pub fn from_iter<I>(iter: I) -> Observable<I::Item>
where
  I: IntoIterator + Clone + Send + Sync + 'static,
  I::Item: Send + 'static,
{
  Observable::create(move |s: Subscriber<I::Item>| {
    for v in iter.clone() {
      if s.is_disposed() {
        return;
      }
      s.on_next(v);
    }
    s.on_completed();
  })
}

/// Emits `value` once, then completes.
pub fn just<T: Clone + Send + Sync + 'static>(value: T) -> Observable<T> {
  Observable::create(move |s: Subscriber<T>| {
    s.on_next(value.clone());
    s.on_completed();
  })
}
