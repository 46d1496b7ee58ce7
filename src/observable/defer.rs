use crate::{observable::Observable, observer::Subscriber};

/// Calls `factory` on every subscription and subscribes to the observable it
/// returns.
pub fn defer<T, F>(factory: F) -> Observable<T>
where
  T: Send + 'static,
  F: Fn() -> Observable<T> + Send + Sync + 'static,
{
  Observable::create(move |s: Subscriber<T>| factory().subscribe_with(s))
}
