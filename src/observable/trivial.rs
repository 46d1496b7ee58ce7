use crate::{error::RxError, observable::Observable, observer::Subscriber};

/// Completes right away.
pub fn empty<T: Send + 'static>() -> Observable<T> { Observable::create(|s: Subscriber<T>| s.on_completed()) }

/// Never emits and never terminates.
pub fn never<T: Send + 'static>() -> Observable<T> { Observable::create(|_: Subscriber<T>| {}) }

/// Fails right away with `err`.
pub fn throw<T: Send + 'static>(err: impl Into<RxError>) -> Observable<T> {
  let err = err.into();
  Observable::create(move |s: Subscriber<T>| s.on_error(err.clone()))
}
