use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  util::guard,
};

/// Calls `f` with every value before forwarding it.
#[derive(Clone)]
pub struct Tap<F>(Arc<F>);

pub fn tap<F>(f: F) -> Tap<F> { Tap(Arc::new(f)) }

impl<T, F> Operator<T> for Tap<F>
where
  T: Send + 'static,
  F: Fn(&T) + Send + Sync + 'static,
{
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    source.lift(move |down| TapObserver { down, f: self.0.clone() })
  }
}

struct TapObserver<T, F> {
  down: Subscriber<T>,
  f: Arc<F>,
}

impl<T, F> Observer<T> for TapObserver<T, F>
where
  T: Send + 'static,
  F: Fn(&T) + Send + Sync + 'static,
{
  fn on_next(&mut self, value: T) {
    match guard(|| (self.f)(&value)) {
      Ok(()) => self.down.on_next(value),
      Err(e) => self.down.on_error(e),
    }
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn tap<F>(self, f: F) -> Observable<T>
  where
    F: Fn(&T) + Send + Sync + 'static,
  {
    self.pipe(tap(f))
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn sees_values_in_order() {
    let seen = Arc::new(Mutex::new(vec![]));
    let c_seen = seen.clone();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    from_iter(1..=3)
      .tap(move |v| c_seen.lock().push(*v))
      .subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*seen.lock(), *got.lock());
  }
}
