use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  util::guard,
};

/// Forwards only the values satisfying `predicate`.
#[derive(Clone)]
pub struct Filter<F>(Arc<F>);

pub fn filter<F>(predicate: F) -> Filter<F> { Filter(Arc::new(predicate)) }

impl<T, F> Operator<T> for Filter<F>
where
  T: Send + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    source.lift(move |down| FilterObserver { down, predicate: self.0.clone() })
  }
}

struct FilterObserver<T, F> {
  down: Subscriber<T>,
  predicate: Arc<F>,
}

impl<T, F> Observer<T> for FilterObserver<T, F>
where
  T: Send + 'static,
  F: Fn(&T) -> bool + Send + Sync + 'static,
{
  fn on_next(&mut self, value: T) {
    match guard(|| (self.predicate)(&value)) {
      Ok(true) => self.down.on_next(value),
      Ok(false) => {}
      Err(e) => self.down.on_error(e),
    }
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn filter<F>(self, predicate: F) -> Observable<T>
  where
    F: Fn(&T) -> bool + Send + Sync + 'static,
  {
    self.pipe(filter(predicate))
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::observable::from_iter;

  #[test]
  fn keeps_matching() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    from_iter(0..10).filter(|v| v % 3 == 0).subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*got.lock(), vec![0, 3, 6, 9]);
  }
}
