use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  util::guard,
};

/// Transforms every value with `f`. A panic in `f` becomes `on_error`.
#[derive(Clone)]
pub struct Map<F>(Arc<F>);

pub fn map<F>(f: F) -> Map<F> { Map(Arc::new(f)) }

impl<T, U, F> Operator<T> for Map<F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> U + Send + Sync + 'static,
{
  type Output = Observable<U>;

  fn apply(self, source: Observable<T>) -> Observable<U> {
    source.lift(move |down| MapObserver { down, f: self.0.clone() })
  }
}

struct MapObserver<U, F> {
  down: Subscriber<U>,
  f: Arc<F>,
}

impl<T, U, F> Observer<T> for MapObserver<U, F>
where
  U: Send + 'static,
  F: Fn(T) -> U + Send + Sync + 'static,
{
  fn on_next(&mut self, value: T) {
    match guard(|| (self.f)(value)) {
      Ok(v) => self.down.on_next(v),
      Err(e) => self.down.on_error(e),
    }
  }

  #[inline]
  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  #[inline]
  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn map<U, F>(self, f: F) -> Observable<U>
  where
    U: Send + 'static,
    F: Fn(T) -> U + Send + Sync + 'static,
  {
    self.pipe(map(f))
  }
}
