use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
};

/// Forwards the first `count` values, then completes and disposes the
/// source.
#[derive(Debug, Clone, Copy)]
pub struct Take(usize);

pub fn take(count: usize) -> Take { Take(count) }

impl<T: Send + 'static> Operator<T> for Take {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let count = self.0;
    if count == 0 {
      return Observable::create(|s: Subscriber<T>| s.on_completed());
    }
    source.lift(move |down| TakeObserver { down, left: count })
  }
}

struct TakeObserver<T> {
  down: Subscriber<T>,
  left: usize,
}

impl<T: Send + 'static> Observer<T> for TakeObserver<T> {
  fn on_next(&mut self, value: T) {
    if self.left == 0 {
      return;
    }
    self.left -= 1;
    self.down.on_next(value);
    if self.left == 0 {
      self.down.on_completed();
    }
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn take(self, count: usize) -> Observable<T> { self.pipe(take(count)) }
}
