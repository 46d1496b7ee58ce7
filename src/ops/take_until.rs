use std::marker::PhantomData;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::Forward,
};

/// Forwards the source until `notifier` emits, then completes.
///
/// An error of the notifier is forwarded; its completion is ignored.
#[derive(Debug, Clone)]
pub struct TakeUntil<N> {
  notifier: Observable<N>,
}

pub fn take_until<N: Send + 'static>(notifier: Observable<N>) -> TakeUntil<N> { TakeUntil { notifier } }

impl<T: Send + 'static, N: Send + 'static> Operator<T> for TakeUntil<N> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let notifier = self.notifier;
    Observable::create(move |down: Subscriber<T>| {
      let stop = Subscriber::new(Notifier { down: down.clone(), _item: PhantomData });
      down.set_upstream(stop.disposable());
      notifier.subscribe_with(stop);
      if down.is_disposed() {
        return;
      }
      let up = Subscriber::new(Forward(down.clone()));
      down.set_upstream(up.disposable());
      source.subscribe_with(up);
    })
  }
}

struct Notifier<T, N> {
  down: Subscriber<T>,
  _item: PhantomData<fn(N)>,
}

impl<T: Send + 'static, N: Send + 'static> Observer<N> for Notifier<T, N> {
  fn on_next(&mut self, _: N) { self.down.on_completed() }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) {}
}

impl<T: Send + 'static> Observable<T> {
  pub fn take_until<N: Send + 'static>(self, notifier: Observable<N>) -> Observable<T> {
    self.pipe(take_until(notifier))
  }
}
