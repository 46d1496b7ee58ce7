use std::time::Duration;

use crate::{
  observable::{Observable, Operator},
  observer::Subscriber,
  ops::bind_worker,
  scheduler::{Scheduler, WorkerExt},
};

/// Subscribes to the source from a worker of `scheduler`.
#[derive(Debug, Clone)]
pub struct SubscribeOn<S>(S);

pub fn subscribe_on<S: Scheduler>(scheduler: S) -> SubscribeOn<S> { SubscribeOn(scheduler) }

impl<T: Send + 'static, S: Scheduler> Operator<T> for SubscribeOn<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let scheduler = self.0;
    Observable::create(move |down: Subscriber<T>| {
      let worker = bind_worker(&scheduler, &down);
      let source = source.clone();
      worker.schedule_once(Duration::ZERO, down, move |down| source.subscribe_with(down.clone()));
    })
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn subscribe_on<S: Scheduler>(self, scheduler: S) -> Observable<T> { self.pipe(subscribe_on(scheduler)) }
}
