use std::time::{Duration, Instant};

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  scheduler::Scheduler,
};

/// Lets a value through, then drops every value arriving within `period`
/// after it.
#[derive(Debug, Clone)]
pub struct Throttle<S> {
  period: Duration,
  scheduler: S,
}

pub fn throttle<S: Scheduler>(period: Duration, scheduler: S) -> Throttle<S> { Throttle { period, scheduler } }

impl<T: Send + 'static, S: Scheduler> Operator<T> for Throttle<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let Throttle { period, scheduler } = self;
    source.lift(move |down: Subscriber<T>| ThrottleObserver { down, clock: scheduler.clone(), period, open_at: None })
  }
}

struct ThrottleObserver<T, S> {
  down: Subscriber<T>,
  clock: S,
  period: Duration,
  open_at: Option<Instant>,
}

impl<T: Send + 'static, S: Scheduler> Observer<T> for ThrottleObserver<T, S> {
  fn on_next(&mut self, value: T) {
    let now = self.clock.now();
    if self.open_at.map_or(true, |at| now >= at) {
      self.open_at = Some(now + self.period);
      self.down.on_next(value);
    }
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn throttle<S: Scheduler>(self, period: Duration, scheduler: S) -> Observable<T> {
    self.pipe(throttle(period, scheduler))
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use parking_lot::Mutex;

  use std::sync::atomic::{AtomicUsize, Ordering};

  use super::*;
  use crate::{
    scheduler::{ImmediateWorker, TestScheduler},
    subject::PublishSubject,
  };

  #[derive(Clone, Default)]
  struct CountingScheduler(Arc<AtomicUsize>);

  impl Scheduler for CountingScheduler {
    type Worker = ImmediateWorker;

    fn create_worker(&self) -> ImmediateWorker {
      self.0.fetch_add(1, Ordering::Relaxed);
      ImmediateWorker
    }
  }

  #[test]
  fn reads_the_clock_without_a_worker() {
    let scheduler = CountingScheduler::default();
    let source = PublishSubject::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    source.observable().throttle(Duration::from_secs(60), scheduler.clone()).subscribe(move |v| c_got.lock().push(v));

    source.next(1);
    source.next(2);

    assert_eq!(*got.lock(), vec![1]);
    assert_eq!(scheduler.0.load(Ordering::Relaxed), 0);
  }

  #[test]
  fn drops_values_inside_window() {
    let scheduler = TestScheduler::new();
    let source = PublishSubject::new();
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    source.observable().throttle(Duration::from_secs(2), scheduler.clone()).subscribe(move |v| c_got.lock().push(v));

    source.next(1);
    source.next(2);
    scheduler.time_advance(Duration::from_secs(1));
    source.next(3);
    scheduler.time_advance(Duration::from_secs(1));
    source.next(4);
    source.next(5);
    scheduler.time_advance(Duration::from_secs(3));
    source.next(6);

    assert_eq!(*got.lock(), vec![1, 4, 6]);
  }
}
