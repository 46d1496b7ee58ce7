use std::time::Duration;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::bind_worker,
  scheduler::{Scheduler, WorkerExt},
};

/// Re-delivers every notification through one worker of `scheduler`.
///
/// All notifications of a subscription go through the same worker, so their
/// order is kept.
#[derive(Debug, Clone)]
pub struct ObserveOn<S>(S);

pub fn observe_on<S: Scheduler>(scheduler: S) -> ObserveOn<S> { ObserveOn(scheduler) }

impl<T: Send + 'static, S: Scheduler> Operator<T> for ObserveOn<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let scheduler = self.0;
    source.lift(move |down: Subscriber<T>| ObserveOnObserver { worker: bind_worker(&scheduler, &down), down })
  }
}

struct ObserveOnObserver<T, W> {
  down: Subscriber<T>,
  worker: W,
}

impl<T: Send + 'static, W: WorkerExt + 'static> Observer<T> for ObserveOnObserver<T, W> {
  fn on_next(&mut self, value: T) {
    self.worker.schedule_once(Duration::ZERO, self.down.clone(), move |down| down.on_next(value));
  }

  fn on_error(&mut self, err: RxError) {
    self.worker.schedule_once(Duration::ZERO, self.down.clone(), move |down| down.on_error(err));
  }

  fn on_completed(&mut self) {
    self.worker.schedule_once(Duration::ZERO, self.down.clone(), |down| down.on_completed());
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn observe_on<S: Scheduler>(self, scheduler: S) -> Observable<T> { self.pipe(observe_on(scheduler)) }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::{mpsc, Arc},
    thread,
  };

  use parking_lot::Mutex;

  use crate::{
    observable::from_iter,
    scheduler::{NewThread, RunLoop},
  };

  #[test]
  fn delivers_on_run_loop_in_order() {
    let run_loop = RunLoop::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (c_log, c_done) = (log.clone(), log.clone());
    from_iter(1..=3)
      .observe_on(run_loop.clone())
      .subscribe_all(move |v| c_log.lock().push(v), |_| {}, move || c_done.lock().push(-1));

    assert!(log.lock().is_empty());
    while run_loop.dispatch_if_ready() {}
    assert_eq!(*log.lock(), vec![1, 2, 3, -1]);
  }

  #[test]
  fn moves_delivery_to_worker_thread() {
    let (tx, rx) = mpsc::channel();
    from_iter(1..=3).observe_on(NewThread::new()).subscribe_all(
      {
        let tx = tx.clone();
        move |v| {
          let _ = tx.send((v, thread::current().id()));
        }
      },
      |_| {},
      || {},
    );
    let got: Vec<_> = rx.iter().take(3).collect();
    assert_eq!(got.iter().map(|(v, _)| *v).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(got.iter().all(|(_, id)| *id != thread::current().id()));
    assert!(got.windows(2).all(|w| w[0].1 == w[1].1));
  }
}
