use std::{
  collections::VecDeque,
  sync::Arc,
  time::{Duration, Instant},
};

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Notification, Observer, Subscriber},
  ops::{bind_worker, gate, Gate},
  scheduler::{Delay, Scheduler, Worker, WorkerExt},
};

/// Shifts values and completion forward in time by `delay`.
///
/// Errors are not delayed: they drop whatever is still queued and go out at
/// once.
#[derive(Debug, Clone)]
pub struct DelayOp<S> {
  delay: Duration,
  scheduler: S,
}

pub fn delay<S: Scheduler>(delay: Duration, scheduler: S) -> DelayOp<S> { DelayOp { delay, scheduler } }

struct State<T> {
  queue: VecDeque<(Instant, Notification<T>)>,
  scheduled: bool,
}

struct Shared<T, W> {
  down: Subscriber<T>,
  worker: W,
  state: Gate<State<T>>,
}

impl<T: Send + 'static, W: Worker + 'static> Shared<T, W> {
  // Emits every queued notification that is due.
  fn drain(&self) -> Option<Delay> {
    let lock = self.state.lock();
    loop {
      let notification = {
        let mut state = lock.borrow_mut();
        match state.queue.front() {
          None => {
            state.scheduled = false;
            return None;
          }
          Some((due, _)) if *due > self.worker.now() => return Some(Delay::To(*due)),
          Some(_) => state.queue.pop_front().map(|(_, n)| n),
        }
      };
      if let Some(notification) = notification {
        self.down.notify(notification);
      }
    }
  }

  fn enqueue(self: &Arc<Self>, due: Instant, notification: Notification<T>) {
    let schedule = {
      let lock = self.state.lock();
      let mut state = lock.borrow_mut();
      state.queue.push_back((due, notification));
      !std::mem::replace(&mut state.scheduled, true)
    };
    if schedule {
      let task = self.clone();
      self.worker.schedule_at(due, self.down.clone(), move |_| task.drain());
    }
  }
}

impl<T: Send + 'static, S: Scheduler> Operator<T> for DelayOp<S> {
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let DelayOp { delay, scheduler } = self;
    source.lift(move |down: Subscriber<T>| {
      let worker = bind_worker(&scheduler, &down);
      let state = gate(State { queue: VecDeque::new(), scheduled: false });
      DelayObserver { delay, shared: Arc::new(Shared { down, worker, state }) }
    })
  }
}

struct DelayObserver<T, W> {
  delay: Duration,
  shared: Arc<Shared<T, W>>,
}

impl<T: Send + 'static, W: Worker + 'static> Observer<T> for DelayObserver<T, W> {
  fn on_next(&mut self, value: T) {
    let due = self.shared.worker.now() + self.delay;
    self.shared.enqueue(due, Notification::Next(value));
  }

  fn on_error(&mut self, err: RxError) {
    let lock = self.shared.state.lock();
    lock.borrow_mut().queue.clear();
    self.shared.down.on_error(err);
  }

  fn on_completed(&mut self) {
    let due = self.shared.worker.now() + self.delay;
    self.shared.enqueue(due, Notification::Completed);
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn delay<S: Scheduler>(self, delay: Duration, scheduler: S) -> Observable<T> {
    self.pipe(self::delay(delay, scheduler))
  }
}
