use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  disposable::{CompositeDisposable, SerialDisposable},
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
};

/// Follows only the most recent inner observable, disposing the previous one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOnNext;

/// Maps every value to an observable and only follows the latest one.
pub fn switch_map<T, U, F>(f: F) -> impl Operator<T, Output = Observable<U>>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  SwitchMap(f)
}

struct SwitchMap<F>(F);

impl<T, U, F> Operator<T> for SwitchMap<F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  type Output = Observable<U>;

  fn apply(self, source: Observable<T>) -> Observable<U> { source.map(self.0).switch_on_next() }
}

#[derive(Default)]
struct State {
  generation: u64,
  inner_active: bool,
  outer_completed: bool,
}

struct Coordinator<T> {
  down: Subscriber<T>,
  inner: SerialDisposable,
  state: Mutex<State>,
}

impl<T: Send + 'static> Operator<Observable<T>> for SwitchOnNext {
  type Output = Observable<T>;

  fn apply(self, source: Observable<Observable<T>>) -> Observable<T> {
    source.lift(|down: Subscriber<T>| {
      let inner = SerialDisposable::new();
      down.set_upstream(inner.clone());
      OuterObserver(Arc::new(Coordinator { down, inner, state: Mutex::new(State::default()) }))
    })
  }
}

struct OuterObserver<T>(Arc<Coordinator<T>>);

impl<T: Send + 'static> Observer<Observable<T>> for OuterObserver<T> {
  fn on_next(&mut self, inner: Observable<T>) {
    let coordinator = &self.0;
    let generation = {
      let mut state = coordinator.state.lock();
      state.generation += 1;
      state.inner_active = true;
      state.generation
    };
    let disposable = CompositeDisposable::new();
    coordinator.inner.set(disposable.to_handle());
    let observer = InnerObserver { coordinator: coordinator.clone(), generation };
    inner.subscribe_with(Subscriber::with_disposable(observer, disposable));
  }

  fn on_error(&mut self, err: RxError) { self.0.down.on_error(err) }

  fn on_completed(&mut self) {
    let done = {
      let mut state = self.0.state.lock();
      state.outer_completed = true;
      !state.inner_active
    };
    if done {
      self.0.down.on_completed();
    }
  }
}

struct InnerObserver<T> {
  coordinator: Arc<Coordinator<T>>,
  generation: u64,
}

impl<T> InnerObserver<T> {
  fn is_current(&self) -> bool { self.coordinator.state.lock().generation == self.generation }
}

impl<T: Send + 'static> Observer<T> for InnerObserver<T> {
  fn on_next(&mut self, value: T) {
    if self.is_current() {
      self.coordinator.down.on_next(value);
    }
  }

  fn on_error(&mut self, err: RxError) {
    if self.is_current() {
      self.coordinator.down.on_error(err);
    }
  }

  fn on_completed(&mut self) {
    let done = {
      let mut state = self.coordinator.state.lock();
      if state.generation != self.generation {
        return;
      }
      state.inner_active = false;
      state.outer_completed
    };
    if done {
      self.coordinator.down.on_completed();
    }
  }
}

impl<T: Send + 'static> Observable<Observable<T>> {
  pub fn switch_on_next(self) -> Observable<T> { self.pipe(SwitchOnNext) }
}

impl<T: Send + 'static> Observable<T> {
  pub fn switch_map<U, F>(self, f: F) -> Observable<U>
  where
    U: Send + 'static,
    F: Fn(T) -> Observable<U> + Send + Sync + 'static,
  {
    self.pipe(switch_map(f))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{observable::from_iter, subject::PublishSubject};

  #[test]
  fn follows_latest_inner() {
    let outer = PublishSubject::new();
    let first = PublishSubject::new();
    let second = PublishSubject::new();
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    outer
      .observable()
      .switch_on_next()
      .subscribe_all(move |v| l1.lock().push(v), |_| {}, move || l2.lock().push(-1));

    outer.next(first.observable());
    first.next(1);
    outer.next(second.observable());
    assert_eq!(first.observer_count(), 0);
    first.next(2);
    second.next(3);
    outer.complete();
    second.next(4);
    second.complete();

    assert_eq!(*log.lock(), vec![1, 3, 4, -1]);
  }

  #[test]
  fn inner_error_ends_stream() {
    let outer = PublishSubject::new();
    let inner = PublishSubject::<i32>::new();
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    outer.observable().switch_on_next().subscribe_err(|_| {}, move |e| *c_err.lock() = Some(e));
    outer.next(inner.observable());
    inner.error("inner failed");
    assert_eq!(*err.lock(), Some(RxError::msg("inner failed")));
    assert_eq!(outer.observer_count(), 0);
  }

  #[test]
  fn switch_map_of_synchronous_sources() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    from_iter(1..=3)
      .switch_map(|v| from_iter(vec![v, v * 10]))
      .subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*got.lock(), vec![1, 10, 2, 20, 3, 30]);
  }
}
