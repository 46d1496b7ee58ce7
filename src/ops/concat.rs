use std::{collections::VecDeque, sync::Arc};

use crate::{
  disposable::{CompositeDisposable, DisposableHandle},
  error::RxError,
  observable::{from_iter, Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{gate, Gate},
};

/// Flattens an observable of observables by concatenating the inner ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatAll;

/// Emits every value of each source in turn.
pub fn concat<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
  from_iter(sources).concat_all()
}

/// Maps every value to an observable and concatenates the results.
pub fn concat_map<T, U, F>(f: F) -> impl Operator<T, Output = Observable<U>>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  ConcatMap(f)
}

struct ConcatMap<F>(F);

impl<T, U, F> Operator<T> for ConcatMap<F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  type Output = Observable<U>;

  fn apply(self, source: Observable<T>) -> Observable<U> { source.map(self.0).concat_all() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
  // No subscribe call in progress.
  Idle,
  // Inside the subscribe call of the current inner observable.
  Draining,
  // The current inner observable completed before its subscribe call
  // returned; the drain loop moves on to the next one.
  CompletedWhileDraining,
}

struct State<T> {
  queue: VecDeque<Observable<T>>,
  inner_active: bool,
  outer_completed: bool,
  stage: Stage,
}

struct Coordinator<T> {
  down: Subscriber<T>,
  state: Gate<State<T>>,
}

impl<T: Send + 'static> Coordinator<T> {
  // Inners completing inside their own subscribe call are chained by this
  // loop, not by recursion.
  fn drain(self: &Arc<Self>, first: Observable<T>) {
    let mut next = Some(first);
    while let Some(inner) = next.take() {
      let lock = self.state.lock();
      lock.borrow_mut().stage = Stage::Draining;
      self.subscribe_inner(inner);

      let mut state = lock.borrow_mut();
      match state.stage {
        Stage::CompletedWhileDraining => {
          state.stage = Stage::Idle;
          next = state.queue.pop_front();
          if next.is_none() {
            state.inner_active = false;
            if state.outer_completed {
              drop(state);
              self.down.on_completed();
            }
          }
        }
        _ => state.stage = Stage::Idle,
      }
    }
  }

  fn subscribe_inner(self: &Arc<Self>, inner: Observable<T>) {
    if self.down.is_disposed() {
      return;
    }
    let disposable = CompositeDisposable::new();
    let handle: DisposableHandle = Arc::new(disposable.clone());
    self.down.disposable().add_handle(handle.clone());
    let observer = InnerObserver { coordinator: self.clone(), handle };
    inner.subscribe_with(Subscriber::with_disposable(observer, disposable));
  }

  fn inner_completed(self: &Arc<Self>) {
    let lock = self.state.lock();
    let next = {
      let mut state = lock.borrow_mut();
      if state.stage == Stage::Draining {
        state.stage = Stage::CompletedWhileDraining;
        return;
      }
      let next = state.queue.pop_front();
      if next.is_none() {
        state.inner_active = false;
        if !state.outer_completed {
          return;
        }
      }
      next
    };
    match next {
      Some(next) => self.drain(next),
      None => self.down.on_completed(),
    }
  }
}

impl<T: Send + 'static> Operator<Observable<T>> for ConcatAll {
  type Output = Observable<T>;

  fn apply(self, source: Observable<Observable<T>>) -> Observable<T> {
    source.lift(|down: Subscriber<T>| {
      OuterObserver(Arc::new(Coordinator {
        down,
        state: gate(State {
          queue: VecDeque::new(),
          inner_active: false,
          outer_completed: false,
          stage: Stage::Idle,
        }),
      }))
    })
  }
}

struct OuterObserver<T>(Arc<Coordinator<T>>);

impl<T: Send + 'static> Observer<Observable<T>> for OuterObserver<T> {
  fn on_next(&mut self, inner: Observable<T>) {
    let start = {
      let lock = self.0.state.lock();
      let mut state = lock.borrow_mut();
      if state.inner_active {
        state.queue.push_back(inner);
        None
      } else {
        state.inner_active = true;
        Some(inner)
      }
    };
    if let Some(inner) = start {
      self.0.drain(inner);
    }
  }

  fn on_error(&mut self, err: RxError) { self.0.down.on_error(err) }

  fn on_completed(&mut self) {
    let lock = self.0.state.lock();
    let idle = {
      let mut state = lock.borrow_mut();
      state.outer_completed = true;
      !state.inner_active
    };
    if idle {
      self.0.down.on_completed();
    }
  }
}

struct InnerObserver<T> {
  coordinator: Arc<Coordinator<T>>,
  handle: DisposableHandle,
}

impl<T: Send + 'static> Observer<T> for InnerObserver<T> {
  #[inline]
  fn on_next(&mut self, value: T) { self.coordinator.down.on_next(value) }

  fn on_error(&mut self, err: RxError) { self.coordinator.down.on_error(err) }

  fn on_completed(&mut self) {
    self.coordinator.down.disposable().remove(&self.handle);
    self.coordinator.inner_completed();
  }
}

impl<T: Send + 'static> Observable<Observable<T>> {
  pub fn concat_all(self) -> Observable<T> { self.pipe(ConcatAll) }
}

impl<T: Send + 'static> Observable<T> {
  /// Emits the values of `self`, then those of `other`.
  pub fn concat_with(self, other: Observable<T>) -> Observable<T> { concat(vec![self, other]) }

  pub fn concat_map<U, F>(self, f: F) -> Observable<U>
  where
    U: Send + 'static,
    F: Fn(T) -> Observable<U> + Send + Sync + 'static,
  {
    self.pipe(concat_map(f))
  }
}
