use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{gate, zip::collect_then, Gate},
  util::guard,
};

/// Emits `selector` applied to the latest value of every source each time
/// one of them emits, once all of them have emitted at least once.
///
/// Completes when every source has completed. A panic in `selector` becomes
/// `on_error`.
pub fn combine_latest_by<T, R, F>(sources: Vec<Observable<T>>, selector: F) -> Observable<R>
where
  T: Clone + Send + 'static,
  R: Send + 'static,
  F: Fn(Vec<T>) -> R + Send + Sync + 'static,
{
  let selector = Arc::new(selector);
  Observable::create(move |down: Subscriber<R>| {
    if sources.is_empty() {
      down.on_completed();
      return;
    }
    let coordinator = Coordinator::new(down, vec![None; sources.len()], sources.len(), selector.clone());
    for (idx, source) in sources.iter().enumerate() {
      coordinator.subscribe(source, move |latest: &mut Vec<Option<T>>, value| latest[idx] = Some(value));
    }
  })
}

/// [`combine_latest_by`] emitting the latest values themselves.
pub fn combine_latest<T: Clone + Send + 'static>(sources: Vec<Observable<T>>) -> Observable<Vec<T>> {
  combine_latest_by(sources, |latest| latest)
}

/// Collects the inner observables until the outer one completes, then
/// combines them with [`combine_latest`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CombineLatestAll;

/// Latest value of every source of a combinator.
pub(crate) trait Latest: Send + 'static {
  type Output;

  /// Every value, once each slot holds one.
  fn snapshot(&self) -> Option<Self::Output>;
}

impl<T: Clone + Send + 'static> Latest for Vec<Option<T>> {
  type Output = Vec<T>;

  fn snapshot(&self) -> Option<Vec<T>> { self.iter().cloned().collect() }
}

impl<A, B> Latest for (Option<A>, Option<B>)
where
  A: Clone + Send + 'static,
  B: Clone + Send + 'static,
{
  type Output = (A, B);

  fn snapshot(&self) -> Option<(A, B)> { Some((self.0.clone()?, self.1.clone()?)) }
}

impl<T: Clone + Send + 'static> Latest for Option<T> {
  type Output = T;

  fn snapshot(&self) -> Option<T> { self.clone() }
}

struct State<L> {
  latest: L,
  remaining: usize,
}

struct Coordinator<L, R, F> {
  down: Subscriber<R>,
  selector: Arc<F>,
  state: Gate<State<L>>,
}

impl<L, R, F> Coordinator<L, R, F>
where
  L: Latest,
  R: Send + 'static,
  F: Fn(L::Output) -> R + Send + Sync + 'static,
{
  fn new(down: Subscriber<R>, latest: L, remaining: usize, selector: Arc<F>) -> Arc<Self> {
    Arc::new(Coordinator { down, selector, state: gate(State { latest, remaining }) })
  }

  fn subscribe<V, P>(self: &Arc<Self>, source: &Observable<V>, put: P)
  where
    V: Send + 'static,
    P: Fn(&mut L, V) + Send + 'static,
  {
    let up = Subscriber::new(SlotObserver { coordinator: self.clone(), put });
    self.down.set_upstream(up.disposable());
    source.subscribe_with(up);
  }
}

struct SlotObserver<L, R, F, P> {
  coordinator: Arc<Coordinator<L, R, F>>,
  put: P,
}

impl<V, L, R, F, P> Observer<V> for SlotObserver<L, R, F, P>
where
  L: Latest,
  R: Send + 'static,
  F: Fn(L::Output) -> R + Send + Sync + 'static,
  P: Fn(&mut L, V) + Send + 'static,
{
  fn on_next(&mut self, value: V) {
    let coordinator = &self.coordinator;
    let lock = coordinator.state.lock();
    let snapshot = {
      let mut state = lock.borrow_mut();
      (self.put)(&mut state.latest, value);
      state.latest.snapshot()
    };
    if let Some(snapshot) = snapshot {
      match guard(|| (coordinator.selector)(snapshot)) {
        Ok(combined) => coordinator.down.on_next(combined),
        Err(e) => coordinator.down.on_error(e),
      }
    }
  }

  fn on_error(&mut self, err: RxError) { self.coordinator.down.on_error(err) }

  fn on_completed(&mut self) {
    let coordinator = &self.coordinator;
    let lock = coordinator.state.lock();
    let done = {
      let mut state = lock.borrow_mut();
      state.remaining -= 1;
      state.remaining == 0
    };
    if done {
      coordinator.down.on_completed();
    }
  }
}

impl<T: Clone + Send + 'static> Operator<Observable<T>> for CombineLatestAll {
  type Output = Observable<Vec<T>>;

  fn apply(self, source: Observable<Observable<T>>) -> Observable<Vec<T>> {
    collect_then(source, combine_latest)
  }
}

impl<T: Clone + Send + 'static> Observable<Observable<T>> {
  pub fn combine_latest_all(self) -> Observable<Vec<T>> { self.pipe(CombineLatestAll) }
}

impl<T: Clone + Send + 'static> Observable<T> {
  /// Combines the latest values of `self` and `other` with `selector`.
  pub fn combine_latest_with_selector<U, R, F>(self, other: Observable<U>, selector: F) -> Observable<R>
  where
    U: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    let selector = Arc::new(move |(a, b): (T, U)| selector(a, b));
    Observable::create(move |down: Subscriber<R>| {
      let latest: (Option<T>, Option<U>) = (None, None);
      let coordinator = Coordinator::new(down, latest, 2, selector.clone());
      coordinator.subscribe(&self, |latest: &mut (Option<T>, Option<U>), a| latest.0 = Some(a));
      coordinator.subscribe(&other, |latest: &mut (Option<T>, Option<U>), b| latest.1 = Some(b));
    })
  }

  /// Combines the latest values of `self` and `other` into pairs.
  pub fn combine_latest_with<U: Clone + Send + 'static>(self, other: Observable<U>) -> Observable<(T, U)> {
    self.combine_latest_with_selector(other, |a, b| (a, b))
  }
}
