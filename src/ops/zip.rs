use std::{collections::VecDeque, sync::Arc};

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::{gate, Gate},
  util::guard,
};

/// Pairs up the n-th values of every source and emits `selector` applied to
/// each set.
///
/// Each source gets a FIFO queue of values not consumed yet; a set is popped
/// whenever every queue holds at least one value. Completes as soon as a
/// completed source has nothing left in its queue, since no more sets can be
/// produced. A panic in `selector` becomes `on_error`.
pub fn zip_by<T, R, F>(sources: Vec<Observable<T>>, selector: F) -> Observable<R>
where
  T: Send + 'static,
  R: Send + 'static,
  F: Fn(Vec<T>) -> R + Send + Sync + 'static,
{
  let selector = Arc::new(selector);
  Observable::create(move |down: Subscriber<R>| {
    if sources.is_empty() {
      down.on_completed();
      return;
    }
    let queues: Vec<VecDeque<T>> = sources.iter().map(|_| VecDeque::new()).collect();
    let coordinator = Coordinator::new(down, queues, sources.len(), selector.clone());
    for (idx, source) in sources.iter().enumerate() {
      coordinator.subscribe(source, idx, move |queues: &mut Vec<VecDeque<T>>, value| queues[idx].push_back(value));
    }
  })
}

/// [`zip_by`] emitting each set as a `Vec`.
pub fn zip<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<Vec<T>> { zip_by(sources, |set| set) }

/// Collects the inner observables until the outer one completes, then zips
/// them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipAll;

trait Queues: Send + 'static {
  type Output;

  /// Pops the head of every queue, once none is empty.
  fn pop_set(&mut self) -> Option<Self::Output>;

  fn is_empty(&self, idx: usize) -> bool;
}

impl<T: Send + 'static> Queues for Vec<VecDeque<T>> {
  type Output = Vec<T>;

  fn pop_set(&mut self) -> Option<Vec<T>> {
    if self.iter().any(VecDeque::is_empty) {
      return None;
    }
    Some(self.iter_mut().filter_map(VecDeque::pop_front).collect())
  }

  fn is_empty(&self, idx: usize) -> bool { self[idx].is_empty() }
}

impl<A: Send + 'static, B: Send + 'static> Queues for (VecDeque<A>, VecDeque<B>) {
  type Output = (A, B);

  fn pop_set(&mut self) -> Option<(A, B)> {
    if self.0.is_empty() || self.1.is_empty() {
      return None;
    }
    Some((self.0.pop_front()?, self.1.pop_front()?))
  }

  fn is_empty(&self, idx: usize) -> bool {
    match idx {
      0 => self.0.is_empty(),
      _ => self.1.is_empty(),
    }
  }
}

struct State<Q> {
  queues: Q,
  completed: Vec<bool>,
}

impl<Q: Queues> State<Q> {
  fn exhausted(&self) -> bool {
    self.completed.iter().enumerate().any(|(idx, done)| *done && self.queues.is_empty(idx))
  }
}

struct Coordinator<Q, R, F> {
  down: Subscriber<R>,
  selector: Arc<F>,
  state: Gate<State<Q>>,
}

impl<Q, R, F> Coordinator<Q, R, F>
where
  Q: Queues,
  R: Send + 'static,
  F: Fn(Q::Output) -> R + Send + Sync + 'static,
{
  fn new(down: Subscriber<R>, queues: Q, sources: usize, selector: Arc<F>) -> Arc<Self> {
    Arc::new(Coordinator { down, selector, state: gate(State { queues, completed: vec![false; sources] }) })
  }

  fn subscribe<V, P>(self: &Arc<Self>, source: &Observable<V>, idx: usize, push: P)
  where
    V: Send + 'static,
    P: Fn(&mut Q, V) + Send + 'static,
  {
    let up = Subscriber::new(ZipObserver { coordinator: self.clone(), idx, push });
    self.down.set_upstream(up.disposable());
    source.subscribe_with(up);
  }
}

struct ZipObserver<Q, R, F, P> {
  coordinator: Arc<Coordinator<Q, R, F>>,
  idx: usize,
  push: P,
}

impl<V, Q, R, F, P> Observer<V> for ZipObserver<Q, R, F, P>
where
  Q: Queues,
  R: Send + 'static,
  F: Fn(Q::Output) -> R + Send + Sync + 'static,
  P: Fn(&mut Q, V) + Send + 'static,
{
  fn on_next(&mut self, value: V) {
    let coordinator = &self.coordinator;
    let lock = coordinator.state.lock();
    let (set, exhausted) = {
      let mut state = lock.borrow_mut();
      (self.push)(&mut state.queues, value);
      let set = state.queues.pop_set();
      (set, state.exhausted())
    };
    if let Some(set) = set {
      match guard(|| (coordinator.selector)(set)) {
        Ok(zipped) => coordinator.down.on_next(zipped),
        Err(e) => coordinator.down.on_error(e),
      }
    }
    if exhausted {
      coordinator.down.on_completed();
    }
  }

  fn on_error(&mut self, err: RxError) { self.coordinator.down.on_error(err) }

  fn on_completed(&mut self) {
    let coordinator = &self.coordinator;
    let lock = coordinator.state.lock();
    let exhausted = {
      let mut state = lock.borrow_mut();
      state.completed[self.idx] = true;
      state.exhausted()
    };
    if exhausted {
      coordinator.down.on_completed();
    }
  }
}

impl<T: Send + 'static> Operator<Observable<T>> for ZipAll {
  type Output = Observable<Vec<T>>;

  fn apply(self, source: Observable<Observable<T>>) -> Observable<Vec<T>> {
    collect_then(source, zip)
  }
}

/// Gathers every inner observable of `source`, then subscribes `down` to
/// `combine(inners)` once `source` completes.
pub(crate) fn collect_then<T, U, F>(source: Observable<Observable<T>>, combine: F) -> Observable<U>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(Vec<Observable<T>>) -> Observable<U> + Send + Sync + 'static,
{
  let combine = Arc::new(combine);
  Observable::create(move |down: Subscriber<U>| {
    let up = Subscriber::new(Collect { down: down.clone(), combine: combine.clone(), inners: vec![] });
    down.set_upstream(up.disposable());
    source.subscribe_with(up);
  })
}

struct Collect<T, U, F> {
  down: Subscriber<U>,
  combine: Arc<F>,
  inners: Vec<Observable<T>>,
}

impl<T, U, F> Observer<Observable<T>> for Collect<T, U, F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(Vec<Observable<T>>) -> Observable<U> + Send + Sync + 'static,
{
  fn on_next(&mut self, inner: Observable<T>) { self.inners.push(inner) }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) {
    if self.down.is_disposed() {
      return;
    }
    let inners = std::mem::take(&mut self.inners);
    (self.combine)(inners).subscribe_with(self.down.clone());
  }
}

impl<T: Send + 'static> Observable<Observable<T>> {
  pub fn zip_all(self) -> Observable<Vec<T>> { self.pipe(ZipAll) }
}

impl<T: Send + 'static> Observable<T> {
  /// Pairs the values of `self` and `other` by index and combines each pair
  /// with `selector`.
  pub fn zip_with_selector<U, R, F>(self, other: Observable<U>, selector: F) -> Observable<R>
  where
    U: Send + 'static,
    R: Send + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    let selector = Arc::new(move |(a, b): (T, U)| selector(a, b));
    Observable::create(move |down: Subscriber<R>| {
      let queues: (VecDeque<T>, VecDeque<U>) = (VecDeque::new(), VecDeque::new());
      let coordinator = Coordinator::new(down, queues, 2, selector.clone());
      coordinator.subscribe(&self, 0, |queues: &mut (VecDeque<T>, VecDeque<U>), a| queues.0.push_back(a));
      coordinator.subscribe(&other, 1, |queues: &mut (VecDeque<T>, VecDeque<U>), b| queues.1.push_back(b));
    })
  }

  /// Pairs the values of `self` and `other` by index.
  pub fn zip_with<U: Send + 'static>(self, other: Observable<U>) -> Observable<(T, U)> {
    self.zip_with_selector(other, |a, b| (a, b))
  }
}
