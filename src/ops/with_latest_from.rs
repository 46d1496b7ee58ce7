use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::combine_latest::Latest,
  util::guard,
};

/// Combines every value of the source with the latest value of each of
/// `others`.
///
/// Values arriving before every secondary produced something are dropped.
/// Only the source drives completion; errors of either side are forwarded.
#[derive(Debug, Clone)]
pub struct WithLatestFrom<U> {
  others: Vec<Observable<U>>,
}

/// Operator form; the latest values come as a one element `Vec`.
pub fn with_latest_from<U: Clone + Send + 'static>(other: Observable<U>) -> WithLatestFrom<U> {
  WithLatestFrom { others: vec![other] }
}

impl<T: Send + 'static, U: Clone + Send + 'static> Operator<T> for WithLatestFrom<U> {
  type Output = Observable<(T, Vec<U>)>;

  fn apply(self, source: Observable<T>) -> Observable<(T, Vec<U>)> {
    let others = self.others;
    let selector = Arc::new(|value: T, latest: Vec<U>| (value, latest));
    Observable::create(move |down: Subscriber<(T, Vec<U>)>| {
      let latest: Arc<Mutex<Vec<Option<U>>>> = Arc::new(Mutex::new(vec![None; others.len()]));
      // Secondaries first so that a synchronous primary sees their values.
      for (idx, other) in others.iter().enumerate() {
        subscribe_secondary(other, &latest, &down, move |slots: &mut Vec<Option<U>>, v| slots[idx] = Some(v));
      }
      subscribe_primary(&source, latest, down, selector.clone());
    })
  }
}

fn subscribe_secondary<V, L, R, P>(other: &Observable<V>, latest: &Arc<Mutex<L>>, down: &Subscriber<R>, put: P)
where
  V: Send + 'static,
  L: Latest,
  R: Send + 'static,
  P: Fn(&mut L, V) + Send + 'static,
{
  let up = Subscriber::new(SlotObserver { latest: latest.clone(), put, down: down.clone() });
  down.set_upstream(up.disposable());
  other.subscribe_with(up);
}

fn subscribe_primary<T, L, R, F>(source: &Observable<T>, latest: Arc<Mutex<L>>, down: Subscriber<R>, selector: Arc<F>)
where
  T: Send + 'static,
  L: Latest,
  R: Send + 'static,
  F: Fn(T, L::Output) -> R + Send + Sync + 'static,
{
  let up = Subscriber::new(PrimaryObserver { latest, down: down.clone(), selector });
  down.set_upstream(up.disposable());
  source.subscribe_with(up);
}

struct SlotObserver<L, R, P> {
  latest: Arc<Mutex<L>>,
  put: P,
  down: Subscriber<R>,
}

impl<V, L, R, P> Observer<V> for SlotObserver<L, R, P>
where
  L: Latest,
  R: Send + 'static,
  P: Fn(&mut L, V) + Send + 'static,
{
  fn on_next(&mut self, value: V) {
    let mut latest = self.latest.lock();
    (self.put)(&mut *latest, value)
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) {}
}

struct PrimaryObserver<L, R, F> {
  latest: Arc<Mutex<L>>,
  down: Subscriber<R>,
  selector: Arc<F>,
}

impl<T, L, R, F> Observer<T> for PrimaryObserver<L, R, F>
where
  L: Latest,
  R: Send + 'static,
  F: Fn(T, L::Output) -> R + Send + Sync + 'static,
{
  fn on_next(&mut self, value: T) {
    let snapshot = self.latest.lock().snapshot();
    if let Some(latest) = snapshot {
      match guard(|| (self.selector)(value, latest)) {
        Ok(combined) => self.down.on_next(combined),
        Err(e) => self.down.on_error(e),
      }
    }
  }

  fn on_error(&mut self, err: RxError) { self.down.on_error(err) }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  /// Combines every value with the latest value of `other` through
  /// `selector`.
  pub fn with_latest_from_selector<U, R, F>(self, other: Observable<U>, selector: F) -> Observable<R>
  where
    U: Clone + Send + 'static,
    R: Send + 'static,
    F: Fn(T, U) -> R + Send + Sync + 'static,
  {
    let selector = Arc::new(selector);
    Observable::create(move |down: Subscriber<R>| {
      let latest: Arc<Mutex<Option<U>>> = Arc::new(Mutex::new(None));
      subscribe_secondary(&other, &latest, &down, |slot: &mut Option<U>, v| *slot = Some(v));
      subscribe_primary(&self, latest, down, selector.clone());
    })
  }

  pub fn with_latest_from<U: Clone + Send + 'static>(self, other: Observable<U>) -> Observable<(T, U)> {
    self.with_latest_from_selector(other, |value, latest| (value, latest))
  }

  /// Combines every value with the latest values of all `others`, in order.
  pub fn with_latest_from_all<U: Clone + Send + 'static>(self, others: Vec<Observable<U>>) -> Observable<(T, Vec<U>)> {
    self.pipe(WithLatestFrom { others })
  }
}
