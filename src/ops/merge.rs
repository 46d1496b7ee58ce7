use std::sync::{
  atomic::{AtomicUsize, Ordering},
  Arc,
};

use crate::{
  disposable::{CompositeDisposable, DisposableHandle},
  error::RxError,
  observable::{from_iter, Observable, Operator},
  observer::{Observer, Subscriber},
};

/// Flattens an observable of observables by merging the inner ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeAll;

/// Merges `sources` into one observable completing once all of them
/// completed.
pub fn merge<T: Send + 'static>(sources: Vec<Observable<T>>) -> Observable<T> {
  from_iter(sources).merge_all()
}

/// Maps every value to an observable and merges the results.
pub fn flat_map<T, U, F>(f: F) -> impl Operator<T, Output = Observable<U>>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  FlatMap(f)
}

struct FlatMap<F>(F);

impl<T, U, F> Operator<T> for FlatMap<F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(T) -> Observable<U> + Send + Sync + 'static,
{
  type Output = Observable<U>;

  fn apply(self, source: Observable<T>) -> Observable<U> { source.map(self.0).merge_all() }
}

// Shared by the outer observer and every inner one.
struct Coordinator<T> {
  down: Subscriber<T>,
  // Live sources, the outer one included.
  active: AtomicUsize,
}

impl<T: Send + 'static> Coordinator<T> {
  fn source_completed(&self) {
    if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.down.on_completed();
    }
  }
}

impl<T: Send + 'static> Operator<Observable<T>> for MergeAll {
  type Output = Observable<T>;

  fn apply(self, source: Observable<Observable<T>>) -> Observable<T> {
    source.lift(|down: Subscriber<T>| OuterObserver(Arc::new(Coordinator { down, active: AtomicUsize::new(1) })))
  }
}

struct OuterObserver<T>(Arc<Coordinator<T>>);

impl<T: Send + 'static> Observer<Observable<T>> for OuterObserver<T> {
  fn on_next(&mut self, inner: Observable<T>) {
    let coordinator = &self.0;
    if coordinator.down.is_disposed() {
      return;
    }
    coordinator.active.fetch_add(1, Ordering::AcqRel);

    let disposable = CompositeDisposable::new();
    let handle: DisposableHandle = Arc::new(disposable.clone());
    coordinator.down.disposable().add_handle(handle.clone());
    let observer = InnerObserver { coordinator: coordinator.clone(), handle };
    inner.subscribe_with(Subscriber::with_disposable(observer, disposable));
  }

  fn on_error(&mut self, err: RxError) { self.0.down.on_error(err) }

  fn on_completed(&mut self) { self.0.source_completed() }
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
    self.coordinator.source_completed();
  }
}

impl<T: Send + 'static> Observable<Observable<T>> {
  pub fn merge_all(self) -> Observable<T> { self.pipe(MergeAll) }
}

impl<T: Send + 'static> Observable<T> {
  /// Merges `self` with `other`.
  pub fn merge_with(self, other: Observable<T>) -> Observable<T> { merge(vec![self, other]) }

  pub fn flat_map<U, F>(self, f: F) -> Observable<U>
  where
    U: Send + 'static,
    F: Fn(T) -> Observable<U> + Send + Sync + 'static,
  {
    self.pipe(flat_map(f))
  }
}

#[cfg(test)]
mod tests {
  use std::thread;

  use parking_lot::Mutex;

  use super::*;
  use crate::{
    observable::{just, throw},
    subject::PublishSubject,
  };

  type Log = Arc<Mutex<Vec<String>>>;

  fn record<T: std::fmt::Debug + Send + 'static>(source: Observable<T>, log: &Log) -> CompositeDisposable {
    let (l1, l2, l3) = (log.clone(), log.clone(), log.clone());
    source.subscribe_all(
      move |v| l1.lock().push(format!("{v:?}")),
      move |e| l2.lock().push(format!("error {e}")),
      move || l3.lock().push("done".into()),
    )
  }

  #[test]
  fn completes_after_all_sources() {
    let a = PublishSubject::new();
    let b = PublishSubject::new();
    let log = Log::default();
    record(a.observable().merge_with(b.observable()), &log);

    a.next(1);
    b.next(10);
    a.next(2);
    a.complete();
    assert!(!log.lock().contains(&"done".to_string()));
    b.complete();
    assert_eq!(*log.lock(), vec!["1", "10", "2", "done"]);
  }

  #[test]
  fn error_disposes_every_source() {
    let a = PublishSubject::<i32>::new();
    let log = Log::default();
    record(merge(vec![a.observable(), throw("bad")]), &log);
    assert_eq!(*log.lock(), vec!["error bad"]);
    assert_eq!(a.observer_count(), 0);
  }

  #[test]
  fn flat_map_keeps_outer_alive() {
    let outer = PublishSubject::new();
    let log = Log::default();
    record(outer.observable().flat_map(|v: i32| from_iter(vec![v, v * 10])), &log);
    outer.next(1);
    outer.next(2);
    outer.complete();
    assert_eq!(*log.lock(), vec!["1", "10", "2", "20", "done"]);
  }

  #[test]
  fn merge_all_of_empty_outer_completes() {
    let log = Log::default();
    record(merge(Vec::<Observable<i32>>::new()), &log);
    assert_eq!(*log.lock(), vec!["done"]);
  }

  #[test]
  fn concurrent_sources_fan_in() {
    let threads = Arc::new(Mutex::new(vec![]));
    let sources: Vec<_> = (0..4)
      .map(|i| {
        let threads = threads.clone();
        Observable::create(move |s: Subscriber<usize>| {
          threads.lock().push(thread::spawn(move || {
            (0..250).for_each(|v| s.on_next(i * 1000 + v));
            s.on_completed();
          }));
        })
      })
      .collect();
    let count = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));
    let (c_count, c_done) = (count.clone(), done.clone());
    merge(sources).subscribe_all(
      move |_| {
        c_count.fetch_add(1, Ordering::SeqCst);
      },
      |_| {},
      move || {
        c_done.fetch_add(1, Ordering::SeqCst);
      },
    );
    let handles: Vec<_> = threads.lock().drain(..).collect();
    handles.into_iter().for_each(|t| t.join().unwrap());
    assert_eq!(count.load(Ordering::SeqCst), 1000);
    assert_eq!(done.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn merge_with_just() {
    let log = Log::default();
    record(just(1).merge_with(just(2)), &log);
    assert_eq!(*log.lock(), vec!["1", "2", "done"]);
  }
}
