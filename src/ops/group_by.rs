//! Splits a source into one observable per key.
//!
//! The source subscription is shared by the downstream subscriber and every
//! subscription to a group through a [`RefCountDisposable`]: disposing the
//! downstream keeps the source running while any group is still observed.
use std::{collections::HashMap, fmt, hash::Hash, sync::Arc};

use crate::{
  disposable::{CompositeDisposable, RefCountDisposable},
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  subject::PublishSubject,
  util::guard,
};

/// The values of one key.
#[derive(Clone)]
pub struct GroupedObservable<K, T> {
  key: K,
  observable: Observable<T>,
}

impl<K, T> GroupedObservable<K, T> {
  #[inline]
  pub fn key(&self) -> &K { &self.key }

  #[inline]
  pub fn observable(&self) -> Observable<T> { self.observable.clone() }

  pub fn into_observable(self) -> Observable<T> { self.observable }
}

impl<K: fmt::Debug, T> fmt::Debug for GroupedObservable<K, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("GroupedObservable").field("key", &self.key).finish()
  }
}

pub struct GroupBy<F>(Arc<F>);

pub fn group_by<T, K, F>(key_fn: F) -> GroupBy<F>
where
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  GroupBy(Arc::new(key_fn))
}

impl<T, K, F> Operator<T> for GroupBy<F>
where
  T: Clone + Send + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  type Output = Observable<GroupedObservable<K, T>>;

  fn apply(self, source: Observable<T>) -> Self::Output {
    let key_fn = self.0;
    Observable::create(move |down: Subscriber<GroupedObservable<K, T>>| {
      let subscription = CompositeDisposable::new();
      let refcount = RefCountDisposable::new(subscription.to_handle());
      down.set_upstream(refcount.clone());
      let observer =
        GroupByObserver { down: down.clone(), key_fn: key_fn.clone(), groups: HashMap::new(), refcount };
      source.subscribe_with(Subscriber::with_disposable(observer, subscription));
    })
  }
}

struct GroupByObserver<K, T, F> {
  down: Subscriber<GroupedObservable<K, T>>,
  key_fn: Arc<F>,
  groups: HashMap<K, PublishSubject<T>>,
  refcount: RefCountDisposable,
}

impl<K, T, F> GroupByObserver<K, T, F>
where
  T: Clone + Send + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
{
  fn open_group(&mut self, key: K) -> Option<PublishSubject<T>> {
    if self.down.is_disposed() {
      return None;
    }
    let subject = PublishSubject::new();
    let source = subject.observable();
    let refcount = self.refcount.clone();
    let observable = Observable::create(move |s: Subscriber<T>| {
      s.set_upstream(refcount.add_ref());
      source.subscribe_with(s);
    });
    self.groups.insert(key.clone(), subject.clone());
    self.down.on_next(GroupedObservable { key, observable });
    Some(subject)
  }
}

impl<K, T, F> Observer<T> for GroupByObserver<K, T, F>
where
  T: Clone + Send + 'static,
  K: Hash + Eq + Clone + Send + Sync + 'static,
  F: Fn(&T) -> K + Send + Sync + 'static,
{
  fn on_next(&mut self, value: T) {
    let key_fn = &self.key_fn;
    let key = match guard(|| key_fn(&value)) {
      Ok(key) => key,
      Err(err) => return self.on_error(err),
    };
    let subject = match self.groups.get(&key) {
      Some(subject) => Some(subject.clone()),
      None => self.open_group(key),
    };
    if let Some(subject) = subject {
      subject.next(value);
    }
  }

  fn on_error(&mut self, err: RxError) {
    for (_, subject) in self.groups.drain() {
      subject.error(err.clone());
    }
    self.down.on_error(err);
  }

  fn on_completed(&mut self) {
    for (_, subject) in self.groups.drain() {
      subject.complete();
    }
    self.down.on_completed();
  }
}

impl<T: Clone + Send + 'static> Observable<T> {
  /// Groups values by `key_fn`; every new key emits a [`GroupedObservable`].
  pub fn group_by<K, F>(self, key_fn: F) -> Observable<GroupedObservable<K, T>>
  where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    F: Fn(&T) -> K + Send + Sync + 'static,
  {
    self.pipe(group_by(key_fn))
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::disposable::Disposable;
  use crate::observable::from_iter;

  #[test]
  fn values_land_in_their_group() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    from_iter(1..=6).group_by(|v| v % 2 == 0).subscribe(move |group| {
      let key = *group.key();
      let got = c_got.clone();
      group.observable().subscribe(move |v| got.lock().push((key, v)));
    });
    assert_eq!(*got.lock(), vec![(false, 1), (true, 2), (false, 3), (true, 4), (false, 5), (true, 6)]);
  }

  #[test]
  fn groups_keep_source_alive() {
    let source = PublishSubject::new();
    let groups = Arc::new(Mutex::new(vec![]));
    let c_groups = groups.clone();
    let outer = source.observable().group_by(|v: &i32| *v / 10).subscribe(move |g| c_groups.lock().push(g));

    source.next(1);
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    let group = groups.lock()[0].observable();
    let inner = group.subscribe(move |v| c_got.lock().push(v));

    outer.dispose();
    assert_eq!(source.observer_count(), 1);
    source.next(2);
    source.next(15);
    assert_eq!(*got.lock(), vec![2]);
    assert_eq!(groups.lock().len(), 1);

    inner.dispose();
    assert_eq!(source.observer_count(), 0);
  }

  #[test]
  fn completion_and_error_reach_groups() {
    let source = PublishSubject::new();
    let log = Arc::new(Mutex::new(vec![]));
    let c_log = log.clone();
    source.observable().group_by(|v: &i32| *v).subscribe(move |g| {
      let (l1, l2) = (c_log.clone(), c_log.clone());
      g.observable().subscribe_all(move |v| l1.lock().push(format!("{v}")), |_| {}, move || l2.lock().push("done".into()));
    });
    source.next(1);
    source.next(2);
    source.complete();
    assert_eq!(*log.lock(), vec!["1", "2", "done", "done"]);
  }

  #[test]
  fn panicking_key_selector_errors() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    from_iter(1..=2)
      .group_by(|_: &i32| -> i32 { panic!("no key") })
      .subscribe_err(|_| {}, move |e| *c_err.lock() = Some(e));
    assert_eq!(*err.lock(), Some(RxError::Panicked("no key".into())));
  }
}
