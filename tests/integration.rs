//! Integration tests for rxplus
//!
//! Tests operator chains across modules, scheduler interplay and threading
//! behavior through the public API only.

use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
  },
  thread,
  time::Duration,
};

use parking_lot::Mutex;
use rxplus::prelude::*;

type Log<T> = Arc<Mutex<Vec<T>>>;

fn log<T>() -> Log<T> { Arc::new(Mutex::new(Vec::new())) }

#[test]
fn test_basic_chain_integration() {
  let result = log();
  let c_result = result.clone();

  observable::from_iter(1..=10)
    .map(|x| x * 2)
    .filter(|&x| x > 10)
    .take(3)
    .subscribe(move |v| c_result.lock().push(v));

  assert_eq!(*result.lock(), vec![12, 14, 16]);
}

#[test]
fn test_combine_latest_trace() {
  let a = PublishSubject::new();
  let b = PublishSubject::new();
  let result = log();
  let c_result = result.clone();
  a.observable().combine_latest_with(b.observable()).subscribe(move |v| c_result.lock().push(v));

  a.next(1);
  b.next(5);
  b.next(6);
  a.next(2);
  b.next(7);

  assert_eq!(*result.lock(), vec![(1, 5), (1, 6), (2, 6), (2, 7)]);
}

#[test]
fn test_zip_pairs_then_completes() {
  let a = PublishSubject::new();
  let b = PublishSubject::new();
  let result = log();
  let (c_next, c_done) = (result.clone(), result.clone());
  a.observable().zip_with(b.observable()).subscribe_all(
    move |v| c_next.lock().push(format!("{v:?}")),
    |_| {},
    move || c_done.lock().push("completed".to_string()),
  );

  a.next(1);
  a.next(2);
  b.next(5);
  b.next(6);
  b.complete();

  assert_eq!(*result.lock(), vec!["(1, 5)", "(2, 6)", "completed"]);
}

#[test]
fn test_concat_never_overlaps() {
  let first = PublishSubject::new();
  let second = PublishSubject::new();
  let result = log();
  let c_result = result.clone();
  first.observable().concat_with(second.observable()).subscribe(move |v| c_result.lock().push(v));

  assert_eq!(second.observer_count(), 0);
  first.next(1);
  second.next(100);
  first.complete();
  assert_eq!(second.observer_count(), 1);
  second.next(2);

  assert_eq!(*result.lock(), vec![1, 2]);
}

#[test]
fn test_debounce_collapses_on_virtual_time() {
  let scheduler = TestScheduler::new();
  let source = PublishSubject::new();
  let result = log();
  let c_result = result.clone();
  let clock = scheduler.clone();
  source
    .observable()
    .debounce(Duration::from_secs(2), scheduler.clone())
    .subscribe(move |v| c_result.lock().push((clock.elapsed(), v)));

  source.next(1);
  scheduler.time_advance(Duration::from_secs(1));
  source.next(2);
  for _ in 0..5 {
    scheduler.time_advance(Duration::from_secs(1));
  }

  assert_eq!(*result.lock(), vec![(Duration::from_secs(3), 2)]);
}

#[test]
fn test_merge_fan_in_from_threads() {
  const THREADS: usize = 8;
  const PER_THREAD: usize = 1_000;

  let subjects: Vec<PublishSubject<usize>> = (0..THREADS).map(|_| PublishSubject::new()).collect();
  let count = Arc::new(AtomicUsize::new(0));
  let done = Arc::new(AtomicUsize::new(0));
  let (c_count, c_done) = (count.clone(), done.clone());
  observable::merge(subjects.iter().map(PublishSubject::observable).collect()).subscribe_all(
    move |_| {
      c_count.fetch_add(1, Ordering::Relaxed);
    },
    |_| {},
    move || {
      c_done.fetch_add(1, Ordering::Relaxed);
    },
  );

  let handles: Vec<_> = subjects
    .into_iter()
    .map(|subject| {
      thread::spawn(move || {
        for i in 0..PER_THREAD {
          subject.next(i);
        }
        subject.complete();
      })
    })
    .collect();
  for handle in handles {
    handle.join().unwrap();
  }

  assert_eq!(count.load(Ordering::Relaxed), THREADS * PER_THREAD);
  assert_eq!(done.load(Ordering::Relaxed), 1);
}

#[test]
fn test_immediate_nested_ordering() {
  let result = log();
  let worker = Immediate.create_worker();
  let handle = CompositeDisposable::new();
  let (r, w) = (result.clone(), worker.clone());
  worker.schedule_once(Duration::ZERO, handle.clone(), move |h| {
    r.lock().push("Task1 starts");
    let (r2, w2) = (r.clone(), w.clone());
    w.schedule_once(Duration::ZERO, h.clone(), move |h| {
      r2.lock().push("Task2 starts");
      let r3 = r2.clone();
      w2.schedule_once(Duration::ZERO, h.clone(), move |_| r3.lock().push("Task3 runs"));
      r2.lock().push("Task2 ends");
    });
    r.lock().push("Task1 ends");
  });

  assert_eq!(*result.lock(), vec!["Task1 starts", "Task2 starts", "Task3 runs", "Task2 ends", "Task1 ends"]);
}

#[test]
fn test_scheduler_cancellation() {
  let scheduler = TestScheduler::new();
  let result = log();
  let c_result = result.clone();
  let subscription = observable::interval(Duration::from_secs(1), scheduler.clone())
    .map(|v| v * 10)
    .subscribe(move |v| c_result.lock().push(v));

  scheduler.time_advance(Duration::from_secs(2));
  subscription.dispose();
  scheduler.time_advance(Duration::from_secs(10));

  assert_eq!(*result.lock(), vec![0, 10]);
}

#[test]
fn test_observe_on_thread_pool_keeps_order() {
  let pool = ThreadPool::new(4);
  let result = log();
  let (c_result, c_done) = (result.clone(), result.clone());
  let (tx, rx) = std::sync::mpsc::channel();
  observable::from_iter(0..100).observe_on(pool).subscribe_all(
    move |v| c_result.lock().push(v),
    |_| {},
    move || {
      c_done.lock().push(-1);
      let _ = tx.send(());
    },
  );
  rx.recv_timeout(Duration::from_secs(5)).unwrap();

  let mut expected: Vec<i32> = (0..100).collect();
  expected.push(-1);
  assert_eq!(*result.lock(), expected);
}

#[test]
fn test_retry_then_group_by() {
  let attempts = Arc::new(AtomicUsize::new(0));
  let c_attempts = attempts.clone();
  let source = observable::defer(move || {
    if c_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
      observable::from_iter(vec![1]).concat_with(observable::throw("flaky"))
    } else {
      observable::from_iter(vec![1, 2, 3, 4])
    }
  });

  let result = log();
  let c_result = result.clone();
  source.retry(1).group_by(|v| v % 2).subscribe(move |group| {
    let key = *group.key();
    let result = c_result.clone();
    group.observable().subscribe(move |v| result.lock().push((key, v)));
  });

  assert_eq!(*result.lock(), vec![(1, 1), (1, 1), (0, 2), (1, 3), (0, 4)]);
}

#[test]
fn test_publish_ref_count_shares_source() {
  let subscriptions = Arc::new(AtomicUsize::new(0));
  let c_subscriptions = subscriptions.clone();
  let source = PublishSubject::new();
  let upstream = source.observable();
  let shared = observable::defer(move || {
    c_subscriptions.fetch_add(1, Ordering::SeqCst);
    upstream.clone()
  })
  .publish()
  .ref_count();

  let (a, b) = (log(), log());
  let (c_a, c_b) = (a.clone(), b.clone());
  let first = shared.subscribe(move |v| c_a.lock().push(v));
  let second = shared.subscribe(move |v| c_b.lock().push(v));
  source.next(7);

  assert_eq!(subscriptions.load(Ordering::SeqCst), 1);
  assert_eq!(*a.lock(), vec![7]);
  assert_eq!(*b.lock(), vec![7]);

  first.dispose();
  second.dispose();
  assert_eq!(source.observer_count(), 0);
}

#[test]
fn test_subscribe_on_new_thread_with_blocking_iter() {
  let values: Result<Vec<i32>, RxError> = observable::from_iter(1..=5)
    .subscribe_on(NewThread::with_name("integration"))
    .map(|v| v * v)
    .blocking_iter()
    .collect();
  assert_eq!(values, Ok(vec![1, 4, 9, 16, 25]));
}
