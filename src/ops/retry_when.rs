use std::sync::Arc;

use crate::{
  disposable::{CompositeDisposable, Disposable, SerialDisposable},
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::retry::Resubscriber,
  util::guard,
};

/// Decides about resubscription through a notifier observable.
///
/// Every error of the source is handed to `notifier`. The first value of the
/// returned observable resubscribes to the source, its error is forwarded
/// and its completion completes the result.
pub struct RetryWhen<F>(Arc<F>);

pub fn retry_when<U, F>(notifier: F) -> RetryWhen<F>
where
  U: Send + 'static,
  F: Fn(&RxError) -> Observable<U> + Send + Sync + 'static,
{
  RetryWhen(Arc::new(notifier))
}

struct Coordinator<T, F> {
  resubscriber: Resubscriber<T>,
  notifier: Arc<F>,
  // Subscription to the notifier of the latest error.
  decision: SerialDisposable,
}

impl<T, U, F> Operator<T> for RetryWhen<F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(&RxError) -> Observable<U> + Send + Sync + 'static,
{
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let notifier = self.0;
    Observable::create(move |down: Subscriber<T>| {
      let decision = SerialDisposable::new();
      down.set_upstream(decision.clone());
      let coordinator = Arc::new(Coordinator {
        resubscriber: Resubscriber::new(source.clone(), down),
        notifier: notifier.clone(),
        decision,
      });
      coordinator.resubscriber.subscribe(|| SourceObserver::<U, _, _>::new(coordinator.clone()));
    })
  }
}

struct SourceObserver<U, T, F> {
  coordinator: Arc<Coordinator<T, F>>,
  _notifier: std::marker::PhantomData<fn() -> U>,
}

impl<U, T, F> SourceObserver<U, T, F> {
  fn new(coordinator: Arc<Coordinator<T, F>>) -> Self { SourceObserver { coordinator, _notifier: std::marker::PhantomData } }
}

impl<T, U, F> Observer<T> for SourceObserver<U, T, F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(&RxError) -> Observable<U> + Send + Sync + 'static,
{
  #[inline]
  fn on_next(&mut self, value: T) { self.coordinator.resubscriber.down.on_next(value) }

  fn on_error(&mut self, err: RxError) {
    let coordinator = &self.coordinator;
    let notifier = coordinator.notifier.clone();
    match guard(|| notifier(&err)) {
      Ok(decision) => {
        let subscription = CompositeDisposable::new();
        coordinator.decision.set(subscription.to_handle());
        let observer = DecisionObserver { coordinator: coordinator.clone(), subscription: subscription.clone() };
        decision.subscribe_with(Subscriber::with_disposable(observer, subscription));
      }
      Err(err) => coordinator.resubscriber.down.on_error(err),
    }
  }

  fn on_completed(&mut self) { self.coordinator.resubscriber.down.on_completed() }
}

struct DecisionObserver<T, F> {
  coordinator: Arc<Coordinator<T, F>>,
  subscription: CompositeDisposable,
}

impl<T, U, F> Observer<U> for DecisionObserver<T, F>
where
  T: Send + 'static,
  U: Send + 'static,
  F: Fn(&RxError) -> Observable<U> + Send + Sync + 'static,
{
  fn on_next(&mut self, _: U) {
    if self.subscription.is_disposed() {
      return;
    }
    self.subscription.dispose();
    let coordinator = self.coordinator.clone();
    self.coordinator.resubscriber.subscribe(|| SourceObserver::<U, _, _>::new(coordinator.clone()));
  }

  fn on_error(&mut self, err: RxError) { self.coordinator.resubscriber.down.on_error(err) }

  fn on_completed(&mut self) { self.coordinator.resubscriber.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn retry_when<U, F>(self, notifier: F) -> Observable<T>
  where
    U: Send + 'static,
    F: Fn(&RxError) -> Observable<U> + Send + Sync + 'static,
  {
    self.pipe(retry_when(notifier))
  }
}
