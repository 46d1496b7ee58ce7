use std::sync::Arc;

use crate::{
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  ops::Forward,
  util::guard,
};

/// Replaces a failing source with the observable `selector` builds from the
/// error.
pub struct OnErrorResumeNext<F>(Arc<F>);

pub fn on_error_resume_next<T, F>(selector: F) -> OnErrorResumeNext<F>
where
  F: Fn(RxError) -> Observable<T> + Send + Sync + 'static,
{
  OnErrorResumeNext(Arc::new(selector))
}

impl<T, F> Operator<T> for OnErrorResumeNext<F>
where
  T: Send + 'static,
  F: Fn(RxError) -> Observable<T> + Send + Sync + 'static,
{
  type Output = Observable<T>;

  fn apply(self, source: Observable<T>) -> Observable<T> {
    let selector = self.0;
    source.lift(move |down: Subscriber<T>| ResumeObserver { down, selector: selector.clone() })
  }
}

struct ResumeObserver<T, F> {
  down: Subscriber<T>,
  selector: Arc<F>,
}

impl<T, F> Observer<T> for ResumeObserver<T, F>
where
  T: Send + 'static,
  F: Fn(RxError) -> Observable<T> + Send + Sync + 'static,
{
  #[inline]
  fn on_next(&mut self, value: T) { self.down.on_next(value) }

  fn on_error(&mut self, err: RxError) {
    let selector = &self.selector;
    match guard(|| selector(err)) {
      Ok(fallback) => {
        if self.down.is_disposed() {
          return;
        }
        let up = Subscriber::new(Forward(self.down.clone()));
        self.down.set_upstream(up.disposable());
        fallback.subscribe_with(up);
      }
      Err(err) => self.down.on_error(err),
    }
  }

  fn on_completed(&mut self) { self.down.on_completed() }
}

impl<T: Send + 'static> Observable<T> {
  pub fn on_error_resume_next<F>(self, selector: F) -> Observable<T>
  where
    F: Fn(RxError) -> Observable<T> + Send + Sync + 'static,
  {
    self.pipe(on_error_resume_next(selector))
  }
}

#[cfg(test)]
mod tests {
  use parking_lot::Mutex;

  use super::*;
  use crate::{
    observable::{from_iter, just, throw},
    subject::PublishSubject,
  };

  #[test]
  fn continues_with_fallback() {
    let log = Arc::new(Mutex::new(vec![]));
    let (l1, l2) = (log.clone(), log.clone());
    from_iter(1..=2)
      .concat_with(throw("boom"))
      .on_error_resume_next(|_| from_iter(vec![10, 20]))
      .subscribe_all(move |v| l1.lock().push(v), |_| {}, move || l2.lock().push(-1));
    assert_eq!(*log.lock(), vec![1, 2, 10, 20, -1]);
  }

  #[test]
  fn selector_sees_the_error() {
    let got = Arc::new(Mutex::new(vec![]));
    let c_got = got.clone();
    throw::<String>("missing")
      .on_error_resume_next(|e| just(format!("recovered from {e}")))
      .subscribe(move |v| c_got.lock().push(v));
    assert_eq!(*got.lock(), vec!["recovered from missing".to_string()]);
  }

  #[test]
  fn panicking_selector_errors() {
    let err = Arc::new(Mutex::new(None));
    let c_err = err.clone();
    throw::<i32>("first")
      .on_error_resume_next(|_| -> Observable<i32> { panic!("selector failed") })
      .subscribe_err(|_| {}, move |e| *c_err.lock() = Some(e));
    assert_eq!(*err.lock(), Some(RxError::Panicked("selector failed".into())));
  }

  #[test]
  fn completion_passes_through() {
    let source = PublishSubject::new();
    let done = Arc::new(Mutex::new(false));
    let c_done = done.clone();
    source
      .observable()
      .on_error_resume_next(|_| just(0))
      .subscribe_all(|_| {}, |_| {}, move || *c_done.lock() = true);
    source.complete();
    assert!(*done.lock());
  }
}
