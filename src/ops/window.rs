use crate::{
  disposable::{CompositeDisposable, RefCountDisposable},
  error::RxError,
  observable::{Observable, Operator},
  observer::{Observer, Subscriber},
  subject::UnicastSubject,
};

/// Splits the source into consecutive windows of `count` values.
///
/// A window opens with its first value and completes once it holds `count`
/// values. Each window accepts a single subscriber and buffers values until
/// it arrives. As with `group_by`, the source runs while the downstream or
/// any window is subscribed.
#[derive(Debug, Clone, Copy)]
pub struct Window(usize);

pub fn window(count: usize) -> Window { Window(count.max(1)) }

impl<T: Send + 'static> Operator<T> for Window {
  type Output = Observable<Observable<T>>;

  fn apply(self, source: Observable<T>) -> Self::Output {
    let count = self.0;
    Observable::create(move |down: Subscriber<Observable<T>>| {
      let subscription = CompositeDisposable::new();
      let refcount = RefCountDisposable::new(subscription.to_handle());
      down.set_upstream(refcount.clone());
      let observer = WindowObserver { down: down.clone(), count, current: None, filled: 0, refcount };
      source.subscribe_with(Subscriber::with_disposable(observer, subscription));
    })
  }
}

struct WindowObserver<T> {
  down: Subscriber<Observable<T>>,
  count: usize,
  current: Option<UnicastSubject<T>>,
  filled: usize,
  refcount: RefCountDisposable,
}

impl<T: Send + 'static> WindowObserver<T> {
  fn open(&mut self) -> UnicastSubject<T> {
    let subject = UnicastSubject::new();
    let source = subject.observable();
    let refcount = self.refcount.clone();
    self.down.on_next(Observable::create(move |s: Subscriber<T>| {
      s.set_upstream(refcount.add_ref());
      source.subscribe_with(s);
    }));
    self.filled = 0;
    self.current = Some(subject.clone());
    subject
  }
}

impl<T: Send + 'static> Observer<T> for WindowObserver<T> {
  fn on_next(&mut self, value: T) {
    let subject = match &self.current {
      Some(subject) => subject.clone(),
      None => self.open(),
    };
    subject.next(value);
    self.filled += 1;
    if self.filled == self.count {
      self.current = None;
      subject.complete();
    }
  }

  fn on_error(&mut self, err: RxError) {
    if let Some(subject) = self.current.take() {
      subject.error(err.clone());
    }
    self.down.on_error(err);
  }

  fn on_completed(&mut self) {
    if let Some(subject) = self.current.take() {
      subject.complete();
    }
    self.down.on_completed();
  }
}

impl<T: Send + 'static> Observable<T> {
  pub fn window(self, count: usize) -> Observable<Observable<T>> { self.pipe(window(count)) }
}
