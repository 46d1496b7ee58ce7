use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
  disposable::{CallbackDisposable, CompositeDisposable, Disposable},
  observable::Observable,
  observer::Subscriber,
  subject::{PublishSubject, Subject},
};

/// An observable sharing one upstream subscription through a subject.
///
/// Subscribers attach to the subject; the upstream is only subscribed on
/// [`connect`](Self::connect).
pub struct ConnectableObservable<T, S> {
  source: Observable<T>,
  subject: S,
  connection: Arc<Mutex<Option<CompositeDisposable>>>,
}

impl<T, S: Clone> Clone for ConnectableObservable<T, S> {
  fn clone(&self) -> Self {
    ConnectableObservable {
      source: self.source.clone(),
      subject: self.subject.clone(),
      connection: self.connection.clone(),
    }
  }
}

impl<T, S> ConnectableObservable<T, S>
where
  T: Send + 'static,
  S: Subject<T> + Clone + Send + Sync + 'static,
{
  pub fn new(source: Observable<T>, subject: S) -> Self {
    ConnectableObservable { source, subject, connection: Arc::new(Mutex::new(None)) }
  }

  /// The observable side of the subject.
  pub fn observable(&self) -> Observable<T> { self.subject.get_observable() }

  /// Subscribes the subject to the source. While a connection is alive,
  /// returns that connection instead of opening another one.
  pub fn connect(&self) -> CompositeDisposable {
    let observer = {
      let mut connection = self.connection.lock();
      if let Some(alive) = connection.as_ref().filter(|c| !c.is_disposed()) {
        return alive.clone();
      }
      let observer = self.subject.get_observer();
      *connection = Some(observer.disposable());
      observer
    };
    tracing::debug!(target: "rxplus", "connectable observable connected");
    let connection = observer.disposable();
    self.source.subscribe_with(observer);
    connection
  }

  /// Connects with the first subscriber and disconnects once the last one
  /// is gone.
  pub fn ref_count(self) -> Observable<T> {
    let subscribers = Arc::new(Mutex::new(0usize));
    Observable::create(move |s: Subscriber<T>| {
      let first = {
        let mut count = subscribers.lock();
        *count += 1;
        *count == 1
      };
      let (this, count) = (self.clone(), subscribers.clone());
      s.set_upstream(CallbackDisposable::new(move || {
        let last = {
          let mut count = count.lock();
          *count -= 1;
          *count == 0
        };
        if last {
          if let Some(connection) = this.connection.lock().take() {
            tracing::debug!(target: "rxplus", "connectable observable disconnected");
            connection.dispose();
          }
        }
      }));
      self.subject.get_observable().subscribe_with(s);
      if first {
        self.connect();
      }
    })
  }
}

impl<T: Clone + Send + 'static> Observable<T> {
  /// Shares the source through `subject`.
  pub fn multicast<S>(self, subject: S) -> ConnectableObservable<T, S>
  where
    S: Subject<T> + Clone + Send + Sync + 'static,
  {
    ConnectableObservable::new(self, subject)
  }

  /// Shares the source through a [`PublishSubject`].
  pub fn publish(self) -> ConnectableObservable<T, PublishSubject<T>> {
    self.multicast(PublishSubject::new())
  }
}
