use std::{collections::VecDeque, sync::Arc};

use parking_lot::{Mutex, ReentrantMutex};

use super::{Subject, Terminal};
use crate::{
  disposable::{CallbackDisposable, CompositeDisposable, Disposable},
  error::RxError,
  observable::Observable,
  observer::{Notification, Observer, Subscriber},
};

/// A subject accepting a single subscriber.
///
/// Notifications received before the subscriber arrives are buffered and
/// replayed to it. Any further subscriber fails with
/// [`RxError::MoreThanOneObserver`].
pub struct UnicastSubject<T>(Arc<Inner<T>>);

struct Inner<T> {
  state: Mutex<State<T>>,
  emission: ReentrantMutex<()>,
  disposable: CompositeDisposable,
}

struct State<T> {
  observer: Option<Subscriber<T>>,
  subscribed: bool,
  buffer: VecDeque<T>,
  terminal: Option<Terminal>,
}

impl<T> Clone for UnicastSubject<T> {
  fn clone(&self) -> Self { UnicastSubject(self.0.clone()) }
}

impl<T: Send + 'static> Default for UnicastSubject<T> {
  fn default() -> Self {
    let inner = Arc::new(Inner {
      state: Mutex::new(State { observer: None, subscribed: false, buffer: VecDeque::new(), terminal: None }),
      emission: ReentrantMutex::new(()),
      disposable: CompositeDisposable::new(),
    });
    let weak = Arc::downgrade(&inner);
    inner.disposable.add(CallbackDisposable::new(move || {
      if let Some(inner) = weak.upgrade() {
        inner.notify(Notification::Completed, Some(Terminal::Disposed));
      }
    }));
    UnicastSubject(inner)
  }
}

impl<T: Send + 'static> UnicastSubject<T> {
  pub fn new() -> Self { Self::default() }

  pub fn next(&self, value: T) { self.0.notify(Notification::Next(value), None) }

  pub fn error(&self, err: impl Into<RxError>) {
    self.0.notify(Notification::Error(err.into()), None)
  }

  pub fn complete(&self) { self.0.notify(Notification::Completed, None) }

  /// Whether the single subscriber has arrived.
  pub fn has_observer(&self) -> bool { self.0.state.lock().subscribed }

  pub fn observable(&self) -> Observable<T> {
    let inner = self.0.clone();
    Observable::create(move |s: Subscriber<T>| {
      let _emission = inner.emission.lock();
      let (buffer, terminal) = {
        let mut state = inner.state.lock();
        if state.subscribed {
          drop(state);
          s.on_error(RxError::MoreThanOneObserver);
          return;
        }
        state.subscribed = true;
        let buffer = std::mem::take(&mut state.buffer);
        if state.terminal.is_none() {
          state.observer = Some(s.clone());
        }
        (buffer, state.terminal.clone())
      };
      let weak = Arc::downgrade(&inner);
      s.set_upstream(CallbackDisposable::new(move || {
        if let Some(inner) = weak.upgrade() {
          inner.state.lock().observer = None;
        }
      }));
      for v in buffer {
        s.on_next(v);
      }
      if let Some(terminal) = terminal {
        terminal.deliver(&s);
      }
    })
  }
}

impl<T: Send + 'static> Inner<T> {
  // `forced` overrides the terminal recorded for a completion (disposal).
  fn notify(&self, n: Notification<T>, forced: Option<Terminal>) {
    let _emission = self.emission.lock();
    let observer = {
      let mut state = self.state.lock();
      if state.terminal.is_some() {
        return;
      }
      match n {
        Notification::Next(v) => match state.observer.clone() {
          Some(observer) => {
            drop(state);
            observer.on_next(v);
            return;
          }
          None => {
            if !state.subscribed {
              state.buffer.push_back(v);
            }
            return;
          }
        },
        n => {
          let terminal = forced.or_else(|| Terminal::from_notification(n));
          state.terminal = terminal.clone();
          if matches!(terminal, Some(Terminal::Disposed)) {
            state.buffer.clear();
          }
          state.observer.take().zip(terminal)
        }
      }
    };
    if let Some((observer, terminal)) = observer {
      terminal.deliver(&observer);
    }
    self.disposable.dispose();
  }
}

struct UnicastObserver<T>(Arc<Inner<T>>);

impl<T: Send + 'static> Observer<T> for UnicastObserver<T> {
  fn on_next(&mut self, value: T) { self.0.notify(Notification::Next(value), None) }

  fn on_error(&mut self, err: RxError) { self.0.notify(Notification::Error(err), None) }

  fn on_completed(&mut self) { self.0.notify(Notification::Completed, None) }
}

impl<T: Send + 'static> Subject<T> for UnicastSubject<T> {
  fn get_observer(&self) -> Subscriber<T> {
    let s = Subscriber::new(UnicastObserver(self.0.clone()));
    self.0.disposable.add(s.disposable());
    s
  }

  fn get_observable(&self) -> Observable<T> { self.observable() }

  fn get_disposable(&self) -> CompositeDisposable { self.0.disposable.clone() }
}
