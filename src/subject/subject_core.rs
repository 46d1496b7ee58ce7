use std::{
  mem,
  sync::{Arc, Weak},
};

use parking_lot::Mutex;

use super::Terminal;
use crate::{
  disposable::{CallbackDisposable, CompositeDisposable, Disposable},
  observer::{Observer, Subscriber},
};

type Observers<T> = Arc<Vec<(u64, Subscriber<T>)>>;

enum State<T> {
  // Copy-on-write list: a broadcast iterates a snapshot without the lock.
  Live { observers: Observers<T>, next_id: u64 },
  Terminated(Terminal),
}

/// Observer list and terminal state shared by every subject flavour.
pub(crate) struct SubjectCore<T> {
  state: Mutex<State<T>>,
  disposable: CompositeDisposable,
}

impl<T: Clone + Send + 'static> SubjectCore<T> {
  pub(crate) fn new() -> Arc<Self> {
    let core = Arc::new(SubjectCore {
      state: Mutex::new(State::Live { observers: Arc::new(vec![]), next_id: 0 }),
      disposable: CompositeDisposable::new(),
    });
    let weak = Arc::downgrade(&core);
    core.disposable.add(CallbackDisposable::new(move || {
      if let Some(core) = weak.upgrade() {
        core.terminate(Terminal::Disposed);
      }
    }));
    core
  }

  /// Registers `s`, or returns the terminal state it should receive instead.
  pub(crate) fn add(self: &Arc<Self>, s: &Subscriber<T>) -> Result<(), Terminal> {
    let id = {
      let mut state = self.state.lock();
      match &mut *state {
        State::Live { observers, next_id } => {
          let id = *next_id;
          *next_id += 1;
          Arc::make_mut(observers).push((id, s.clone()));
          id
        }
        State::Terminated(t) => return Err(t.clone()),
      }
    };
    let weak: Weak<Self> = Arc::downgrade(self);
    s.set_upstream(CallbackDisposable::new(move || {
      if let Some(core) = weak.upgrade() {
        core.remove(id);
      }
    }));
    Ok(())
  }

  fn remove(&self, id: u64) {
    if let State::Live { observers, .. } = &mut *self.state.lock() {
      Arc::make_mut(observers).retain(|(i, _)| *i != id);
    }
  }

  /// Sends `value` to a snapshot of the current observers. The last observer
  /// gets the value itself, the others a clone.
  pub(crate) fn next(&self, value: T) {
    let observers = match &*self.state.lock() {
      State::Live { observers, .. } => observers.clone(),
      State::Terminated(_) => return,
    };
    if let Some(((_, last), rest)) = observers.split_last() {
      for (_, s) in rest {
        s.on_next(value.clone());
      }
      last.on_next(value);
    }
  }

  /// Moves to `terminal` and notifies the observers. Only the first call
  /// has an effect.
  pub(crate) fn terminate(&self, terminal: Terminal) {
    let observers = {
      let mut state = self.state.lock();
      if matches!(*state, State::Terminated(_)) {
        return;
      }
      match mem::replace(&mut *state, State::Terminated(terminal.clone())) {
        State::Live { observers, .. } => observers,
        State::Terminated(_) => return,
      }
    };
    for (_, s) in observers.iter() {
      terminal.clone().deliver(s);
    }
    self.disposable.dispose();
  }

  pub(crate) fn terminal(&self) -> Option<Terminal> {
    match &*self.state.lock() {
      State::Live { .. } => None,
      State::Terminated(t) => Some(t.clone()),
    }
  }

  pub(crate) fn observer_count(&self) -> usize {
    match &*self.state.lock() {
      State::Live { observers, .. } => observers.len(),
      State::Terminated(_) => 0,
    }
  }

  #[inline]
  pub(crate) fn disposable(&self) -> CompositeDisposable { self.disposable.clone() }

  /// A fresh observer feeding this core. It is disposed with the subject.
  pub(crate) fn observer(self: &Arc<Self>) -> Subscriber<T> {
    let s = Subscriber::new(CoreObserver(self.clone()));
    self.disposable.add(s.disposable());
    s
  }
}

/// Forwards into a [`SubjectCore`].
pub(crate) struct CoreObserver<T>(pub(crate) Arc<SubjectCore<T>>);

impl<T: Clone + Send + 'static> Observer<T> for CoreObserver<T> {
  #[inline]
  fn on_next(&mut self, value: T) { self.0.next(value) }

  #[inline]
  fn on_error(&mut self, err: crate::error::RxError) { self.0.terminate(Terminal::Error(err)) }

  #[inline]
  fn on_completed(&mut self) { self.0.terminate(Terminal::Completed) }
}
