//! Prelude module for convenient imports
//!
//! This module re-exports commonly used types and traits for easy access.

// Disposables
pub use crate::disposable::{
  BoolDisposable, CallbackDisposable, CompositeDisposable, Disposable, DisposableGuard, DisposableHandle,
  RefCountDisposable, SerialDisposable,
};
// Errors
pub use crate::error::RxError;
// Observable, its sources and operators
pub use crate::observable::{self, ConnectableObservable, Observable, Operator};
pub use crate::observer::{LambdaObserver, Notification, Observer, Subscriber};
pub use crate::ops::{self, GroupedObservable};
// Schedulers
pub use crate::scheduler::{
  CurrentThread, Delay, Immediate, NewThread, RunLoop, Schedulable, Scheduler, TaskHandle, TestScheduler, ThreadPool,
  Trampoline, Worker, WorkerExt,
};
// Subjects
pub use crate::subject::{BehaviorSubject, PublishSubject, ReplaySubject, SerializedSubject, Subject, UnicastSubject};
