//! Error type carried by `on_error`.
//!
//! Every notification channel in the crate carries the same error type so
//! that subjects can cache and replay a terminal error to late subscribers
//! and combining operators can forward the first error of any upstream.

use std::{any::Any, error::Error, fmt, sync::Arc};

/// The error delivered through [`Observer::on_error`].
///
/// `RxError` is cheap to clone: user payloads are reference counted.
///
/// [`Observer::on_error`]: crate::observer::Observer::on_error
#[derive(Clone, thiserror::Error)]
pub enum RxError {
  /// A `timeout` operator expired and no fallback observable was provided.
  #[error("timeout reached")]
  Timeout,

  /// A single-observer source (for example a window) was subscribed twice.
  #[error("source supports only one observer")]
  MoreThanOneObserver,

  /// A panic caught at a subscription, operator or scheduler boundary.
  #[error("panicked: {0}")]
  Panicked(String),

  /// Plain error message.
  #[error("{0}")]
  Message(Arc<str>),

  /// Arbitrary user error.
  #[error(transparent)]
  Custom(Arc<dyn Error + Send + Sync>),
}

impl RxError {
  pub fn msg(message: impl Into<Arc<str>>) -> Self { RxError::Message(message.into()) }

  pub fn custom<E: Error + Send + Sync + 'static>(err: E) -> Self { RxError::Custom(Arc::new(err)) }

  /// Converts the payload of `catch_unwind` into an error.
  pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
    let text = if let Some(s) = payload.downcast_ref::<&'static str>() {
      (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
      s.clone()
    } else {
      "unknown panic payload".to_string()
    };
    RxError::Panicked(text)
  }

  /// Attempts to view a [`RxError::Custom`] payload as a concrete type.
  pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
    match self {
      RxError::Custom(inner) => inner.downcast_ref::<E>(),
      _ => None,
    }
  }
}

impl fmt::Debug for RxError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RxError::Timeout => f.write_str("Timeout"),
      RxError::MoreThanOneObserver => f.write_str("MoreThanOneObserver"),
      RxError::Panicked(msg) => f.debug_tuple("Panicked").field(msg).finish(),
      RxError::Message(msg) => f.debug_tuple("Message").field(msg).finish(),
      RxError::Custom(inner) => f.debug_tuple("Custom").field(&inner.to_string()).finish(),
    }
  }
}

impl PartialEq for RxError {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (RxError::Timeout, RxError::Timeout) => true,
      (RxError::MoreThanOneObserver, RxError::MoreThanOneObserver) => true,
      (RxError::Panicked(a), RxError::Panicked(b)) => a == b,
      (RxError::Message(a), RxError::Message(b)) => a == b,
      (RxError::Custom(a), RxError::Custom(b)) => Arc::ptr_eq(a, b),
      _ => false,
    }
  }
}

impl From<&str> for RxError {
  fn from(value: &str) -> Self { RxError::msg(value) }
}

impl From<String> for RxError {
  fn from(value: String) -> Self { RxError::msg(value) }
}
