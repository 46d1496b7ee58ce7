use std::panic::{self, AssertUnwindSafe};

use crate::error::RxError;

/// Runs a user callback, turning a panic into an error.
pub(crate) fn guard<R>(f: impl FnOnce() -> R) -> Result<R, RxError> {
  panic::catch_unwind(AssertUnwindSafe(f)).map_err(RxError::from_panic)
}
