use crate::error::{ImportError, ImportResult};
use std::error::Error;
use tokio_util::sync::CancellationToken;

/// Fails with [`ImportError::Cancelled`] once `token` is cancelled.
pub fn check_cancelled(token: &CancellationToken) -> ImportResult<()> {
    if token.is_cancelled() {
        Err(ImportError::Cancelled)
    } else {
        Ok(())
    }
}

/// Whether `err`, or any error in its source chain, is [`ImportError::Cancelled`].
pub fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if matches!(err.downcast_ref::<ImportError>(), Some(ImportError::Cancelled)) {
            return true;
        }
        current = err.source();
    }
    false
}
