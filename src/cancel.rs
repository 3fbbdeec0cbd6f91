//! Cancellation helpers.

use crate::error::{Result, ScoutError};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Race a fallible future against a cancellation token.
///
/// Cancellation wins ties so an already-cancelled token never starts work.
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScoutError::Cancelled),
        result = fut => result,
    }
}
