use std::future::Future;

pub use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// `Ok` when no token is attached or it has not fired.
pub(crate) fn check(token: Option<&CancellationToken>) -> Result<()> {
    match token {
        Some(token) if token.is_cancelled() => Err(Error::Cancelled),
        _ => Ok(()),
    }
}

/// Runs `fut` until it completes or the token fires, whichever comes first.
/// An in-flight remote call is dropped on cancellation.
pub(crate) async fn guarded<T, F>(token: Option<&CancellationToken>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match token {
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => Err(Error::Cancelled),
                out = fut => out,
            }
        }
        None => fut.await,
    }
}
