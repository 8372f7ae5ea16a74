//! Timeout helpers shared by the handshake and the I/O loops.

use std::future::Future;
use std::time::Duration;

use crate::error::{ConnectionError, Result};

/// Default socket read timeout and handshake wait
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default time allowed for the writer to flush and close on shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Run `future`, failing with [`ConnectionError::Timeout`] once `duration` elapses.
pub async fn with_timeout<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| ConnectionError::Timeout)
}

/// Like [`with_timeout`] for fallible futures, flattening the inner error.
pub async fn with_timeout_error<F, T>(future: F, duration: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    with_timeout(future, duration).await?
}
