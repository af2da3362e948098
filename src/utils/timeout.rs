// src/utils/timeout.rs
// Timeout utilities

use std::future::Future;
use std::time::Duration;

use crate::error::DriftError;

/// Run an operation with a timeout, mapping expiry to `DriftError::Timeout`.
pub async fn with_timeout<F, T>(
    duration: Duration,
    operation: F,
) -> Result<T, DriftError>
where
    F: Future<Output = Result<T, DriftError>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(DriftError::Timeout(duration.as_millis() as u64)),
    }
}
