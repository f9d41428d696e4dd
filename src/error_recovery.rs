// src/error_recovery.rs
//! Fixed-delay retry for API operations.

use crate::error::AppError;
use std::time::Duration;

/// Retries an async operation on transport failures, sleeping `delay`
/// between attempts. Any other error is returned immediately.
pub async fn retry_on_transport<F, T, Fut>(
    mut operation: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts.max(1) {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transport() => {
                if attempt < max_attempts {
                    log::warn!(
                        "Attempt {} failed ({}), retrying after {:?}",
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: "Retry failed with no error".to_string(),
    }))
}
