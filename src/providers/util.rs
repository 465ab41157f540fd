use anyhow::Error;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs an async operation up to `max_attempts` times, sleeping `delay`
/// between attempts.
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `max_attempts`: Total number of runs, including the first; `0` is treated as `1`
/// - `delay`: Pause between a failed attempt and the next one
///
/// # Returns
/// Either the first successful result or the error of the last attempt
pub async fn with_retry<F, Fut, T, E>(
    mut operation: F,
    max_attempts: usize,
    delay: Duration,
) -> Result<T, Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Into<Error>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await.map_err(Into::<Error>::into) {
            Ok(val) => return Ok(val),
            Err(err) => {
                warn!("Attempt {}/{} failed: {}", attempt, max_attempts, err);
                if attempt >= max_attempts {
                    return Err(err);
                }
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
        }
    }
}
