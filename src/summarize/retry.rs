//! Exponential backoff retry for summarizer calls.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::debug;

/// Default total attempts per summarizer call.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const INITIAL_INTERVAL_MILLIS: u64 = 500;
const MAX_INTERVAL_SECS: u64 = 10;

/// Retry an async operation with exponential backoff.
///
/// `attempt` is called up to `max_attempts` times (at least once). Errors for
/// which `is_fatal` returns true are returned immediately without retrying.
/// Otherwise the last error is handed to `wrap_exhausted` once all attempts
/// have failed.
pub async fn retry_with_backoff<T, E, Fut, F, P, W>(
    max_attempts: u32,
    mut attempt: F,
    is_fatal: P,
    wrap_exhausted: W,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    W: FnOnce(E) -> E,
{
    let max_attempts = max_attempts.max(1);
    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_millis(INITIAL_INTERVAL_MILLIS),
        max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        max_elapsed_time: None,
        ..Default::default()
    };

    let mut attempts = 0;
    loop {
        attempts += 1;

        match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) if attempts >= max_attempts => return Err(wrap_exhausted(e)),
            Err(_) => {
                if let Some(wait_duration) = backoff.next_backoff() {
                    debug!(
                        "Attempt {}/{} failed, retrying in {:?}",
                        attempts, max_attempts, wait_duration
                    );
                    tokio::time::sleep(wait_duration).await;
                }
            }
        }
    }
}
