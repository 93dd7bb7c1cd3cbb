use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Returned when [`retry_with_backoff`] exhausts its attempts.
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: u32,
    pub source: E,
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.source)
    }
}

impl<E: std::error::Error + 'static> std::error::Error for RetryError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Run `op` up to `attempts` times with a fixed `delay` between failures.
///
/// `op` receives the 1-based attempt number. The delay is only slept when
/// another attempt remains; exhaustion returns the last error wrapped in
/// [`RetryError`].
pub async fn retry_with_backoff<T, E, F, Fut>(
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: fmt::Display,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    debug_assert!(attempts > 0);
    let mut last = None;
    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt < attempts {
                    log::warn!("attempt {attempt}/{attempts} failed: {e}; retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                } else {
                    log::warn!("attempt {attempt}/{attempts} failed: {e}; no more retries");
                }
                last = Some(e);
            }
        }
    }
    Err(RetryError {
        attempts,
        source: last.expect("at least one attempt was made"),
    })
}
