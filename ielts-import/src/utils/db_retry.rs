//! Bounded retry for document writes
//!
//! Every document write is retried on transient storage failures (I/O
//! errors, pool timeouts, SQLite busy/locked) up to a fixed number of
//! attempts with exponential backoff. Any other failure is returned at once.
//!
//! **Backoff:** 10ms initial, doubling, capped at 1000ms.

use ielts_common::time::millis_to_duration;
use ielts_common::Error;
use std::time::Instant;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// A write that did not succeed within its attempt budget
#[derive(Debug)]
pub struct WriteFailure {
    /// Last error returned by the operation
    pub source: Error,
    /// Attempts made, including the first
    pub attempts: u32,
    /// Whether the last error was transient (attempts ran out)
    pub transient: bool,
}

/// Whether a storage error is worth retrying
pub fn is_transient(err: &Error) -> bool {
    match err {
        Error::Database(db_err) => match db_err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Database(e) => {
                // SQLITE_BUSY = 5, SQLITE_LOCKED = 6 (extended codes keep the low byte)
                let busy_code = e
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| matches!(code & 0xff, 5 | 6))
                    .unwrap_or(false);
                let message = e.message().to_ascii_lowercase();
                busy_code || message.contains("database is locked") || message.contains("busy")
            }
            _ => false,
        },
        Error::Io(_) => true,
        _ => false,
    }
}

/// Run `operation` until it succeeds, fails permanently, or has been
/// attempted `max_attempts` times
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "upsert test")
/// * `max_attempts` - Attempt budget, at least 1
/// * `operation` - Async closure performing one write attempt
pub async fn retry_write<F, Fut, T>(
    operation_name: &str,
    max_attempts: u32,
    mut operation: F,
) -> std::result::Result<T, WriteFailure>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ielts_common::Result<T>>,
{
    let max_attempts = max_attempts.max(1);
    let start_time = Instant::now();
    let mut attempt = 0;
    let mut backoff_ms = INITIAL_BACKOFF_MS;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        "Write succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_transient(&err) {
                    return Err(WriteFailure {
                        source: err,
                        attempts: attempt,
                        transient: false,
                    });
                }

                if attempt >= max_attempts {
                    tracing::error!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis() as u64,
                        error = %err,
                        "Write failed: retry attempts exhausted"
                    );
                    return Err(WriteFailure {
                        source: err,
                        attempts: attempt,
                        transient: true,
                    });
                }

                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    backoff_ms,
                    error = %err,
                    "Transient storage failure, will retry after backoff"
                );

                tokio::time::sleep(millis_to_duration(backoff_ms)).await;
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_write("test_op", 3, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result = retry_write("test_op", 3, move || {
            let calls = calls_clone.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(Error::Database(sqlx::Error::PoolTimedOut))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: std::result::Result<(), _> = retry_write("test_op", 3, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Database(sqlx::Error::PoolTimedOut))
            }
        })
        .await;

        let failure = result.unwrap_err();
        assert!(failure.transient);
        assert_eq!(failure.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls_clone = calls.clone();

        let result: std::result::Result<(), _> = retry_write("test_op", 5, move || {
            let calls = calls_clone.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Database(sqlx::Error::RowNotFound))
            }
        })
        .await;

        let failure = result.unwrap_err();
        assert!(!failure.transient);
        assert_eq!(failure.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_classification() {
        assert!(is_transient(&Error::Database(sqlx::Error::PoolTimedOut)));
        assert!(!is_transient(&Error::Database(sqlx::Error::RowNotFound)));
        assert!(!is_transient(&Error::InvalidInput("x".to_string())));
    }
}
