use std::{
    sync::{
        Arc,
        atomic::{AtomicU32, Ordering},
    },
    time::Duration,
};

use tokio::time::Instant;
use utafm::{
    error::ApiError,
    lastfm::{RetryPolicy, with_retry},
};

// Returns `error` for the first `failures` calls and the call number after.
fn flaky(
    calls: &Arc<AtomicU32>,
    failures: u32,
    error: ApiError,
) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = Result<u32, ApiError>> + Send>> {
    let calls = Arc::clone(calls);
    move || {
        let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
        let error = error.clone();
        Box::pin(async move { if n <= failures { Err(error) } else { Ok(n) } })
    }
}

#[test]
fn test_delay_doubles_and_caps() {
    let policy = RetryPolicy::default();

    assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
    assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
    assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
    assert_eq!(policy.delay_for(3), Duration::from_millis(5000));
    assert_eq!(policy.delay_for(30), Duration::from_millis(5000));
}

#[tokio::test(start_paused = true)]
async fn test_server_errors_are_retried_with_backoff() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let result = with_retry(
        RetryPolicy::default(),
        flaky(&calls, 2, ApiError::ServerError { status: 503 }),
    )
    .await;

    assert_eq!(result, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    // 1000ms after the first failure, 2000ms after the second
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn test_last_error_is_returned_after_max_attempts() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = with_retry(RetryPolicy::default(), flaky(&calls, 10, ApiError::Timeout)).await;

    assert_eq!(result, Err(ApiError::Timeout));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_are_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));
    let start = Instant::now();

    let error = ApiError::ClientError {
        status: 400,
        message: "Invalid parameters".to_string(),
    };
    let result = with_retry(RetryPolicy::default(), flaky(&calls, 10, error.clone())).await;

    assert_eq!(result, Err(error));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_not_retried() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = with_retry(
        RetryPolicy::default(),
        flaky(&calls, 10, ApiError::RateLimited),
    )
    .await;

    assert_eq!(result, Err(ApiError::RateLimited));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_are_retried() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = with_retry(
        RetryPolicy::default(),
        flaky(&calls, 1, ApiError::Network("connection reset".to_string())),
    )
    .await;

    assert_eq!(result, Ok(2));
}
