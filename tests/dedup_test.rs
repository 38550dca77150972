use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::join_all;
use tokio::time::sleep;
use utafm::{error::ApiError, management::RequestDeduplicator};

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_call() {
    let dedup: RequestDeduplicator<Result<u32, ApiError>> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let callers = (0..8).map(|_| {
        let calls = Arc::clone(&calls);
        dedup.deduplicate("user.getinfo:alice", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(50)).await;
            Ok(42)
        })
    });

    let results = join_all(callers).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(results.iter().all(|r| *r == Ok(42)));
    assert!(dedup.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_different_keys_run_separately() {
    let dedup: RequestDeduplicator<u32> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let callers = ["a", "b", "a", "b"].into_iter().map(|key| {
        let calls = Arc::clone(&calls);
        dedup.deduplicate(key, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(10)).await;
            1
        })
    });

    join_all(callers).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_error_reaches_every_caller_and_clears_slot() {
    let dedup: RequestDeduplicator<Result<u32, ApiError>> = RequestDeduplicator::new();
    let calls = Arc::new(AtomicUsize::new(0));

    let callers = (0..5).map(|_| {
        let calls = Arc::clone(&calls);
        dedup.deduplicate("key", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            sleep(Duration::from_millis(10)).await;
            Err(ApiError::ServerError { status: 502 })
        })
    });

    let results = join_all(callers).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(
        results
            .iter()
            .all(|r| *r == Err(ApiError::ServerError { status: 502 }))
    );
    assert!(dedup.is_empty());

    // the next call starts a fresh request
    let calls_again = Arc::clone(&calls);
    let retried = dedup
        .deduplicate("key", move || async move {
            calls_again.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        })
        .await;

    assert_eq!(retried, Ok(7));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_count_while_running() {
    let dedup = Arc::new(RequestDeduplicator::<u32>::new());

    let running = {
        let dedup = Arc::clone(&dedup);
        tokio::spawn(async move {
            dedup
                .deduplicate("slow", || async {
                    sleep(Duration::from_secs(1)).await;
                    5
                })
                .await
        })
    };

    sleep(Duration::from_millis(10)).await;
    assert_eq!(dedup.len(), 1);

    assert_eq!(running.await.ok(), Some(5));
    assert!(dedup.is_empty());
}
