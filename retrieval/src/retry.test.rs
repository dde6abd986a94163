use super::*;
use std::sync::Arc;
use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

fn fast_config(max_retries: i32) -> RetryConfig {
    RetryConfig {
        timeout_ms: 50,
        max_retries,
        base_delay_ms: 1,
        fallback_to_single: true,
    }
}

#[test]
fn test_backoff_is_exponential() {
    let config = RetryConfig::default();
    assert_eq!(backoff_delay(&config, 0), Duration::from_millis(100));
    assert_eq!(backoff_delay(&config, 1), Duration::from_millis(200));
    assert_eq!(backoff_delay(&config, 3), Duration::from_millis(800));
}

#[tokio::test]
async fn test_retries_transient_errors_until_success() {
    let calls = Arc::new(AtomicI32::new(0));
    let counter = calls.clone();
    let result = with_retry(&fast_config(3), "embed", || {
        let counter = counter.clone();
        async move {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(RetrievalErr::EmbeddingFailed {
                    cause: "503".to_string(),
                })
            } else {
                Ok(n)
            }
        }
    })
    .await;

    assert_eq!(result.expect("should succeed"), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_non_retryable_error_returns_immediately() {
    let calls = Arc::new(AtomicI32::new(0));
    let counter = calls.clone();
    let result: Result<()> = with_retry(&fast_config(3), "search", || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(RetrievalErr::InvalidInput("bad".to_string()))
        }
    })
    .await;

    assert!(matches!(result, Err(RetrievalErr::InvalidInput(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let calls = Arc::new(AtomicI32::new(0));
    let counter = calls.clone();
    let result: Result<()> = with_retry(&fast_config(1), "search_hybrid", || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    })
    .await;

    match result {
        Err(RetrievalErr::Timeout { operation, .. }) => assert_eq!(operation, "search_hybrid"),
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
