use std::sync::atomic::AtomicI32;
use std::sync::atomic::Ordering;

use async_trait::async_trait;

use super::*;
use pretty_assertions::assert_eq;

/// Mock embedding provider for testing.
#[derive(Debug)]
struct MockProvider {
    dimension: i32,
    batch_calls: AtomicI32,
    single_calls: AtomicI32,
    /// Texts containing this marker fail to embed.
    poison: Option<&'static str>,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            dimension: 4,
            batch_calls: AtomicI32::new(0),
            single_calls: AtomicI32::new(0),
            poison: None,
        }
    }

    fn poisoned(marker: &'static str) -> Self {
        Self {
            poison: Some(marker),
            ..Self::new()
        }
    }

    fn check(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = self.poison
            && text.contains(marker)
        {
            return Err(RetrievalErr::EmbeddingFailed {
                cause: format!("cannot embed {text}"),
            });
        }
        Ok(vec![0.5; self.dimension as usize])
    }
}

#[async_trait]
impl EmbeddingProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn dimension(&self) -> i32 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.check(text)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        texts.iter().map(|t| self.check(t)).collect()
    }
}

fn requests(n: usize) -> Vec<EmbeddingRequest> {
    (0..n)
        .map(|i| EmbeddingRequest {
            id: format!("chunk-{i}"),
            text: format!("text {i}"),
        })
        .collect()
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 1,
        base_delay_ms: 1,
        ..RetryConfig::default()
    }
}

#[tokio::test]
async fn test_queue_creation() {
    let provider = Arc::new(MockProvider::new());
    let queue = EmbeddingQueue::new(provider);
    assert_eq!(queue.workers, DEFAULT_WORKERS);
    assert_eq!(queue.batch_size, DEFAULT_BATCH_SIZE);

    let queue = queue.with_workers(0).with_batch_size(-3);
    assert_eq!(queue.workers, 1);
    assert_eq!(queue.batch_size, 1);
}

#[tokio::test]
async fn test_empty_requests() {
    let provider = Arc::new(MockProvider::new());
    let queue = EmbeddingQueue::new(provider.clone());
    let results = queue.process_all(vec![]).await.expect("process");
    assert!(results.is_empty());
    assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_multiple_batches_keep_request_order() {
    let provider = Arc::new(MockProvider::new());
    let queue = EmbeddingQueue::new(provider.clone())
        .with_batch_size(3)
        .with_workers(2);

    let results = queue.process_all(requests(10)).await.expect("process");

    assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 4);
    let ids: Vec<String> = results.iter().map(|r| r.id.clone()).collect();
    let expected: Vec<String> = (0..10).map(|i| format!("chunk-{i}")).collect();
    assert_eq!(ids, expected);
    assert!(results.iter().all(|r| r.embedding.is_some()));
}

#[tokio::test]
async fn test_failed_batch_falls_back_to_single_items() {
    let provider = Arc::new(MockProvider::poisoned("text 1"));
    let queue = EmbeddingQueue::new(provider.clone())
        .with_batch_size(3)
        .with_retry_config(fast_retry());

    let results = queue.process_all(requests(3)).await.expect("process");

    let failed: Vec<&str> = results
        .iter()
        .filter(|r| r.embedding.is_none())
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(failed, vec!["chunk-1"]);
    assert!(
        results[1]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("cannot embed"))
    );
    // two batch attempts, then one call per item, the poisoned one retried once
    assert_eq!(provider.batch_calls.load(Ordering::SeqCst), 2);
    assert_eq!(provider.single_calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_failed_batch_without_fallback() {
    let provider = Arc::new(MockProvider::poisoned("text"));
    let queue = EmbeddingQueue::new(provider.clone()).with_retry_config(RetryConfig {
        fallback_to_single: false,
        ..fast_retry()
    });

    let results = queue.process_all(requests(2)).await.expect("process");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.error.is_some()));
    assert_eq!(provider.single_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_from_config() {
    let embedding = EmbeddingConfig {
        batch_size: 8,
        workers: 3,
        ..EmbeddingConfig::default()
    };
    let queue = EmbeddingQueue::from_config(
        Arc::new(MockProvider::new()),
        &embedding,
        &RetryConfig::default(),
    );
    assert_eq!(queue.batch_size, 8);
    assert_eq!(queue.workers, 3);
}
