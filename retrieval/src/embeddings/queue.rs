//! Concurrent embedding queue for batch processing.
//!
//! Chunks are embedded in batches by a bounded number of workers. A batch
//! that keeps failing after retries falls back to one-by-one embedding, so
//! a single bad text only fails its own chunk.

use std::collections::HashMap;
use std::sync::Arc;

use futures::stream::FuturesUnordered;
use futures::stream::StreamExt;
use tokio::sync::mpsc;

use crate::config::EmbeddingConfig;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::retry::with_retry;
use crate::traits::EmbeddingProvider;

/// Default number of concurrent workers.
const DEFAULT_WORKERS: i32 = 4;
/// Default batch size for embedding requests.
const DEFAULT_BATCH_SIZE: i32 = 100;

/// Request to embed a chunk of text.
#[derive(Debug, Clone)]
pub struct EmbeddingRequest {
    /// Chunk id.
    pub id: String,
    /// Text to embed.
    pub text: String,
}

/// Result of an embedding request.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// Request ID.
    pub id: String,
    /// Embedding vector (None if failed).
    pub embedding: Option<Vec<f32>>,
    /// Error message if failed.
    pub error: Option<String>,
}

impl EmbeddingResult {
    fn ok(id: String, embedding: Vec<f32>) -> Self {
        Self {
            id,
            embedding: Some(embedding),
            error: None,
        }
    }

    fn failed(id: String, error: String) -> Self {
        Self {
            id,
            embedding: None,
            error: Some(error),
        }
    }
}

/// Concurrent embedding queue.
pub struct EmbeddingQueue {
    provider: Arc<dyn EmbeddingProvider>,
    workers: i32,
    batch_size: i32,
    retry_config: RetryConfig,
}

impl EmbeddingQueue {
    /// Create a new embedding queue.
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            provider,
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            retry_config: RetryConfig::default(),
        }
    }

    /// Queue sized by the embedding section and retrying per `retry`.
    pub fn from_config(
        provider: Arc<dyn EmbeddingProvider>,
        embedding: &EmbeddingConfig,
        retry: &RetryConfig,
    ) -> Self {
        Self::new(provider)
            .with_workers(embedding.workers)
            .with_batch_size(embedding.batch_size)
            .with_retry_config(retry.clone())
    }

    /// Set the number of concurrent workers.
    pub fn with_workers(mut self, workers: i32) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: i32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Set the retry configuration.
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Embed `requests`, streaming results as batches complete.
    pub async fn process(
        &self,
        requests: Vec<EmbeddingRequest>,
    ) -> Result<mpsc::Receiver<EmbeddingResult>> {
        let (tx, rx) = mpsc::channel(requests.len().max(1));

        if requests.is_empty() {
            return Ok(rx);
        }

        let batches: Vec<Vec<EmbeddingRequest>> = requests
            .chunks(self.batch_size as usize)
            .map(<[EmbeddingRequest]>::to_vec)
            .collect();

        let job = BatchJob {
            provider: self.provider.clone(),
            tx,
            retry: self.retry_config.clone(),
        };
        let workers = self.workers as usize;

        tokio::spawn(async move {
            let mut pending = batches.into_iter();
            let mut running: FuturesUnordered<_> =
                pending.by_ref().take(workers).map(|b| job.spawn(b)).collect();

            while let Some(joined) = running.next().await {
                if let Err(e) = joined {
                    tracing::warn!("Embedding batch task failed: {e}");
                }
                if let Some(batch) = pending.next() {
                    running.push(job.spawn(batch));
                }
            }
        });

        Ok(rx)
    }

    /// Embed `requests` and return one result per request, in request order.
    pub async fn process_all(
        &self,
        requests: Vec<EmbeddingRequest>,
    ) -> Result<Vec<EmbeddingResult>> {
        let order: HashMap<String, usize> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        let total = requests.len();

        let mut rx = self.process(requests).await?;
        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }

        results.sort_by_key(|r| order.get(&r.id).copied().unwrap_or(usize::MAX));
        Ok(results)
    }
}

/// Shared state handed to every batch task.
struct BatchJob {
    provider: Arc<dyn EmbeddingProvider>,
    tx: mpsc::Sender<EmbeddingResult>,
    retry: RetryConfig,
}

impl BatchJob {
    fn spawn(&self, batch: Vec<EmbeddingRequest>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(process_batch(
            self.provider.clone(),
            batch,
            self.tx.clone(),
            self.retry.clone(),
        ))
    }
}

/// Check the vector length against the provider's dimension.
fn checked(provider: &dyn EmbeddingProvider, embedding: Vec<f32>) -> Result<Vec<f32>> {
    let expected = provider.dimension();
    if embedding.len() != expected as usize {
        return Err(RetrievalErr::EmbeddingDimensionMismatch {
            expected,
            actual: embedding.len() as i32,
        });
    }
    Ok(embedding)
}

async fn process_batch(
    provider: Arc<dyn EmbeddingProvider>,
    batch: Vec<EmbeddingRequest>,
    tx: mpsc::Sender<EmbeddingResult>,
    config: RetryConfig,
) {
    let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();

    let outcome = with_retry(&config, "embed_batch", || provider.embed_batch(&texts)).await;
    let error = match outcome {
        Ok(embeddings) if embeddings.len() == batch.len() => {
            for (request, embedding) in batch.into_iter().zip(embeddings) {
                let result = match checked(provider.as_ref(), embedding) {
                    Ok(embedding) => EmbeddingResult::ok(request.id, embedding),
                    Err(e) => EmbeddingResult::failed(request.id, e.to_string()),
                };
                let _ = tx.send(result).await;
            }
            return;
        }
        Ok(embeddings) => RetrievalErr::EmbeddingFailed {
            cause: format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
        },
        Err(e) => e,
    };

    tracing::error!(
        error = %error,
        batch_size = batch.len(),
        fallback = config.fallback_to_single,
        "Batch embedding failed after all retries"
    );

    if config.fallback_to_single {
        process_single_items(provider, batch, tx, config).await;
    } else {
        let error_msg = error.to_string();
        for request in batch {
            let _ = tx
                .send(EmbeddingResult::failed(request.id, error_msg.clone()))
                .await;
        }
    }
}

/// Process items one by one as fallback when batch fails.
async fn process_single_items(
    provider: Arc<dyn EmbeddingProvider>,
    batch: Vec<EmbeddingRequest>,
    tx: mpsc::Sender<EmbeddingResult>,
    config: RetryConfig,
) {
    let mut success_count = 0;
    let mut fail_count = 0;
    let total = batch.len();

    for request in batch {
        let outcome = with_retry(&config, "embed", || provider.embed(&request.text))
            .await
            .and_then(|embedding| checked(provider.as_ref(), embedding));
        match outcome {
            Ok(embedding) => {
                success_count += 1;
                let _ = tx.send(EmbeddingResult::ok(request.id, embedding)).await;
            }
            Err(e) => {
                fail_count += 1;
                tracing::warn!(
                    id = %request.id,
                    error = %e,
                    "Single item embedding failed"
                );
                let _ = tx
                    .send(EmbeddingResult::failed(request.id, e.to_string()))
                    .await;
            }
        }
    }

    tracing::info!(
        total = total,
        success = success_count,
        failed = fail_count,
        "Single-item fallback completed"
    );
}

#[cfg(test)]
#[path = "queue.test.rs"]
mod tests;
