//! Index pipeline.
//!
//! ```text
//!   parsed registers
//!         │
//!         ▼
//!   deduplicate (exact, then generalized)
//!         │
//!         ▼
//!   ChunkBuilder (register / summary / detail / device chunks)
//!         │
//!         ▼
//!   EmbeddingQueue (batched, retried, single-item fallback)
//!         │
//!         ▼
//!   VectorStore::upsert (batched, retried)
//! ```
//!
//! Every stage continues past per-item failures and records them in the
//! [`IndexReport`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::chunking::ChunkBatch;
use crate::chunking::ChunkBuilder;
use crate::config::RetrievalConfig;
use crate::dedup::DedupReport;
use crate::dedup::deduplicate;
use crate::embeddings::EmbeddingQueue;
use crate::embeddings::EmbeddingRequest;
use crate::error::Result;
use crate::model::Register;
use crate::retry::with_retry;
use crate::traits::EmbeddingProvider;
use crate::traits::StoredPoint;
use crate::traits::VectorStore;

/// Points per upsert request.
const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Where an item was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Chunk,
    Embed,
    Upsert,
}

/// One item that did not make it into the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexFailure {
    pub stage: FailureStage,
    /// Chunk id, register id or peripheral group key.
    pub item: String,
    pub reason: String,
}

/// Outcome of one indexing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexReport {
    pub registers_in: usize,
    pub registers_after_dedup: usize,
    pub dedup: Vec<DedupReport>,
    /// Chunk count per chunk type.
    pub chunks: BTreeMap<String, usize>,
    pub upserted: usize,
    pub failures: Vec<IndexFailure>,
    /// Unix timestamps of the run.
    pub started_at: i64,
    pub finished_at: i64,
}

impl IndexReport {
    pub fn total_chunks(&self) -> usize {
        self.chunks.values().sum()
    }

    pub fn failures_at(&self, stage: FailureStage) -> usize {
        self.failures.iter().filter(|f| f.stage == stage).count()
    }
}

/// Deduplicated records and the chunks built from them.
#[derive(Debug, Clone)]
pub struct PreparedChunks {
    pub registers_in: usize,
    pub registers: Vec<Register>,
    pub dedup: Vec<DedupReport>,
    pub batch: ChunkBatch,
}

/// Offline half of indexing: deduplicate, then build chunks.
pub fn prepare_chunks(registers: Vec<Register>, config: &RetrievalConfig) -> PreparedChunks {
    let registers_in = registers.len();
    let (registers, dedup) = deduplicate(registers, &config.dedup);
    for report in &dedup {
        tracing::info!(
            before = report.before,
            after = report.after,
            max_group_size = report.max_group_size,
            reduction_pct = report.reduction_pct(),
            "Deduplication pass"
        );
    }
    let batch = ChunkBuilder::new(config.chunking.clone()).build(&registers);
    PreparedChunks {
        registers_in,
        registers,
        dedup,
        batch,
    }
}

/// Builds chunks from register records and writes them into a store.
pub struct IndexPipeline {
    config: RetrievalConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    upsert_batch_size: usize,
}

impl IndexPipeline {
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            embedder,
            store,
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }

    pub fn with_upsert_batch_size(mut self, size: usize) -> Self {
        self.upsert_batch_size = size.max(1);
        self
    }

    /// Index `registers`.
    ///
    /// Fails only when the collection cannot be prepared; per-chunk
    /// failures are collected in the report.
    pub async fn run(&self, registers: Vec<Register>) -> Result<IndexReport> {
        let started_at = chrono::Utc::now().timestamp();
        let prepared = prepare_chunks(registers, &self.config);

        let mut report = IndexReport {
            registers_in: prepared.registers_in,
            registers_after_dedup: prepared.registers.len(),
            dedup: prepared.dedup,
            started_at,
            ..IndexReport::default()
        };
        for chunk in &prepared.batch.chunks {
            *report
                .chunks
                .entry(chunk.kind().as_str().to_string())
                .or_insert(0) += 1;
        }
        report
            .failures
            .extend(prepared.batch.failures.into_iter().map(|f| IndexFailure {
                stage: FailureStage::Chunk,
                item: f.item,
                reason: f.reason,
            }));

        let dimension = self.embedder.dimension();
        with_retry(&self.config.retry, "ensure_collection", || {
            self.store.ensure_collection(dimension)
        })
        .await?;

        let chunks = prepared.batch.chunks;
        let requests: Vec<EmbeddingRequest> = chunks
            .iter()
            .map(|c| EmbeddingRequest {
                id: c.id.clone(),
                text: c.text.clone(),
            })
            .collect();
        let queue = EmbeddingQueue::from_config(
            self.embedder.clone(),
            &self.config.embedding,
            &self.config.retry,
        );
        let mut vectors: HashMap<String, Vec<f32>> = HashMap::with_capacity(requests.len());
        for result in queue.process_all(requests).await? {
            match result.embedding {
                Some(vector) => {
                    vectors.insert(result.id, vector);
                }
                None => report.failures.push(IndexFailure {
                    stage: FailureStage::Embed,
                    item: result.id,
                    reason: result.error.unwrap_or_else(|| "no embedding".to_string()),
                }),
            }
        }

        let points: Vec<StoredPoint> = chunks
            .iter()
            .filter_map(|chunk| {
                vectors.remove(&chunk.id).map(|vector| StoredPoint {
                    id: chunk.id.clone(),
                    vector,
                    payload: chunk.to_payload(),
                })
            })
            .collect();

        for batch in points.chunks(self.upsert_batch_size) {
            let outcome = with_retry(&self.config.retry, "upsert", || {
                self.store.upsert(batch.to_vec())
            })
            .await;
            match outcome {
                Ok(()) => report.upserted += batch.len(),
                Err(e) => {
                    tracing::warn!(
                        store = self.store.name(),
                        batch_size = batch.len(),
                        error = %e,
                        "Upsert batch failed"
                    );
                    let reason = e.to_string();
                    report
                        .failures
                        .extend(batch.iter().map(|p| IndexFailure {
                            stage: FailureStage::Upsert,
                            item: p.id.clone(),
                            reason: reason.clone(),
                        }));
                }
            }
        }

        report.finished_at = chrono::Utc::now().timestamp();
        tracing::info!(
            registers = report.registers_in,
            after_dedup = report.registers_after_dedup,
            chunks = report.total_chunks(),
            upserted = report.upserted,
            failures = report.failures.len(),
            "Indexing complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
#[path = "pipeline.test.rs"]
mod tests;
