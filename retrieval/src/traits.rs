//! Seams to the external services: embedding model, cross-encoder and
//! vector store.

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;

use crate::error::Result;
use crate::types::StoreFilter;
use crate::types::StoreHit;

/// Text embedding provider.
///
/// Vectors are L2-normalized and of fixed dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Embedding dimension.
    fn dimension(&self) -> i32;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed many texts in one call.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

/// Pairwise (query, document) relevance model.
#[async_trait]
pub trait PairScorer: Send + Sync {
    /// Scorer name for logging.
    fn name(&self) -> &str;

    /// Raw (unnormalized) relevance of each document to the query, in input order.
    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>>;
}

/// A chunk ready to be written into a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Map<String, Value>,
}

/// Vector store with dense and fused dense+sparse search.
///
/// Fusion of the dense and sparse candidate lists happens inside the store.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Store name for logging.
    fn name(&self) -> &str;

    /// Dense-only search.
    async fn search_dense(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>>;

    /// Dense + sparse search fused with reciprocal rank fusion.
    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        dense_k: usize,
        sparse_k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>>;

    /// Make sure the backing collection exists for vectors of `dimension`.
    async fn ensure_collection(&self, _dimension: i32) -> Result<()> {
        Ok(())
    }

    /// Insert or replace points.
    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()>;

    /// Number of stored points.
    async fn count(&self) -> Result<usize>;
}
