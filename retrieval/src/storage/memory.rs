//! In-process vector store.
//!
//! Dense candidates come from cosine similarity, lexical candidates from
//! BM25 over the payload `text`; hybrid search fuses the two rankings with
//! reciprocal rank fusion, the same way the Qdrant collection does.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::search::constants::DEFAULT_RRF_K;
use crate::search::fusion::fuse_ranked;
use crate::traits::EmbeddingProvider;
use crate::traits::StoredPoint;
use crate::traits::VectorStore;
use crate::types::StoreFilter;
use crate::types::StoreHit;

/// BM25 term-frequency saturation.
const BM25_K1: f32 = 1.2;
/// BM25 length normalization.
const BM25_B: f32 = 0.75;

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn matches_filter(point: &StoredPoint, filter: Option<&StoreFilter>) -> bool {
    match filter {
        None => true,
        Some(StoreFilter::AddressEquals(address)) => {
            let single =
                point.payload.get("address").and_then(Value::as_str) == Some(address.as_str());
            let listed = point
                .payload
                .get("addresses")
                .and_then(Value::as_array)
                .is_some_and(|list| list.iter().any(|a| a.as_str() == Some(address.as_str())));
            single || listed
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    dot / (na * nb)
}

/// Sort `(index, score)` pairs by descending score, then ascending point id.
fn rank(points: &[&StoredPoint], mut scored: Vec<(usize, f32)>) -> Vec<(usize, f32)> {
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| points[a.0].id.cmp(&points[b.0].id))
    });
    scored
}

/// BM25 score of every point with at least one query term.
fn bm25_scores(points: &[&StoredPoint], query: &str) -> Vec<(usize, f32)> {
    let docs: Vec<Vec<String>> = points
        .iter()
        .map(|p| tokenize(p.payload.get("text").and_then(Value::as_str).unwrap_or_default()))
        .collect();
    if docs.is_empty() {
        return Vec::new();
    }

    let n = docs.len() as f32;
    let avg_len = docs.iter().map(Vec::len).sum::<usize>() as f32 / n;
    let mut terms = tokenize(query);
    terms.sort();
    terms.dedup();

    let mut scores = vec![0.0f32; docs.len()];
    for term in &terms {
        let df = docs.iter().filter(|d| d.contains(term)).count() as f32;
        if df == 0.0 {
            continue;
        }
        let idf = (1.0 + (n - df + 0.5) / (df + 0.5)).ln();
        for (doc, score) in docs.iter().zip(scores.iter_mut()) {
            let tf = doc.iter().filter(|t| *t == term).count() as f32;
            if tf == 0.0 {
                continue;
            }
            let len_norm = 1.0 - BM25_B + BM25_B * doc.len() as f32 / avg_len.max(1.0);
            *score += idf * tf * (BM25_K1 + 1.0) / (tf + BM25_K1 * len_norm);
        }
    }

    scores
        .into_iter()
        .enumerate()
        .filter(|(_, s)| *s > 0.0)
        .collect()
}

/// Vector store held in memory.
pub struct MemoryStore {
    embedder: Arc<dyn EmbeddingProvider>,
    points: RwLock<Vec<StoredPoint>>,
    rrf_k: f32,
}

impl MemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            embedder,
            points: RwLock::new(Vec::new()),
            rrf_k: DEFAULT_RRF_K,
        }
    }

    pub fn with_rrf_k(mut self, rrf_k: f32) -> Self {
        self.rrf_k = rrf_k;
        self
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search_dense(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        let points = self.points.read().await;
        let candidates: Vec<&StoredPoint> =
            points.iter().filter(|p| matches_filter(p, filter)).collect();

        let scored = candidates
            .iter()
            .enumerate()
            .map(|(i, p)| (i, cosine(vector, &p.vector)))
            .collect();
        Ok(rank(&candidates, scored)
            .into_iter()
            .take(limit)
            .map(|(i, score)| StoreHit::new(score, candidates[i].payload.clone()))
            .collect())
    }

    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        dense_k: usize,
        sparse_k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        let vector = self.embedder.embed(query).await?;

        let points = self.points.read().await;
        let candidates: Vec<&StoredPoint> =
            points.iter().filter(|p| matches_filter(p, filter)).collect();

        let dense: Vec<String> = rank(
            &candidates,
            candidates
                .iter()
                .enumerate()
                .map(|(i, p)| (i, cosine(&vector, &p.vector)))
                .collect(),
        )
        .into_iter()
        .take(dense_k)
        .map(|(i, _)| candidates[i].id.clone())
        .collect();

        let sparse: Vec<String> = rank(&candidates, bm25_scores(&candidates, query))
            .into_iter()
            .take(sparse_k)
            .map(|(i, _)| candidates[i].id.clone())
            .collect();

        let by_id: HashMap<&str, &StoredPoint> =
            candidates.iter().map(|p| (p.id.as_str(), *p)).collect();
        let hits: Vec<StoreHit> = fuse_ranked(&[dense, sparse], self.rrf_k)
            .into_iter()
            .take(limit)
            .filter_map(|(id, score)| {
                by_id
                    .get(id.as_str())
                    .map(|p| StoreHit::new(score, p.payload.clone()))
            })
            .collect();

        tracing::debug!(
            candidates = candidates.len(),
            returned = hits.len(),
            "Memory hybrid search"
        );
        Ok(hits)
    }

    async fn upsert(&self, new_points: Vec<StoredPoint>) -> Result<()> {
        let mut points = self.points.write().await;
        for point in new_points {
            match points.iter_mut().find(|p| p.id == point.id) {
                Some(existing) => *existing = point,
                None => points.push(point),
            }
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.points.read().await.len())
    }
}

#[cfg(test)]
#[path = "memory.test.rs"]
mod tests;
