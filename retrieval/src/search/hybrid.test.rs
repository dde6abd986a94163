use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::config::RerankerConfig;
use crate::traits::PairScorer;
use crate::traits::StoredPoint;
use crate::types::ChunkKind;
use crate::types::StoreHit;
use pretty_assertions::assert_eq;

fn hit(id: &str, peripheral: &str, register: &str, score: f32) -> StoreHit {
    let payload = json!({
        "source_id": id,
        "type": "peripheral_detail",
        "peripheral": peripheral,
        "register": register,
        "address": "0x40026410",
        "text": format!("{peripheral} {register} text"),
    });
    StoreHit::new(score, payload.as_object().cloned().expect("object payload"))
}

#[derive(Debug, Clone, PartialEq)]
struct Call {
    limit: usize,
    dense_k: usize,
    sparse_k: usize,
    filter: Option<StoreFilter>,
}

/// Returns fixed hits and records how it was queried.
#[derive(Default)]
struct FixedStore {
    hits: Vec<StoreHit>,
    calls: Mutex<Vec<Call>>,
    failures_left: AtomicUsize,
}

impl FixedStore {
    fn new(hits: Vec<StoreHit>) -> Self {
        Self {
            hits,
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search_dense(
        &self,
        _vector: &[f32],
        limit: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        self.calls.lock().expect("lock").push(Call {
            limit,
            dense_k: limit,
            sparse_k: 0,
            filter: filter.cloned(),
        });
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn search_hybrid(
        &self,
        _query: &str,
        limit: usize,
        dense_k: usize,
        sparse_k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RetrievalErr::store("fixed", "connection reset"));
        }
        self.calls.lock().expect("lock").push(Call {
            limit,
            dense_k,
            sparse_k,
            filter: filter.cloned(),
        });
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn upsert(&self, _points: Vec<StoredPoint>) -> Result<()> {
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.hits.len())
    }
}

/// Very confident about everything.
struct ConfidentScorer;

#[async_trait]
impl PairScorer for ConfidentScorer {
    fn name(&self) -> &str {
        "confident"
    }

    async fn score_pairs(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        Ok(documents
            .iter()
            .map(|d| if d.starts_with("OTG") { 8.0 } else { 1.0 })
            .collect())
    }
}

struct UnitEmbedder;

#[async_trait]
impl EmbeddingProvider for UnitEmbedder {
    fn name(&self) -> &str {
        "unit"
    }

    fn dimension(&self) -> i32 {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }
}

fn dma_hits() -> Vec<StoreHit> {
    vec![
        hit("otg", "OTG_FS_GLOBAL", "DIEPDMA0", 0.9),
        hit("dma", "DMA2", "S0NDTR", 0.5),
        hit("rcc", "RCC", "AHB1ENR", 0.4),
    ]
}

const DMA_QUERY: &str =
    "Which DMA register on STM32F411 stores the number of data items to transfer?";

fn fast_retry() -> RetryConfig {
    RetryConfig {
        base_delay_ms: 1,
        ..RetryConfig::default()
    }
}

#[tokio::test]
async fn test_search_without_reranker() {
    let store = Arc::new(FixedStore::new(dma_hits()));
    let retriever = HybridRetriever::new(store.clone());
    let params = SearchParams::default().with_top_k(2);

    let results = retriever.search(DMA_QUERY, &params).await.expect("search");

    assert_eq!(
        store.calls(),
        vec![Call {
            limit: 2,
            dense_k: 40,
            sparse_k: 40,
            filter: None,
        }]
    );
    let ids: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(ids, vec!["dma", "otg"]);
    assert!((results[0].score - 0.75).abs() < 1e-5);
    assert!((results[1].score - 0.45).abs() < 1e-5);
    assert_eq!(results[0].kind, Some(ChunkKind::PeripheralDetail));
}

#[tokio::test]
async fn test_address_literal_becomes_filter() {
    let store = Arc::new(FixedStore::new(dma_hits()));
    let retriever = HybridRetriever::new(store.clone());

    retriever
        .search("what lives at 0x40026410?", &SearchParams::default())
        .await
        .expect("search");
    assert_eq!(
        store.calls()[0].filter,
        Some(StoreFilter::AddressEquals("0x40026410".to_string()))
    );

    let unfiltered = HybridRetriever::new(store.clone()).with_address_filter(false);
    unfiltered
        .search("what lives at 0x40026410?", &SearchParams::default())
        .await
        .expect("search");
    assert_eq!(store.calls()[1].filter, None);
}

#[tokio::test]
async fn test_post_rerank_penalty_overrides_confident_reranker() {
    let store = Arc::new(FixedStore::new(dma_hits()));
    let reranker = Reranker::new(Arc::new(ConfidentScorer), RerankerConfig::default());
    let retriever = HybridRetriever::new(store.clone()).with_reranker(reranker);
    let params = SearchParams::default().with_top_k(3);

    let results = retriever.search(DMA_QUERY, &params).await.expect("search");

    assert_eq!(store.calls()[0].limit, 20);
    let ids: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
    // the scorer prefers OTG, the penalty pushes it to the bottom
    assert_eq!(ids, vec!["dma", "rcc", "otg"]);

    let otg = &results[2];
    let post = otg.debug.post_rerank.as_ref().expect("post-rerank trace");
    assert!(post.post_rerank_penalty);
    assert_eq!(post.penalty_applied, "OTG");
    assert!((otg.score - post.pre_penalty_score * 0.1).abs() < 1e-6);
    assert!(otg.debug.applied_boosts.peripheral_penalty);
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let store = Arc::new(FixedStore::new(dma_hits()));
    let retriever = HybridRetriever::new(store);
    let params = SearchParams::default();

    let first = retriever.search(DMA_QUERY, &params).await.expect("search");
    let second = retriever.search(DMA_QUERY, &params).await.expect("search");
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_empty_query_rejected() {
    let retriever = HybridRetriever::new(Arc::new(FixedStore::default()));
    let err = retriever
        .search("   ", &SearchParams::default())
        .await
        .expect_err("empty query");
    assert!(matches!(err, RetrievalErr::InvalidInput(_)));
}

#[tokio::test]
async fn test_transient_store_failure_retried() {
    let store = Arc::new(FixedStore {
        failures_left: AtomicUsize::new(1),
        ..FixedStore::new(dma_hits())
    });
    let retriever = HybridRetriever::new(store.clone()).with_retry(fast_retry());

    let results = retriever
        .search("dma", &SearchParams::default())
        .await
        .expect("search after retry");
    assert_eq!(results.len(), 3);
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_dense_only_requires_embedder() {
    let store = Arc::new(FixedStore::new(dma_hits()));
    let retriever = HybridRetriever::new(store.clone());
    let err = retriever
        .search_dense_only("dma", &SearchParams::default())
        .await
        .expect_err("no embedder");
    assert!(matches!(err, RetrievalErr::NotEnabled(_)));

    let retriever = retriever.with_embeddings(Arc::new(UnitEmbedder));
    let results = retriever
        .search_dense_only("dma", &SearchParams::default().with_top_k(1))
        .await
        .expect("dense search");
    assert_eq!(results.len(), 1);
    assert_eq!(store.calls()[0].limit, 1);
}

#[test]
fn test_params_from_config() {
    let config = SearchConfig {
        top_k: 3,
        ..SearchConfig::default()
    };
    let params = SearchParams::from(&config);
    assert_eq!(
        params,
        SearchParams {
            top_k: 3,
            vector_k: 40,
            bm25_k: 40,
            rerank_top_n: 20,
        }
    );
}
