use serde_json::json;

use super::*;
use crate::error::RetrievalErr;
use pretty_assertions::assert_eq;

/// Embeds by keyword: "dma" texts point one way, everything else the other.
struct KeywordEmbedder;

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn dimension(&self) -> i32 {
        2
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.to_lowercase().contains("dma") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

struct BrokenEmbedder;

#[async_trait]
impl EmbeddingProvider for BrokenEmbedder {
    fn name(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> i32 {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RetrievalErr::EmbeddingFailed {
            cause: "offline".to_string(),
        })
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(RetrievalErr::EmbeddingFailed {
            cause: "offline".to_string(),
        })
    }
}

fn point(id: &str, text: &str, address: &str, vector: Vec<f32>) -> StoredPoint {
    let payload = json!({
        "source_id": id,
        "text": text,
        "address": address,
    });
    StoredPoint {
        id: id.to_string(),
        vector,
        payload: payload.as_object().cloned().expect("object payload"),
    }
}

async fn seeded() -> MemoryStore {
    let store = MemoryStore::new(Arc::new(KeywordEmbedder));
    store
        .upsert(vec![
            point(
                "dma",
                "DMA2 S0NDTR number of data items to transfer",
                "0x40026404",
                vec![1.0, 0.0],
            ),
            point(
                "otg",
                "OTG_FS DIEPDMA0 endpoint DMA address",
                "0x40040914",
                vec![0.6, 0.8],
            ),
            point(
                "rcc",
                "RCC AHB1ENR clock enable",
                "0x40023830",
                vec![0.0, 1.0],
            ),
        ])
        .await
        .expect("upsert");
    store
}

fn ids(hits: &[StoreHit]) -> Vec<&str> {
    hits.iter()
        .filter_map(|h| h.payload.get("source_id").and_then(Value::as_str))
        .collect()
}

#[test]
fn test_tokenize() {
    assert_eq!(
        tokenize("OTG_FS DIEPDMA0: endpoint-DMA"),
        vec!["otg_fs", "diepdma0", "endpoint", "dma"]
    );
}

#[tokio::test]
async fn test_dense_search_orders_by_cosine() {
    let store = seeded().await;
    let hits = store
        .search_dense(&[1.0, 0.0], 2, None)
        .await
        .expect("dense search");
    assert_eq!(ids(&hits), vec!["dma", "otg"]);
    assert!((hits[0].score - 1.0).abs() < 1e-6);
    assert!((hits[1].score - 0.6).abs() < 1e-6);
}

#[tokio::test]
async fn test_hybrid_search_fuses_both_rankings() {
    let store = seeded().await;
    let hits = store
        .search_hybrid("DMA number of data items", 3, 40, 40, None)
        .await
        .expect("hybrid search");

    // first in both rankings
    assert_eq!(ids(&hits)[0], "dma");
    let expected = 2.0 / (1.0 + DEFAULT_RRF_K);
    assert!((hits[0].score - expected).abs() < 1e-6);
    // rcc has no query term and ranks last on the dense side
    assert_eq!(ids(&hits), vec!["dma", "otg", "rcc"]);
}

#[tokio::test]
async fn test_hybrid_respects_candidate_limits() {
    let store = seeded().await;
    let hits = store
        .search_hybrid("DMA", 10, 1, 0, None)
        .await
        .expect("hybrid search");
    assert_eq!(ids(&hits), vec!["dma"]);
}

#[tokio::test]
async fn test_address_filter() {
    let store = seeded().await;
    let filter = StoreFilter::AddressEquals("0x40023830".to_string());
    let hits = store
        .search_hybrid("DMA", 10, 40, 40, Some(&filter))
        .await
        .expect("hybrid search");
    assert_eq!(ids(&hits), vec!["rcc"]);
}

#[tokio::test]
async fn test_upsert_replaces_by_id() {
    let store = seeded().await;
    assert_eq!(store.count().await.expect("count"), 3);

    store
        .upsert(vec![point("rcc", "RCC CR clock control", "0x40023800", vec![0.0, 1.0])])
        .await
        .expect("upsert");
    assert_eq!(store.count().await.expect("count"), 3);

    let filter = StoreFilter::AddressEquals("0x40023800".to_string());
    let hits = store
        .search_dense(&[0.0, 1.0], 5, Some(&filter))
        .await
        .expect("dense search");
    assert_eq!(ids(&hits), vec!["rcc"]);
}

#[tokio::test]
async fn test_hybrid_propagates_embedding_failure() {
    let store = MemoryStore::new(Arc::new(BrokenEmbedder));
    let err = store
        .search_hybrid("dma", 5, 40, 40, None)
        .await
        .expect_err("embedder offline");
    assert!(matches!(err, RetrievalErr::EmbeddingFailed { .. }));
}

#[tokio::test]
async fn test_address_filter_matches_listed_addresses() {
    let store = seeded().await;
    let mut summary = point(
        "usart_summary",
        "USART1 summary SR DR",
        "",
        vec![0.5, 0.5],
    );
    summary.payload.remove("address");
    summary
        .payload
        .insert("addresses".to_string(), json!(["0x40011000", "0x40011004"]));
    store.upsert(vec![summary]).await.expect("upsert");

    let filter = StoreFilter::AddressEquals("0x40011004".to_string());
    let hits = store
        .search_hybrid("USART1", 10, 40, 40, Some(&filter))
        .await
        .expect("hybrid search");
    assert_eq!(ids(&hits), vec!["usart_summary"]);

    let filter = StoreFilter::AddressEquals("0x40011008".to_string());
    let hits = store
        .search_dense(&[0.5, 0.5], 5, Some(&filter))
        .await
        .expect("dense search");
    assert!(hits.is_empty());
}
