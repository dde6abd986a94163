use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::types::StoreHit;
use pretty_assertions::assert_eq;

fn result(id: &str, peripheral: &str, text: &str, score: f32) -> SearchResult {
    let payload = json!({
        "source_id": id,
        "type": "peripheral_detail",
        "peripheral": peripheral,
        "register": "CR",
        "text": text,
    });
    SearchResult::from_hit(StoreHit::new(
        score,
        payload.as_object().cloned().expect("object payload"),
    ))
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

/// Scores documents by a fixed table and records what it was asked.
struct TableScorer {
    scores: Vec<f32>,
    seen: Mutex<Vec<String>>,
    failures_left: AtomicUsize,
}

impl TableScorer {
    fn new(scores: Vec<f32>) -> Self {
        Self {
            scores,
            seen: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
        }
    }

    fn failing_first(mut self, n: usize) -> Self {
        self.failures_left = AtomicUsize::new(n);
        self
    }
}

#[async_trait]
impl PairScorer for TableScorer {
    fn name(&self) -> &str {
        "table"
    }

    async fn score_pairs(&self, _query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RetrievalErr::RerankFailed {
                cause: "transient".to_string(),
            });
        }
        self.seen
            .lock()
            .expect("lock")
            .extend(documents.iter().cloned());
        Ok(self.scores[..documents.len()].to_vec())
    }
}

fn fast_retry() -> RetryConfig {
    RetryConfig {
        base_delay_ms: 1,
        ..RetryConfig::default()
    }
}

#[test]
fn test_sigmoid() {
    assert!(approx(sigmoid(0.0), 0.5));
    assert!(sigmoid(5.0) > 0.99);
    assert!(sigmoid(-5.0) < 0.01);
    assert!(sigmoid(1.0) > sigmoid(0.5));
}

#[test]
fn test_combined_scores_can_reorder() {
    let results = vec![
        result("a", "SPI1", "spi", 1.0),
        result("b", "USART1", "usart", 0.2),
    ];
    let combined = combine_scores(results, &[-2.0, 3.0], &RerankerConfig::default())
        .expect("matching lengths");

    assert_eq!(combined[0].source_id, "b");
    assert!(approx(combined[0].score, 0.5 * 0.2 + 0.5 * sigmoid(3.0)));
    assert!(approx(combined[1].score, 0.5 * 1.0 + 0.5 * sigmoid(-2.0)));

    let trace = combined[0].debug.rerank.as_ref().expect("rerank trace");
    assert!(approx(trace.rerank_score_raw, 3.0));
    assert!(approx(trace.rerank_score, sigmoid(3.0)));
    assert!(approx(trace.hybrid_score, 0.2));
    assert!(trace.combined);
}

#[test]
fn test_uncombined_uses_normalized_score() {
    let config = RerankerConfig {
        combine_scores: false,
        ..RerankerConfig::default()
    };
    let combined = combine_scores(vec![result("a", "SPI1", "spi", 9.0)], &[0.0], &config)
        .expect("matching lengths");
    assert!(approx(combined[0].score, 0.5));
    assert_eq!(combined[0].debug.rerank.as_ref().map(|t| t.combined), Some(false));
}

#[test]
fn test_length_mismatch_is_an_error() {
    let err = combine_scores(
        vec![result("a", "SPI1", "spi", 1.0)],
        &[],
        &RerankerConfig::default(),
    )
    .expect_err("length mismatch");
    assert!(matches!(err, RetrievalErr::RerankFailed { .. }));
}

#[test]
fn test_post_rerank_penalty() {
    let penalties = vec!["OTG".to_string(), "USB".to_string()];
    let results = vec![
        result("otg", "OTG_FS_GLOBAL", "otg", 0.99),
        result("dma", "DMA2", "dma", 0.6),
    ];
    let penalized = apply_post_rerank_penalties(results, &penalties, 0.1);

    assert_eq!(penalized[0].source_id, "dma");
    assert!(penalized[0].debug.post_rerank.is_none());

    let otg = &penalized[1];
    assert!(approx(otg.score, 0.099));
    assert_eq!(
        otg.debug.post_rerank,
        Some(PostRerankTrace {
            post_rerank_penalty: true,
            pre_penalty_score: 0.99,
            penalty_applied: "OTG".to_string(),
        })
    );
}

#[test]
fn test_post_rerank_penalty_without_penalties_is_noop() {
    let results = vec![result("b", "X", "x", 0.1), result("a", "Y", "y", 0.9)];
    let out = apply_post_rerank_penalties(results.clone(), &[], 0.1);
    assert_eq!(out, results);
}

#[tokio::test]
async fn test_rerank_keeps_best_and_falls_back_to_names() {
    let scorer = Arc::new(TableScorer::new(vec![-1.0, 2.0, 0.0]));
    let reranker = Reranker::new(scorer.clone(), RerankerConfig::default()).with_retry(fast_retry());
    let results = vec![
        result("a", "SPI1", "spi text", 0.5),
        result("b", "I2C1", "", 0.5),
        result("c", "TIM2", "tim text", 0.5),
    ];

    let reranked = reranker
        .rerank("query", results, 2)
        .await
        .expect("rerank succeeds");
    let ids: Vec<&str> = reranked.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c"]);

    let seen = scorer.seen.lock().expect("lock").clone();
    assert_eq!(seen, vec!["spi text", "I2C1 CR", "tim text"]);
}

#[tokio::test]
async fn test_rerank_retries_transient_failures() {
    let scorer = Arc::new(TableScorer::new(vec![1.0]).failing_first(2));
    let reranker = Reranker::new(scorer, RerankerConfig::default()).with_retry(fast_retry());
    let reranked = reranker
        .rerank("query", vec![result("a", "SPI1", "spi", 0.5)], 4)
        .await
        .expect("succeeds after retries");
    assert_eq!(reranked.len(), 1);
}

#[tokio::test]
async fn test_rerank_empty_input_skips_scorer() {
    let scorer = Arc::new(TableScorer::new(Vec::new()));
    let reranker = Reranker::new(scorer.clone(), RerankerConfig::default());
    let reranked = reranker
        .rerank("query", Vec::new(), 4)
        .await
        .expect("empty rerank");
    assert!(reranked.is_empty());
    assert!(scorer.seen.lock().expect("lock").is_empty());
}

#[test]
fn test_penalize_respects_toggle() {
    let config = RerankerConfig {
        post_rerank_penalty: false,
        ..RerankerConfig::default()
    };
    let reranker = Reranker::new(Arc::new(TableScorer::new(Vec::new())), config);
    let out = reranker.penalize(
        vec![result("otg", "OTG_HS", "otg", 0.9)],
        &["OTG".to_string()],
    );
    assert!(approx(out[0].score, 0.9));
}
