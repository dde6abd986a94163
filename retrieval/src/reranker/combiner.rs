//! Score blending for cross-encoder reranking.

use std::sync::Arc;

use crate::config::RerankerConfig;
use crate::config::RetryConfig;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::retry::with_retry;
use crate::search::matching_penalty;
use crate::traits::PairScorer;
use crate::types::PostRerankTrace;
use crate::types::RerankTrace;
use crate::types::SearchResult;
use crate::types::sort_results;

/// Logistic function mapping raw cross-encoder logits into (0, 1).
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Replace each result's score with its reranked score and re-sort.
///
/// `raw_scores` are the cross-encoder outputs in result order.
pub fn combine_scores(
    mut results: Vec<SearchResult>,
    raw_scores: &[f32],
    config: &RerankerConfig,
) -> Result<Vec<SearchResult>> {
    if raw_scores.len() != results.len() {
        return Err(RetrievalErr::RerankFailed {
            cause: format!(
                "expected {} scores, got {}",
                results.len(),
                raw_scores.len()
            ),
        });
    }

    for (result, &raw) in results.iter_mut().zip(raw_scores) {
        let normalized = sigmoid(raw);
        let hybrid = result.score;
        result.score = if config.combine_scores {
            config.hybrid_weight * hybrid + config.rerank_weight * normalized
        } else {
            normalized
        };
        result.debug.rerank = Some(RerankTrace {
            rerank_score: normalized,
            rerank_score_raw: raw,
            hybrid_score: hybrid,
            combined: config.combine_scores,
        });
    }

    sort_results(&mut results);
    Ok(results)
}

/// Multiply hits of penalized peripherals by `multiplier` and re-sort.
///
/// Runs after reranking so a confident cross-encoder cannot lift a
/// peripheral the query rules out.
pub fn apply_post_rerank_penalties(
    mut results: Vec<SearchResult>,
    penalties: &[String],
    multiplier: f32,
) -> Vec<SearchResult> {
    if penalties.is_empty() {
        return results;
    }

    for result in &mut results {
        if let Some(prefix) = matching_penalty(&result.peripheral, penalties) {
            let pre_penalty_score = result.score;
            result.score *= multiplier;
            result.debug.post_rerank = Some(PostRerankTrace {
                post_rerank_penalty: true,
                pre_penalty_score,
                penalty_applied: prefix.to_string(),
            });
        }
    }

    sort_results(&mut results);
    results
}

/// Cross-encoder reranker over a [`PairScorer`].
#[derive(Clone)]
pub struct Reranker {
    scorer: Arc<dyn PairScorer>,
    config: RerankerConfig,
    retry: RetryConfig,
}

impl Reranker {
    pub fn new(scorer: Arc<dyn PairScorer>, config: RerankerConfig) -> Self {
        Self {
            scorer,
            config,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &RerankerConfig {
        &self.config
    }

    /// Rescore `results` against `query`, keeping the best `keep`.
    pub async fn rerank(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        keep: usize,
    ) -> Result<Vec<SearchResult>> {
        if results.is_empty() {
            return Ok(results);
        }

        let documents: Vec<String> = results.iter().map(SearchResult::rerank_text).collect();
        let raw = with_retry(&self.retry, "rerank", || {
            self.scorer.score_pairs(query, &documents)
        })
        .await?;

        let mut reranked = combine_scores(results, &raw, &self.config)?;
        reranked.truncate(keep);
        tracing::debug!(
            scorer = self.scorer.name(),
            candidates = documents.len(),
            kept = reranked.len(),
            "Reranked candidates"
        );
        Ok(reranked)
    }

    /// Post-rerank penalty pass, when enabled.
    pub fn penalize(&self, results: Vec<SearchResult>, penalties: &[String]) -> Vec<SearchResult> {
        if !self.config.post_rerank_penalty {
            return results;
        }
        apply_post_rerank_penalties(results, penalties, self.config.post_rerank_multiplier)
    }
}

#[cfg(test)]
#[path = "combiner.test.rs"]
mod tests;
