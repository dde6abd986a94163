//! Cross-encoder reranking of boosted hits.
//!
//! The pair scorer is an external model behind [`PairScorer`]; this module
//! owns score normalization, blending and the post-rerank penalty pass.
//!
//! [`PairScorer`]: crate::traits::PairScorer

mod combiner;
#[cfg(feature = "neural-reranker")]
mod cross_encoder;

pub use combiner::Reranker;
pub use combiner::apply_post_rerank_penalties;
pub use combiner::combine_scores;
pub use combiner::sigmoid;
#[cfg(feature = "neural-reranker")]
pub use cross_encoder::CrossEncoderScorer;

use std::sync::Arc;

use crate::config::RerankerConfig;
use crate::config::RetryConfig;
use crate::error::Result;

/// Build the configured reranker, or `None` when reranking is disabled.
pub fn create_reranker(config: &RerankerConfig, retry: &RetryConfig) -> Result<Option<Reranker>> {
    if !config.enabled {
        return Ok(None);
    }
    create_scorer(config).map(|scorer| {
        Some(Reranker::new(scorer, config.clone()).with_retry(retry.clone()))
    })
}

#[cfg(feature = "neural-reranker")]
fn create_scorer(config: &RerankerConfig) -> Result<Arc<dyn crate::traits::PairScorer>> {
    Ok(Arc::new(CrossEncoderScorer::new(&config.model)?))
}

#[cfg(not(feature = "neural-reranker"))]
fn create_scorer(config: &RerankerConfig) -> Result<Arc<dyn crate::traits::PairScorer>> {
    Err(crate::error::RetrievalErr::NotEnabled(format!(
        "reranker '{}' requires the neural-reranker feature",
        config.model
    )))
}
