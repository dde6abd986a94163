//! Retrieval orchestrator.
//!
//! preprocess → filter → store hybrid search → domain boosts →
//! (rerank → post-rerank penalties) → top-k.

use std::sync::Arc;

use crate::config::RankingConfig;
use crate::config::RetrievalConfig;
use crate::config::RetryConfig;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::query::QueryInfo;
use crate::query::QueryPreprocessor;
use crate::reranker::Reranker;
use crate::retry::with_retry;
use crate::traits::EmbeddingProvider;
use crate::traits::VectorStore;
use crate::types::SearchResult;
use crate::types::StoreFilter;

use super::constants::RERANK_KEEP_FACTOR;
use super::ranking::apply_domain_boosts;

/// Per-call result and candidate counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchParams {
    /// Results returned.
    pub top_k: usize,
    /// Dense candidates fetched by the store before fusion.
    pub vector_k: usize,
    /// Lexical candidates fetched by the store before fusion.
    pub bm25_k: usize,
    /// Candidates handed to the reranker.
    pub rerank_top_n: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchParams {
    fn from(config: &SearchConfig) -> Self {
        Self {
            top_k: config.top_k,
            vector_k: config.vector_k,
            bm25_k: config.bm25_k,
            rerank_top_n: config.rerank_top_n,
        }
    }
}

impl SearchParams {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// Restrict the store query to the first address literal of the query.
pub fn build_filter(info: &QueryInfo, enabled: bool) -> Option<StoreFilter> {
    if !enabled {
        return None;
    }
    info.first_address()
        .map(|addr| StoreFilter::AddressEquals(addr.to_string()))
}

/// Hybrid retriever over a fusing vector store.
pub struct HybridRetriever {
    store: Arc<dyn VectorStore>,
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    reranker: Option<Reranker>,
    preprocessor: QueryPreprocessor,
    ranking: RankingConfig,
    retry: RetryConfig,
    address_filter: bool,
}

impl HybridRetriever {
    /// Retriever with default ranking and retry settings and no reranker.
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            embedder: None,
            reranker: None,
            preprocessor: QueryPreprocessor::new(),
            ranking: RankingConfig::default(),
            retry: RetryConfig::default(),
            address_filter: true,
        }
    }

    /// Retriever using the ranking, retry and filter settings of `config`.
    pub fn from_config(store: Arc<dyn VectorStore>, config: &RetrievalConfig) -> Self {
        Self::new(store)
            .with_ranking(config.ranking.clone())
            .with_retry(config.retry.clone())
            .with_address_filter(config.search.address_filter)
    }

    /// Enable `search_dense_only` with a query embedder.
    pub fn with_embeddings(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_reranker(mut self, reranker: Reranker) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_ranking(mut self, ranking: RankingConfig) -> Self {
        self.ranking = ranking;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_address_filter(mut self, enabled: bool) -> Self {
        self.address_filter = enabled;
        self
    }

    pub fn has_reranker(&self) -> bool {
        self.reranker.is_some()
    }

    fn prepare(&self, query: &str) -> Result<(QueryInfo, Option<StoreFilter>)> {
        if query.trim().is_empty() {
            return Err(RetrievalErr::InvalidInput("empty query".to_string()));
        }
        let info = self.preprocessor.process(query);
        let filter = build_filter(&info, self.address_filter);
        Ok((info, filter))
    }

    /// Ranked results for `query`.
    pub async fn search(&self, query: &str, params: &SearchParams) -> Result<Vec<SearchResult>> {
        let (info, filter) = self.prepare(query)?;
        let limit = if self.reranker.is_some() {
            params.rerank_top_n
        } else {
            params.top_k
        };

        let hits = with_retry(&self.retry, "search_hybrid", || {
            self.store.search_hybrid(
                query,
                limit,
                params.vector_k,
                params.bm25_k,
                filter.as_ref(),
            )
        })
        .await?;
        let candidates = hits.len();

        let results: Vec<SearchResult> = hits.into_iter().map(SearchResult::from_hit).collect();
        let mut results = apply_domain_boosts(results, &info, &self.ranking);

        if let Some(reranker) = &self.reranker {
            results.truncate(params.rerank_top_n);
            let reranked = reranker
                .rerank(query, results, params.top_k * RERANK_KEEP_FACTOR)
                .await?;
            results = reranker.penalize(reranked, &info.peripheral_penalties);
        }
        results.truncate(params.top_k);

        tracing::info!(
            store = self.store.name(),
            candidates = candidates,
            returned = results.len(),
            reranked = self.reranker.is_some(),
            filtered = filter.is_some(),
            "Hybrid search complete"
        );
        Ok(results)
    }

    /// Dense-only baseline: embedding search plus domain boosts.
    pub async fn search_dense_only(
        &self,
        query: &str,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>> {
        let embedder = self
            .embedder
            .as_ref()
            .ok_or_else(|| RetrievalErr::NotEnabled("dense search needs an embedder".to_string()))?;
        let (info, filter) = self.prepare(query)?;

        let vector = with_retry(&self.retry, "embed_query", || embedder.embed(query)).await?;
        let hits = with_retry(&self.retry, "search_dense", || {
            self.store
                .search_dense(&vector, params.top_k, filter.as_ref())
        })
        .await?;

        let results: Vec<SearchResult> = hits.into_iter().map(SearchResult::from_hit).collect();
        let mut results = apply_domain_boosts(results, &info, &self.ranking);
        results.truncate(params.top_k);
        tracing::debug!(
            embedder = embedder.name(),
            returned = results.len(),
            "Dense search complete"
        );
        Ok(results)
    }
}

#[cfg(test)]
#[path = "hybrid.test.rs"]
mod tests;
