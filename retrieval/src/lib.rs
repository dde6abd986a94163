//! Hybrid retrieval over hardware register descriptions.
//!
//! Register records are deduplicated and rendered into bounded text chunks,
//! embedded and written into a vector store. Developer questions are
//! answered by the store's fused dense + BM25 search, re-ranked with
//! peripheral and register heuristics and an optional cross-encoder.
//!
//! ```text
//! Register ─► dedup ─► ChunkBuilder ─► EmbeddingQueue ─► VectorStore
//!                                                            │
//! query ─► QueryPreprocessor ─► search_hybrid ◄──────────────┘
//!                                    │
//!                                    ▼
//!                          domain boosts ─► Reranker ─► penalties ─► top-k
//! ```

pub mod chunking;
pub mod config;
pub mod dedup;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod indexing;
pub mod model;
pub mod query;
pub mod reranker;
pub mod retry;
pub mod search;
pub mod storage;
pub mod traits;
pub mod types;

pub use chunking::ChunkBatch;
pub use chunking::ChunkBuilder;
pub use config::RetrievalConfig;
pub use error::Result;
pub use error::RetrievalErr;
pub use indexing::IndexPipeline;
pub use indexing::IndexReport;
pub use model::Field;
pub use model::Register;
pub use query::QueryInfo;
pub use query::QueryPreprocessor;
pub use reranker::Reranker;
pub use search::HybridRetriever;
pub use search::SearchParams;
pub use traits::EmbeddingProvider;
pub use traits::PairScorer;
pub use traits::VectorStore;
pub use types::Chunk;
pub use types::ChunkKind;
pub use types::SearchResult;
