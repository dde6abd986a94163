//! Vector store backends.
//!
//! [`QdrantStore`] talks to a Qdrant collection over REST and lets the
//! server fuse dense and BM25 candidates. [`MemoryStore`] keeps points in
//! process and fuses the same way locally.

mod memory;
mod qdrant;

use std::sync::Arc;

pub use memory::MemoryStore;
pub use memory::tokenize;
pub use qdrant::QdrantStore;
pub use qdrant::point_uuid;

use crate::config::StoreConfig;
use crate::config::StoreKind;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::traits::EmbeddingProvider;
use crate::traits::VectorStore;

/// Create the vector store named by `config`.
///
/// Both stores embed hybrid queries with `embedder`.
pub fn create_store(
    config: &StoreConfig,
    embedder: Arc<dyn EmbeddingProvider>,
) -> Result<Arc<dyn VectorStore>> {
    match config.kind {
        StoreKind::Qdrant => {
            if config.url.trim().is_empty() {
                return Err(RetrievalErr::ConfigError {
                    field: "store.url".to_string(),
                    cause: "Qdrant URL is empty".to_string(),
                });
            }
            let api_key = std::env::var(&config.api_key_env).ok();
            let mut store = QdrantStore::new(&config.url, &config.collection, embedder)
                .with_rrf_k(config.rrf_k);
            if let Some(key) = api_key {
                store = store.with_api_key(key);
            }
            Ok(Arc::new(store))
        }
        StoreKind::Memory => Ok(Arc::new(MemoryStore::new(embedder).with_rrf_k(config.rrf_k))),
    }
}
