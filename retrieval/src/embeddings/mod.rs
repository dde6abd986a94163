//! Embedding providers.
//!
//! Provides vector embeddings for chunk text and queries.

#[cfg(feature = "local-embeddings")]
mod fastembed;
mod openai;
mod queue;

use std::sync::Arc;

#[cfg(feature = "local-embeddings")]
pub use self::fastembed::FastembedEmbeddingProvider;
pub use openai::OpenAIEmbeddings;
pub use queue::EmbeddingQueue;
pub use queue::EmbeddingRequest;
pub use queue::EmbeddingResult;

use crate::config::EmbeddingConfig;
use crate::config::EmbeddingProviderKind;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::traits::EmbeddingProvider;

/// Scale `vector` to unit length. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Create the embedding provider named by `config`.
///
/// The HTTP provider reads its API key from the environment variable
/// named by `api_key_env`.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingProviderKind::Openai => {
            let api_key = std::env::var(&config.api_key_env).map_err(|_| {
                RetrievalErr::ConfigError {
                    field: "embedding.api_key_env".to_string(),
                    cause: format!("environment variable {} is not set", config.api_key_env),
                }
            })?;
            let mut provider = OpenAIEmbeddings::new(api_key)
                .with_model(config.model.clone())
                .with_dimension(config.dimension);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Arc::new(provider))
        }
        EmbeddingProviderKind::Local => create_local(config),
    }
}

#[cfg(feature = "local-embeddings")]
fn create_local(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Ok(Arc::new(FastembedEmbeddingProvider::new(&config.model)?))
}

#[cfg(not(feature = "local-embeddings"))]
fn create_local(_config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    Err(RetrievalErr::NotEnabled(
        "local embeddings require the `local-embeddings` feature".to_string(),
    ))
}

#[cfg(test)]
#[path = "mod.test.rs"]
mod tests;
