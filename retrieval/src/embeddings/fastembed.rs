//! Local sentence-transformer embeddings via fastembed (ONNX Runtime).

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::EmbeddingModel;
use fastembed::InitOptions;
use fastembed::TextEmbedding;

use crate::error::Result;
use crate::error::RetrievalErr;
use crate::traits::EmbeddingProvider;

use super::l2_normalize;

/// Local embedding provider.
pub struct FastembedEmbeddingProvider {
    model: Arc<Mutex<TextEmbedding>>,
    name: String,
    dimension: i32,
}

impl FastembedEmbeddingProvider {
    /// Load (downloading on first use) the named model.
    pub fn new(model_name: &str) -> Result<Self> {
        let (model, dimension) = Self::parse_model_name(model_name)?;
        let model = TextEmbedding::try_new(InitOptions::new(model)).map_err(|e| {
            RetrievalErr::EmbeddingFailed {
                cause: format!("failed to load {model_name}: {e}"),
            }
        })?;
        tracing::info!(model = model_name, dimension, "Loaded local embedding model");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            name: model_name.to_string(),
            dimension,
        })
    }

    /// Model and output dimension for a configured model name.
    pub(crate) fn parse_model_name(name: &str) -> Result<(EmbeddingModel, i32)> {
        let normalized = name.rsplit('/').next().unwrap_or(name).to_lowercase();
        match normalized.as_str() {
            "all-minilm-l6-v2" => Ok((EmbeddingModel::AllMiniLML6V2, 384)),
            "bge-small-en-v1.5" => Ok((EmbeddingModel::BGESmallENV15, 384)),
            "bge-base-en-v1.5" => Ok((EmbeddingModel::BGEBaseENV15, 768)),
            "nomic-embed-text-v1.5" => Ok((EmbeddingModel::NomicEmbedTextV15, 768)),
            _ => Err(RetrievalErr::ConfigError {
                field: "embedding.model".to_string(),
                cause: format!("unsupported local embedding model '{name}'"),
            }),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for FastembedEmbeddingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> i32 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RetrievalErr::EmbeddingFailed {
                cause: "Empty response".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let model = model.lock().map_err(|_| RetrievalErr::EmbeddingFailed {
                cause: "embedding model lock poisoned".to_string(),
            })?;
            let mut vectors =
                model
                    .embed(texts, None)
                    .map_err(|e| RetrievalErr::EmbeddingFailed {
                        cause: e.to_string(),
                    })?;
            for vector in &mut vectors {
                l2_normalize(vector);
            }
            Ok(vectors)
        })
        .await
        .map_err(|e| RetrievalErr::EmbeddingFailed {
            cause: format!("embedding task failed: {e}"),
        })?
    }
}

#[cfg(test)]
#[path = "fastembed.test.rs"]
mod tests;
