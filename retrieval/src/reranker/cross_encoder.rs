//! Local cross-encoder scorer backed by fastembed (ONNX Runtime).
//!
//! Model inference is CPU-bound, so it runs on the blocking thread pool.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use fastembed::RerankInitOptions;
use fastembed::RerankerModel;
use fastembed::TextRerank;

use crate::error::Result;
use crate::error::RetrievalErr;
use crate::traits::PairScorer;

/// Map a configured model name onto a fastembed reranker model.
fn resolve_model(name: &str) -> Result<RerankerModel> {
    match name {
        "jina-reranker-v1-turbo-en" => Ok(RerankerModel::JINARerankerV1TurboEn),
        "bge-reranker-base" => Ok(RerankerModel::BGERerankerBase),
        other => Err(RetrievalErr::ConfigError {
            field: "reranker.model".to_string(),
            cause: format!("unsupported local reranker model '{other}'"),
        }),
    }
}

/// fastembed `TextRerank` exposed as a [`PairScorer`].
pub struct CrossEncoderScorer {
    model: Arc<Mutex<TextRerank>>,
    name: String,
}

impl CrossEncoderScorer {
    /// Load (downloading on first use) the named model.
    pub fn new(model_name: &str) -> Result<Self> {
        let model = TextRerank::try_new(RerankInitOptions::new(resolve_model(model_name)?))
            .map_err(|e| RetrievalErr::RerankFailed {
                cause: format!("failed to load {model_name}: {e}"),
            })?;
        tracing::info!(model = model_name, "Loaded cross-encoder");
        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            name: model_name.to_string(),
        })
    }
}

#[async_trait]
impl PairScorer for CrossEncoderScorer {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score_pairs(&self, query: &str, documents: &[String]) -> Result<Vec<f32>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let documents = documents.to_vec();
        tokio::task::spawn_blocking(move || {
            let model = model.lock().map_err(|_| RetrievalErr::RerankFailed {
                cause: "reranker model lock poisoned".to_string(),
            })?;
            let docs: Vec<&str> = documents.iter().map(String::as_str).collect();
            let ranked = model
                .rerank(query.as_str(), docs, false, None)
                .map_err(|e| RetrievalErr::RerankFailed {
                    cause: e.to_string(),
                })?;

            let mut scores = vec![0.0; documents.len()];
            for item in ranked {
                if let Some(slot) = scores.get_mut(item.index) {
                    *slot = item.score;
                }
            }
            Ok(scores)
        })
        .await
        .map_err(|e| RetrievalErr::RerankFailed {
            cause: format!("reranker task failed: {e}"),
        })?
    }
}
