//! OpenAI-compatible embeddings provider.
//!
//! Talks to any server exposing `POST {base}/embeddings`: the OpenAI API, or
//! a self-hosted server serving a sentence-transformer model. Vectors come
//! back L2-normalized.

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::config::default_embedding_dimension;
use crate::error::Result;
use crate::error::RetrievalErr;
use crate::traits::EmbeddingProvider;

use super::l2_normalize;

const DEFAULT_MODEL: &str = "text-embedding-3-small";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Models that accept a requested output size.
const RESIZABLE_MODEL_PREFIX: &str = "text-embedding-3";

/// Embeddings over an OpenAI-compatible HTTP endpoint.
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddings {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    dimension: i32,
}

impl OpenAIEmbeddings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint_for(DEFAULT_BASE_URL),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            dimension: default_embedding_dimension(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Expected vector size. Responses of any other size are rejected.
    pub fn with_dimension(mut self, dimension: i32) -> Self {
        self.dimension = dimension;
        self
    }

    /// API root such as `http://localhost:8080/v1`; a trailing `/` is ignored.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoint = endpoint_for(&base_url.into());
        self
    }

    fn body<'a>(&'a self, input: &'a [String]) -> EmbeddingsBody<'a> {
        EmbeddingsBody {
            model: &self.model,
            input,
            dimensions: self
                .model
                .starts_with(RESIZABLE_MODEL_PREFIX)
                .then_some(self.dimension),
            encoding_format: "float",
        }
    }

    async fn post(&self, input: &[String]) -> Result<EmbeddingsReply> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.body(input))
            .send()
            .await
            .map_err(embedding_failed)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RetrievalErr::EmbeddingFailed {
                cause: format!("{} returned {status}: {detail}", self.endpoint),
            });
        }
        response.json().await.map_err(embedding_failed)
    }

    /// Put rows back into input order, then validate and normalize them.
    fn into_vectors(&self, reply: EmbeddingsReply, expected: usize) -> Result<Vec<Vec<f32>>> {
        let mut rows = reply.data;
        if rows.len() != expected {
            return Err(RetrievalErr::EmbeddingFailed {
                cause: format!("asked for {expected} embeddings, received {}", rows.len()),
            });
        }
        rows.sort_by_key(|row| row.index);

        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            let mut vector = row.embedding;
            if vector.len() as i32 != self.dimension {
                return Err(RetrievalErr::EmbeddingDimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len() as i32,
                });
            }
            l2_normalize(&mut vector);
            vectors.push(vector);
        }
        Ok(vectors)
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn embedding_failed(e: reqwest::Error) -> RetrievalErr {
    RetrievalErr::EmbeddingFailed {
        cause: e.to_string(),
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddings {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> i32 {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| RetrievalErr::EmbeddingFailed {
            cause: "no embedding returned".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let reply = self.post(texts).await?;
        self.into_vectors(reply, texts.len())
    }
}

#[derive(Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<i32>,
    encoding_format: &'static str,
}

#[derive(Deserialize)]
struct EmbeddingsReply {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

#[cfg(test)]
#[path = "openai.test.rs"]
mod tests;
