//! Qdrant vector store over the REST API.
//!
//! The collection carries a named dense vector `dense` (cosine) and a named
//! sparse vector `bm25` filled by Qdrant's server-side BM25 inference.
//! Hybrid queries prefetch both and fuse them with RRF on the server.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;
use sha2::Digest;
use sha2::Sha256;

use crate::error::Result;
use crate::error::RetrievalErr;
use crate::search::constants::DEFAULT_RRF_K;
use crate::traits::EmbeddingProvider;
use crate::traits::StoredPoint;
use crate::traits::VectorStore;
use crate::types::StoreFilter;
use crate::types::StoreHit;

const DENSE_VECTOR: &str = "dense";
const BM25_VECTOR: &str = "bm25";
const BM25_MODEL: &str = "Qdrant/bm25";
const STORE_NAME: &str = "qdrant";

/// Deterministic UUID-formatted point id for a chunk id.
///
/// Qdrant only accepts integers or UUIDs as point ids; the chunk id itself
/// travels in the payload as `source_id`.
pub fn point_uuid(chunk_id: &str) -> String {
    let hex = hex::encode(Sha256::digest(chunk_id.as_bytes()));
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

fn filter_json(filter: Option<&StoreFilter>) -> Option<Value> {
    filter.map(|f| match f {
        StoreFilter::AddressEquals(address) => json!({
            "should": [
                {"key": "address", "match": {"value": address}},
                {"key": "addresses", "match": {"value": address}}
            ]
        }),
    })
}

#[derive(Debug, Deserialize)]
struct QdrantResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    points: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    #[serde(default)]
    payload: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct CountResult {
    count: usize,
}

#[derive(Debug, Deserialize)]
struct ExistsResult {
    exists: bool,
}

/// Qdrant REST client bound to one collection.
#[derive(Clone)]
pub struct QdrantStore {
    base_url: String,
    collection: String,
    api_key: Option<String>,
    rrf_k: f32,
    embedder: Arc<dyn EmbeddingProvider>,
    client: reqwest::Client,
}

impl QdrantStore {
    pub fn new(
        base_url: impl Into<String>,
        collection: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            collection: collection.into(),
            api_key: None,
            rrf_k: DEFAULT_RRF_K,
            embedder,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_rrf_k(mut self, rrf_k: f32) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/collections/{}{suffix}", self.base_url, self.collection)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        url: String,
        body: Option<Value>,
    ) -> Result<T> {
        let mut request = self.client.request(method, &url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalErr::store(STORE_NAME, e))?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(RetrievalErr::store(
                STORE_NAME,
                format!("{url} returned {status}: {error_text}"),
            ));
        }

        let parsed: QdrantResponse<T> = response
            .json()
            .await
            .map_err(|e| RetrievalErr::store(STORE_NAME, e))?;
        Ok(parsed.result)
    }

    async fn query(&self, body: Value) -> Result<Vec<StoreHit>> {
        let result: QueryResult = self
            .send(reqwest::Method::POST, self.url("/points/query"), Some(body))
            .await?;
        Ok(result
            .points
            .into_iter()
            .map(|p| StoreHit::new(p.score, p.payload.unwrap_or_default()))
            .collect())
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn name(&self) -> &str {
        STORE_NAME
    }

    async fn search_dense(
        &self,
        vector: &[f32],
        limit: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        let mut body = json!({
            "query": vector,
            "using": DENSE_VECTOR,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(filter) = filter_json(filter) {
            body["filter"] = filter;
        }
        self.query(body).await
    }

    async fn search_hybrid(
        &self,
        query: &str,
        limit: usize,
        dense_k: usize,
        sparse_k: usize,
        filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        let vector = self.embedder.embed(query).await?;
        let filter = filter_json(filter);

        let mut dense = json!({
            "query": vector,
            "using": DENSE_VECTOR,
            "limit": dense_k,
        });
        let mut sparse = json!({
            "query": {"text": query, "model": BM25_MODEL},
            "using": BM25_VECTOR,
            "limit": sparse_k,
        });
        if let Some(filter) = filter {
            dense["filter"] = filter.clone();
            sparse["filter"] = filter;
        }

        let body = json!({
            "prefetch": [dense, sparse],
            "query": {"rrf": {"k": self.rrf_k}},
            "limit": limit,
            "with_payload": true,
        });
        let hits = self.query(body).await?;
        tracing::debug!(
            collection = %self.collection,
            returned = hits.len(),
            "Qdrant hybrid search"
        );
        Ok(hits)
    }

    async fn ensure_collection(&self, dimension: i32) -> Result<()> {
        let exists: ExistsResult = self
            .send(reqwest::Method::GET, self.url("/exists"), None)
            .await?;
        if exists.exists {
            return Ok(());
        }

        let body = json!({
            "vectors": {DENSE_VECTOR: {"size": dimension, "distance": "Cosine"}},
            "sparse_vectors": {BM25_VECTOR: {"modifier": "idf"}},
        });
        let _: Value = self
            .send(reqwest::Method::PUT, self.url(""), Some(body))
            .await?;
        tracing::info!(
            collection = %self.collection,
            dimension,
            "Created Qdrant collection"
        );
        Ok(())
    }

    async fn upsert(&self, points: Vec<StoredPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let points: Vec<Value> = points
            .into_iter()
            .map(|p| {
                let text = p
                    .payload
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                json!({
                    "id": point_uuid(&p.id),
                    "vector": {
                        DENSE_VECTOR: p.vector,
                        BM25_VECTOR: {"text": text, "model": BM25_MODEL},
                    },
                    "payload": p.payload,
                })
            })
            .collect();
        let count = points.len();

        let _: Value = self
            .send(
                reqwest::Method::PUT,
                self.url("/points?wait=true"),
                Some(json!({ "points": points })),
            )
            .await?;
        tracing::debug!(collection = %self.collection, count, "Upserted points");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let result: CountResult = self
            .send(
                reqwest::Method::POST,
                self.url("/points/count"),
                Some(json!({"exact": true})),
            )
            .await?;
        Ok(result.count)
    }
}

#[cfg(test)]
#[path = "qdrant.test.rs"]
mod tests;
