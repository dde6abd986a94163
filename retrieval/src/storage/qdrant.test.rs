use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::*;
use pretty_assertions::assert_eq;

struct FixedEmbedder;

#[async_trait]
impl EmbeddingProvider for FixedEmbedder {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> i32 {
        2
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![0.5, 0.5])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect())
    }
}

fn store_for(server: &MockServer) -> QdrantStore {
    QdrantStore::new(server.uri(), "svd_registers", Arc::new(FixedEmbedder)).with_api_key("secret")
}

#[test]
fn test_point_uuid_is_stable_uuid_shape() {
    let id = point_uuid("USART1_summary_0a1b2c3d");
    assert_eq!(id, point_uuid("USART1_summary_0a1b2c3d"));
    assert_ne!(id, point_uuid("USART1_detail_1_0a1b2c3d"));
    let lens: Vec<usize> = id.split('-').map(str::len).collect();
    assert_eq!(lens, vec![8, 4, 4, 4, 12]);
}

#[test]
fn test_filter_json() {
    assert_eq!(filter_json(None), None);
    assert_eq!(
        filter_json(Some(&StoreFilter::AddressEquals("0x40011004".to_string()))),
        Some(json!({"should": [
            {"key": "address", "match": {"value": "0x40011004"}},
            {"key": "addresses", "match": {"value": "0x40011004"}}
        ]}))
    );
}

#[tokio::test]
async fn test_hybrid_query_prefetches_dense_and_bm25() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/svd_registers/points/query"))
        .and(header("api-key", "secret"))
        .and(body_partial_json(json!({
            "prefetch": [
                {
                    "query": [0.5, 0.5],
                    "using": "dense",
                    "limit": 40,
                    "filter": {"should": [
                        {"key": "address", "match": {"value": "0x40011004"}},
                        {"key": "addresses", "match": {"value": "0x40011004"}}
                    ]}
                },
                {
                    "query": {"text": "USART1 DR at 0x40011004", "model": "Qdrant/bm25"},
                    "using": "bm25",
                    "limit": 30
                }
            ],
            "query": {"rrf": {"k": 60.0}},
            "limit": 8,
            "with_payload": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"points": [
                {"id": "a", "score": 0.03, "payload": {"source_id": "usart", "peripheral": "USART1"}},
                {"id": "b", "score": 0.01}
            ]},
            "status": "ok",
            "time": 0.001
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let filter = StoreFilter::AddressEquals("0x40011004".to_string());
    let hits = store
        .search_hybrid("USART1 DR at 0x40011004", 8, 40, 30, Some(&filter))
        .await
        .expect("hybrid search");

    assert_eq!(hits.len(), 2);
    assert!((hits[0].score - 0.03).abs() < 1e-6);
    assert_eq!(
        hits[0].payload.get("peripheral").and_then(Value::as_str),
        Some("USART1")
    );
    assert!(hits[1].payload.is_empty());
}

#[tokio::test]
async fn test_server_error_is_retryable_store_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/svd_registers/points/query"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let store = store_for(&server);
    let err = store
        .search_dense(&[1.0, 0.0], 5, None)
        .await
        .expect_err("server error");
    assert!(matches!(err, RetrievalErr::StoreFailed { .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_upsert_sends_named_vectors() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/collections/svd_registers/points"))
        .and(body_partial_json(json!({
            "points": [{
                "id": point_uuid("c1"),
                "vector": {
                    "dense": [1.0, 0.0],
                    "bm25": {"text": "USART1 SR", "model": "Qdrant/bm25"}
                },
                "payload": {"source_id": "c1", "text": "USART1 SR"}
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {"operation_id": 1, "status": "completed"},
            "status": "ok"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = store_for(&server);
    let payload = json!({"source_id": "c1", "text": "USART1 SR"});
    store
        .upsert(vec![StoredPoint {
            id: "c1".to_string(),
            vector: vec![1.0, 0.0],
            payload: payload.as_object().cloned().expect("object payload"),
        }])
        .await
        .expect("upsert");

    // empty upserts never reach the server
    store.upsert(Vec::new()).await.expect("empty upsert");
}

#[tokio::test]
async fn test_ensure_collection_creates_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/collections/svd_registers/exists"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"exists": false}})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/collections/svd_registers"))
        .and(body_partial_json(json!({
            "vectors": {"dense": {"size": 384, "distance": "Cosine"}},
            "sparse_vectors": {"bm25": {"modifier": "idf"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": true})))
        .expect(1)
        .mount(&server)
        .await;

    store_for(&server)
        .ensure_collection(384)
        .await
        .expect("create collection");
}

#[tokio::test]
async fn test_count() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/collections/svd_registers/points/count"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"result": {"count": 42}})),
        )
        .mount(&server)
        .await;

    assert_eq!(store_for(&server).count().await.expect("count"), 42);
}
