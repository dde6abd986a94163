use serde_json::json;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_partial_json;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;

use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_new() {
    let provider = OpenAIEmbeddings::new("test-key");
    assert_eq!(provider.dimension(), default_embedding_dimension());
    assert_eq!(provider.model, DEFAULT_MODEL);
    assert_eq!(provider.name(), DEFAULT_MODEL);
}

#[test]
fn test_with_dimension() {
    let provider = OpenAIEmbeddings::new("test-key").with_dimension(512);
    assert_eq!(provider.dimension(), 512);
}

#[test]
fn test_with_model() {
    let provider = OpenAIEmbeddings::new("test-key").with_model("all-MiniLM-L6-v2");
    assert_eq!(provider.model, "all-MiniLM-L6-v2");
}

#[test]
fn test_dimensions_sent_only_to_resizable_models() {
    let input = vec!["a".to_string()];
    let openai = OpenAIEmbeddings::new("test-key").with_dimension(512);
    assert_eq!(openai.body(&input).dimensions, Some(512));

    let local = openai.with_model("all-MiniLM-L6-v2");
    assert_eq!(local.body(&input).dimensions, None);
}

#[test]
fn test_with_base_url() {
    let provider = OpenAIEmbeddings::new("test-key").with_base_url("http://localhost:8080/v1/");
    assert_eq!(provider.endpoint, "http://localhost:8080/v1/embeddings");
}

fn provider_for(server: &MockServer) -> OpenAIEmbeddings {
    OpenAIEmbeddings::new("test-key")
        .with_base_url(server.uri())
        .with_dimension(2)
}

#[tokio::test]
async fn test_embed_batch_orders_and_normalizes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({"input": ["a", "b"], "dimensions": 2})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"index": 1, "embedding": [0.0, 2.0]},
                {"index": 0, "embedding": [3.0, 4.0]}
            ],
            "model": "m",
            "usage": {"prompt_tokens": 2, "total_tokens": 2}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let vectors = provider
        .embed_batch(&["a".to_string(), "b".to_string()])
        .await
        .expect("embed batch");
    assert_eq!(vectors, vec![vec![0.6, 0.8], vec![0.0, 1.0]]);
}

#[tokio::test]
async fn test_dimension_mismatch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"index": 0, "embedding": [1.0, 0.0, 0.0]}]
        })))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.embed("a").await.expect_err("wrong dimension");
    assert!(matches!(
        err,
        RetrievalErr::EmbeddingDimensionMismatch {
            expected: 2,
            actual: 3
        }
    ));
}

#[tokio::test]
async fn test_http_error_is_embedding_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/embeddings"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let err = provider.embed("a").await.expect_err("server error");
    assert!(matches!(err, RetrievalErr::EmbeddingFailed { .. }));
    assert!(err.to_string().contains("overloaded"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_empty_batch_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let provider = provider_for(&server);
    let vectors = provider.embed_batch(&[]).await.expect("empty batch");
    assert!(vectors.is_empty());
}
