use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_l2_normalize() {
    let mut v = vec![3.0, 4.0];
    l2_normalize(&mut v);
    assert_eq!(v, vec![0.6, 0.8]);

    let mut zero = vec![0.0, 0.0];
    l2_normalize(&mut zero);
    assert_eq!(zero, vec![0.0, 0.0]);
}

#[test]
fn test_create_embedder_requires_api_key() {
    let config = EmbeddingConfig {
        api_key_env: "SVD_RETRIEVAL_TEST_UNSET_KEY".to_string(),
        ..EmbeddingConfig::default()
    };
    let err = create_embedder(&config).err().expect("missing key");
    assert!(matches!(err, RetrievalErr::ConfigError { .. }));
}

#[cfg(not(feature = "local-embeddings"))]
#[test]
fn test_local_embedder_not_enabled() {
    let config = EmbeddingConfig {
        provider: EmbeddingProviderKind::Local,
        ..EmbeddingConfig::default()
    };
    let err = create_embedder(&config).err().expect("feature off");
    assert!(matches!(err, RetrievalErr::NotEnabled(_)));
}
