use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_defaults_match_reference_pipeline() {
    let config = RetrievalConfig::default();
    assert_eq!(config.dedup.mode, DedupMode::ExactThenGeneralized);
    assert_eq!(config.dedup.fallback_prefix_len, 4);
    assert_eq!(config.chunking.summary_max_chars, 400);
    assert_eq!(config.chunking.detail_max_chars, 400);
    assert_eq!(config.ranking.peripheral_boost, 1.5);
    assert_eq!(config.ranking.register_boost, 1.4);
    assert_eq!(config.ranking.summary_downweight, 0.7);
    assert_eq!(config.ranking.peripheral_penalty, 0.5);
    assert_eq!(config.reranker.hybrid_weight, 0.5);
    assert_eq!(config.reranker.rerank_weight, 0.5);
    assert_eq!(config.reranker.post_rerank_multiplier, 0.1);
    assert_eq!(config.search.top_k, 8);
    assert_eq!(config.search.vector_k, 40);
    assert_eq!(config.search.bm25_k, 40);
    assert_eq!(config.search.rerank_top_n, 20);
    assert_eq!(config.embedding.dimension, 384);
    assert_eq!(config.store.rrf_k, 60.0);
}

#[test]
fn test_default_config_has_no_value_warnings() {
    let warnings = RetrievalConfig::default().validate();
    assert!(
        warnings
            .iter()
            .all(|w| !matches!(w, ConfigWarning::InvalidValue { .. })),
        "unexpected warnings: {warnings:?}"
    );
}

#[test]
fn test_partial_toml_keeps_defaults() {
    let config: RetrievalConfig = toml::from_str(
        r#"
[dedup]
mode = "exact"

[search]
top_k = 3
"#,
    )
    .expect("parse");
    assert_eq!(config.dedup.mode, DedupMode::Exact);
    assert_eq!(config.dedup.fallback_prefix_len, 4);
    assert_eq!(config.search.top_k, 3);
    assert_eq!(config.search.rerank_top_n, 20);
    assert_eq!(config.chunking, ChunkingConfig::default());
}

#[test]
fn test_validate_flags_bad_values() {
    let mut config = RetrievalConfig::default();
    config.dedup.fallback_prefix_len = 0;
    config.ranking.peripheral_penalty = 1.5;
    config.chunking.summary_max_chars = 10;
    config.search.top_k = 0;

    let fields: Vec<&str> = config
        .validate()
        .iter()
        .filter_map(|w| match w {
            ConfigWarning::InvalidValue { field, .. } => Some(*field),
            ConfigWarning::MissingDependency { .. } => None,
        })
        .collect();

    assert!(fields.contains(&"dedup.fallback_prefix_len"));
    assert!(fields.contains(&"ranking.peripheral_penalty"));
    assert!(fields.contains(&"chunking.summary_max_chars"));
    assert!(fields.contains(&"search.top_k"));
}

#[test]
fn test_from_file_and_load_project_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config_dir = dir.path().join(".svd-retrieval");
    std::fs::create_dir_all(&config_dir).expect("mkdir");
    std::fs::write(
        config_dir.join("config.toml"),
        "[reranker]\nenabled = true\nhybrid_weight = 0.3\nrerank_weight = 0.7\n",
    )
    .expect("write");

    let config = RetrievalConfig::load(dir.path()).expect("load");
    assert!(config.reranker.enabled);
    assert_eq!(config.reranker.hybrid_weight, 0.3);
    assert_eq!(config.reranker.rerank_weight, 0.7);
    assert!(config.reranker.post_rerank_penalty);
}

#[test]
fn test_from_file_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[search\ntop_k = ").expect("write");

    let err = RetrievalConfig::from_file(&path).expect_err("should fail");
    assert!(matches!(err, RetrievalErr::ConfigParseError { .. }));
}

#[test]
fn test_toml_roundtrip_of_defaults() {
    let config = RetrievalConfig::default();
    let text = config.to_toml().expect("serialize");
    let parsed: RetrievalConfig = toml::from_str(&text).expect("parse");
    assert_eq!(parsed, config);
}

#[test]
fn test_warning_display() {
    let warning = ConfigWarning::InvalidValue {
        field: "search.top_k",
        reason: "must be > 0, got 0".to_string(),
    };
    assert_eq!(
        warning.to_string(),
        "Invalid value for 'search.top_k': must be > 0, got 0"
    );
}
