use async_trait::async_trait;

use super::*;
use crate::config::DedupMode;
use crate::config::RetryConfig;
use crate::error::RetrievalErr;
use crate::model::Field;
use crate::search::HybridRetriever;
use crate::search::SearchParams;
use crate::storage::MemoryStore;
use crate::types::StoreFilter;
use crate::types::StoreHit;
use pretty_assertions::assert_eq;

/// Fixed-vector embedder that refuses texts containing a marker.
struct PickyEmbedder {
    refuse: Option<&'static str>,
}

#[async_trait]
impl EmbeddingProvider for PickyEmbedder {
    fn name(&self) -> &str {
        "picky"
    }

    fn dimension(&self) -> i32 {
        3
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if let Some(marker) = self.refuse
            && text.contains(marker)
        {
            return Err(RetrievalErr::EmbeddingFailed {
                cause: "refused".to_string(),
            });
        }
        Ok(vec![1.0, 0.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}

/// Store whose upserts always fail.
struct ReadOnlyStore;

#[async_trait]
impl VectorStore for ReadOnlyStore {
    fn name(&self) -> &str {
        "read-only"
    }

    async fn search_dense(
        &self,
        _vector: &[f32],
        _limit: usize,
        _filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        Ok(Vec::new())
    }

    async fn search_hybrid(
        &self,
        _query: &str,
        _limit: usize,
        _dense_k: usize,
        _sparse_k: usize,
        _filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        Ok(Vec::new())
    }

    async fn upsert(&self, _points: Vec<StoredPoint>) -> Result<()> {
        Err(RetrievalErr::InvalidInput("store is read-only".to_string()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}

fn reg(device: &str, peripheral: &str, register: &str) -> Register {
    Register::new(device, peripheral, register, 0x4001_1000, 0x4)
        .with_fields(vec![Field::new("EN", 0, 1)])
}

fn sample() -> Vec<Register> {
    vec![
        reg("STM32F407", "USART1", "SR"),
        reg("STM32F407", "USART1", "DR"),
        reg("STM32F407", "GPIOA", "MODER"),
        reg("STM32F411", "USART1", "SR"),
    ]
}

fn config(mode: DedupMode) -> RetrievalConfig {
    let mut config = RetrievalConfig::default();
    config.dedup.mode = mode;
    config.embedding.batch_size = 2;
    config.retry = RetryConfig {
        max_retries: 0,
        base_delay_ms: 1,
        ..RetryConfig::default()
    };
    config
}

fn embedder(refuse: Option<&'static str>) -> Arc<dyn EmbeddingProvider> {
    Arc::new(PickyEmbedder { refuse })
}

#[tokio::test]
async fn test_run_indexes_every_chunk() {
    let embedder = embedder(None);
    let store = Arc::new(MemoryStore::new(embedder.clone()));
    let pipeline = IndexPipeline::new(config(DedupMode::None), embedder, store.clone())
        .with_upsert_batch_size(3);

    let report = pipeline.run(sample()).await.expect("index");

    assert_eq!(report.registers_in, 4);
    assert_eq!(report.registers_after_dedup, 4);
    assert!(report.dedup.is_empty());
    assert_eq!(report.chunks.get("peripheral_summary"), Some(&3));
    assert_eq!(report.chunks.get("device_summary"), Some(&2));
    assert_eq!(report.chunks.get("register"), None);
    assert!(report.failures.is_empty());
    assert_eq!(report.upserted, report.total_chunks());
    assert_eq!(store.count().await.expect("count"), report.upserted);
    assert!(report.finished_at >= report.started_at);
}

#[tokio::test]
async fn test_reindexing_is_idempotent() {
    let embedder = embedder(None);
    let store = Arc::new(MemoryStore::new(embedder.clone()));
    let pipeline = IndexPipeline::new(config(DedupMode::None), embedder, store.clone());

    let first = pipeline.run(sample()).await.expect("index");
    pipeline.run(sample()).await.expect("reindex");
    assert_eq!(store.count().await.expect("count"), first.upserted);
}

#[tokio::test]
async fn test_exact_duplicates_removed_before_chunking() {
    let mut registers = sample();
    registers.push(reg("STM32F407", "USART1", "SR"));

    let prepared = prepare_chunks(registers, &config(DedupMode::Exact));
    assert_eq!(prepared.registers_in, 5);
    assert_eq!(prepared.registers.len(), 4);
    assert_eq!(prepared.dedup.len(), 1);
    assert_eq!(prepared.dedup[0].removed(), 1);
}

#[tokio::test]
async fn test_embedding_failures_are_reported_not_fatal() {
    let embedder = embedder(Some("GPIOA"));
    let store = Arc::new(MemoryStore::new(embedder.clone()));
    let pipeline = IndexPipeline::new(config(DedupMode::None), embedder, store.clone());

    let report = pipeline.run(sample()).await.expect("index");

    let embed_failures = report.failures_at(FailureStage::Embed);
    assert!(embed_failures > 0);
    assert!(
        report
            .failures
            .iter()
            .all(|f| f.stage == FailureStage::Embed && f.reason.contains("refused"))
    );
    assert_eq!(report.upserted + embed_failures, report.total_chunks());
    assert_eq!(store.count().await.expect("count"), report.upserted);
}

#[tokio::test]
async fn test_upsert_failures_are_reported_not_fatal() {
    let pipeline = IndexPipeline::new(
        config(DedupMode::None),
        embedder(None),
        Arc::new(ReadOnlyStore),
    );

    let report = pipeline.run(sample()).await.expect("index");
    assert_eq!(report.upserted, 0);
    assert_eq!(report.failures_at(FailureStage::Upsert), report.total_chunks());
}

#[tokio::test]
async fn test_malformed_group_recorded_as_chunk_failure() {
    let mut registers = sample();
    registers.push(Register::new("STM32F407", "SPI1", "CR1", 0x4001_3000, 0x0).with_fields(
        vec![Field::new("BROKEN", 3, 0)],
    ));

    let embedder = embedder(None);
    let store = Arc::new(MemoryStore::new(embedder.clone()));
    let report = IndexPipeline::new(config(DedupMode::None), embedder, store)
        .run(registers)
        .await
        .expect("index");

    assert_eq!(report.failures_at(FailureStage::Chunk), 1);
    assert_eq!(report.upserted, report.total_chunks());
}

#[tokio::test]
async fn test_default_config_answers_address_questions() {
    let config = RetrievalConfig::default();
    let usart = |name: &str, offset: u64| {
        Register::new("STM32F407", "USART1", name, 0x4001_1000, offset)
            .with_fields(vec![Field::new("EN", 0, 1)])
    };
    let registers = vec![usart("SR", 0x0), usart("DR", 0x4), usart("CR1", 0xC)];

    let embedder = embedder(None);
    let store = Arc::new(MemoryStore::new(embedder.clone()));
    let report = IndexPipeline::new(config.clone(), embedder, store.clone())
        .run(registers)
        .await
        .expect("index");
    assert_eq!(report.chunks.get("register"), None);

    let retriever = HybridRetriever::from_config(store, &config);
    let params = SearchParams::from(&config.search);

    let results = retriever
        .search("Which register is at 0x40011004?", &params)
        .await
        .expect("search");
    assert!(!results.is_empty());
    for result in &results {
        let addresses = result.metadata["addresses"].as_array().expect("addresses");
        assert!(addresses.iter().any(|a| a == "0x40011004"));
    }

    let results = retriever
        .search("what is at 0x4001100c", &params)
        .await
        .expect("search");
    assert!(!results.is_empty());
}
