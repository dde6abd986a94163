//! Configuration for the register retrieval system.
//!
//! A single [`RetrievalConfig`] value is loaded once and passed to each
//! component. Every section has serde defaults, so a partial TOML file only
//! overrides the keys it names.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::RetrievalErr;

/// Project-level config path, relative to the working directory.
const PROJECT_CONFIG: &str = ".svd-retrieval/config.toml";

/// Main retrieval configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalConfig {
    /// Deduplication configuration
    #[serde(default)]
    pub dedup: DedupConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Ranking (boost/penalty) configuration
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Cross-encoder reranker configuration
    #[serde(default)]
    pub reranker: RerankerConfig,

    /// Search entry point defaults
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Vector store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Timeout and retry policy for external calls
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Which deduplication passes run before chunking.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupMode {
    /// Use every parsed record as-is.
    None,
    /// Drop exact duplicates only.
    Exact,
    /// Merge structurally identical registers across devices and instances.
    Generalized,
    /// Exact pass followed by the generalized pass.
    #[default]
    ExactThenGeneralized,
}

/// Deduplication configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupConfig {
    /// Passes to run (default: exact_then_generalized)
    #[serde(default)]
    pub mode: DedupMode,

    /// Characters of the peripheral name used as the family key when a
    /// register has no explicit group (default: 4). Names sharing this
    /// prefix (TIM1 / TIM10) collapse into one family.
    #[serde(default = "default_fallback_prefix_len")]
    pub fallback_prefix_len: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            mode: DedupMode::default(),
            fallback_prefix_len: default_fallback_prefix_len(),
        }
    }
}

fn default_fallback_prefix_len() -> usize {
    4
}

/// Chunking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkingConfig {
    /// Emit one chunk per register (default: false)
    #[serde(default)]
    pub register_chunks: bool,

    /// Emit peripheral summary and detail chunks (default: true)
    #[serde(default = "default_true")]
    pub peripheral_chunks: bool,

    /// Emit one summary chunk per device (default: true)
    #[serde(default = "default_true")]
    pub device_summaries: bool,

    /// Character budget of a register chunk
    #[serde(default = "default_register_max_chars")]
    pub register_max_chars: usize,

    /// Character budget of a peripheral summary chunk
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,

    /// Character budget of each peripheral detail chunk
    #[serde(default = "default_detail_max_chars")]
    pub detail_max_chars: usize,

    /// Character budget of a device summary chunk
    #[serde(default = "default_device_summary_max_chars")]
    pub device_summary_max_chars: usize,

    /// Render the device name
    #[serde(default = "default_true")]
    pub include_device: bool,

    /// Render peripheral descriptions
    #[serde(default = "default_true")]
    pub include_peripheral_desc: bool,

    /// Render register descriptions
    #[serde(default = "default_true")]
    pub include_register_desc: bool,

    /// Render field lists
    #[serde(default = "default_true")]
    pub include_field_names: bool,

    /// Render field descriptions
    #[serde(default = "default_true")]
    pub include_field_desc: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            register_chunks: false,
            peripheral_chunks: true,
            device_summaries: true,
            register_max_chars: default_register_max_chars(),
            summary_max_chars: default_summary_max_chars(),
            detail_max_chars: default_detail_max_chars(),
            device_summary_max_chars: default_device_summary_max_chars(),
            include_device: true,
            include_peripheral_desc: true,
            include_register_desc: true,
            include_field_names: true,
            include_field_desc: true,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_register_max_chars() -> usize {
    1000
}
fn default_summary_max_chars() -> usize {
    400
}
fn default_detail_max_chars() -> usize {
    400
}
fn default_device_summary_max_chars() -> usize {
    2000
}

/// Multipliers applied to fused hits before reranking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankingConfig {
    /// Hit peripheral family is among the query's peripheral hints
    #[serde(default = "default_peripheral_boost")]
    pub peripheral_boost: f32,

    /// Hit register name equals a register hint (case-insensitive)
    #[serde(default = "default_register_boost")]
    pub register_boost: f32,

    /// Device summary hit for a query that names a peripheral or register
    #[serde(default = "default_summary_downweight")]
    pub summary_downweight: f32,

    /// Hit peripheral starts with a penalized prefix
    #[serde(default = "default_peripheral_penalty")]
    pub peripheral_penalty: f32,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            peripheral_boost: default_peripheral_boost(),
            register_boost: default_register_boost(),
            summary_downweight: default_summary_downweight(),
            peripheral_penalty: default_peripheral_penalty(),
        }
    }
}

fn default_peripheral_boost() -> f32 {
    1.5
}
fn default_register_boost() -> f32 {
    1.4
}
fn default_summary_downweight() -> f32 {
    0.7
}
fn default_peripheral_penalty() -> f32 {
    0.5
}

/// Cross-encoder reranker configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RerankerConfig {
    /// Enable cross-encoder reranking (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Local model name (requires the `neural-reranker` feature)
    #[serde(default = "default_reranker_model")]
    pub model: String,

    /// Blend the upstream score with the normalized rerank score;
    /// when false the normalized rerank score replaces it
    #[serde(default = "default_true")]
    pub combine_scores: bool,

    /// Weight of the upstream (boosted) score
    #[serde(default = "default_half")]
    pub hybrid_weight: f32,

    /// Weight of the sigmoid-normalized rerank score
    #[serde(default = "default_half")]
    pub rerank_weight: f32,

    /// Apply the strong post-rerank peripheral penalty (default: true)
    #[serde(default = "default_true")]
    pub post_rerank_penalty: bool,

    /// Multiplier of the post-rerank peripheral penalty
    #[serde(default = "default_post_rerank_multiplier")]
    pub post_rerank_multiplier: f32,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: default_reranker_model(),
            combine_scores: true,
            hybrid_weight: default_half(),
            rerank_weight: default_half(),
            post_rerank_penalty: true,
            post_rerank_multiplier: default_post_rerank_multiplier(),
        }
    }
}

fn default_reranker_model() -> String {
    "jina-reranker-v1-turbo-en".to_string()
}
fn default_half() -> f32 {
    0.5
}
fn default_post_rerank_multiplier() -> f32 {
    0.1
}

/// Defaults of the search entry point.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Final number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Dense candidates fetched before fusion
    #[serde(default = "default_candidate_k")]
    pub vector_k: usize,

    /// Sparse candidates fetched before fusion
    #[serde(default = "default_candidate_k")]
    pub bm25_k: usize,

    /// Candidates handed to the reranker
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Restrict the store query to the first address literal in the query
    #[serde(default = "default_true")]
    pub address_filter: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            vector_k: default_candidate_k(),
            bm25_k: default_candidate_k(),
            rerank_top_n: default_rerank_top_n(),
            address_filter: true,
        }
    }
}

fn default_top_k() -> usize {
    8
}
fn default_candidate_k() -> usize {
    40
}
fn default_rerank_top_n() -> usize {
    20
}

/// Embedding provider kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// OpenAI-compatible `/embeddings` HTTP endpoint.
    #[default]
    Openai,
    /// Local ONNX model via fastembed (requires the `local-embeddings` feature).
    Local,
}

/// Embedding configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider kind
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Model name
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: i32,

    /// Base URL of the HTTP provider
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Texts per `embed_batch` call
    #[serde(default = "default_embedding_batch_size")]
    pub batch_size: i32,

    /// Concurrent embedding workers during indexing
    #[serde(default = "default_embedding_workers")]
    pub workers: i32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            base_url: None,
            api_key_env: default_api_key_env(),
            batch_size: default_embedding_batch_size(),
            workers: default_embedding_workers(),
        }
    }
}

fn default_embedding_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}
/// Dimension of all-MiniLM-L6-v2.
pub fn default_embedding_dimension() -> i32 {
    384
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}
fn default_embedding_batch_size() -> i32 {
    64
}
fn default_embedding_workers() -> i32 {
    2
}

/// Vector store kind.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    /// Qdrant collection with a named dense vector and a BM25 sparse vector.
    #[default]
    Qdrant,
    /// In-process store, rebuilt on every run.
    Memory,
}

/// Vector store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    /// Store kind
    #[serde(default)]
    pub kind: StoreKind,

    /// Qdrant URL
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    /// Environment variable holding the Qdrant API key
    #[serde(default = "default_qdrant_api_key_env")]
    pub api_key_env: String,

    /// Collection name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// RRF smoothing constant used for fusion
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            url: default_qdrant_url(),
            api_key_env: default_qdrant_api_key_env(),
            collection: default_collection(),
            rrf_k: default_rrf_k(),
        }
    }
}

fn default_qdrant_url() -> String {
    "http://localhost:6333".to_string()
}
fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}
fn default_collection() -> String {
    "svd_registers".to_string()
}
fn default_rrf_k() -> f32 {
    60.0
}

/// Timeout and retry policy for calls to external services.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryConfig {
    /// Per-attempt timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum number of retry attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,

    /// Base delay in milliseconds for exponential backoff
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Fall back to one-by-one embedding when a batch keeps failing
    #[serde(default = "default_true")]
    pub fallback_to_single: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            fallback_to_single: true,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> i32 {
    3
}
fn default_base_delay_ms() -> u64 {
    100
}

impl RetrievalConfig {
    /// Load configuration from config files.
    ///
    /// Search order (first found wins):
    /// 1. `{workdir}/.svd-retrieval/config.toml` (project-level)
    /// 2. `~/.svd-retrieval/config.toml` (global)
    /// 3. Default
    pub fn load(workdir: &Path) -> Result<Self> {
        let project_config = workdir.join(PROJECT_CONFIG);
        if project_config.exists() {
            return Self::from_file(&project_config);
        }

        if let Some(home) = dirs::home_dir() {
            let global_config = home.join(PROJECT_CONFIG);
            if global_config.exists() {
                return Self::from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| RetrievalErr::ConfigParseError {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RetrievalErr::ConfigError {
            field: "retrieval".to_string(),
            cause: e.to_string(),
        })
    }

    /// Validate configuration consistency.
    ///
    /// Returns warnings for potential issues.
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.dedup.fallback_prefix_len == 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "dedup.fallback_prefix_len",
                reason: "must be > 0, got 0".to_string(),
            });
        }

        let budgets = [
            ("chunking.register_max_chars", self.chunking.register_max_chars),
            ("chunking.summary_max_chars", self.chunking.summary_max_chars),
            ("chunking.detail_max_chars", self.chunking.detail_max_chars),
            (
                "chunking.device_summary_max_chars",
                self.chunking.device_summary_max_chars,
            ),
        ];
        for (field, value) in budgets {
            if value < MIN_CHUNK_BUDGET {
                warnings.push(ConfigWarning::InvalidValue {
                    field,
                    reason: format!("must be >= {MIN_CHUNK_BUDGET}, got {value}"),
                });
            }
        }

        let multipliers = [
            ("ranking.peripheral_boost", self.ranking.peripheral_boost),
            ("ranking.register_boost", self.ranking.register_boost),
        ];
        for (field, value) in multipliers {
            if value < 1.0 {
                warnings.push(ConfigWarning::InvalidValue {
                    field,
                    reason: format!("boost must be >= 1.0, got {value}"),
                });
            }
        }
        let dampers = [
            ("ranking.summary_downweight", self.ranking.summary_downweight),
            ("ranking.peripheral_penalty", self.ranking.peripheral_penalty),
            (
                "reranker.post_rerank_multiplier",
                self.reranker.post_rerank_multiplier,
            ),
        ];
        for (field, value) in dampers {
            if !(0.0..=1.0).contains(&value) {
                warnings.push(ConfigWarning::InvalidValue {
                    field,
                    reason: format!("penalty must be within [0, 1], got {value}"),
                });
            }
        }

        if self.search.top_k == 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "search.top_k",
                reason: "must be > 0, got 0".to_string(),
            });
        }
        if self.reranker.enabled && self.search.rerank_top_n < self.search.top_k {
            warnings.push(ConfigWarning::InvalidValue {
                field: "search.rerank_top_n",
                reason: format!(
                    "must be >= top_k ({}), got {}",
                    self.search.top_k, self.search.rerank_top_n
                ),
            });
        }
        if self.reranker.enabled && !cfg!(feature = "neural-reranker") {
            warnings.push(ConfigWarning::MissingDependency {
                feature: "reranker.enabled",
                required: "neural-reranker",
            });
        }

        if self.embedding.dimension <= 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "embedding.dimension",
                reason: format!("must be > 0, got {}", self.embedding.dimension),
            });
        }
        if self.embedding.batch_size <= 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "embedding.batch_size",
                reason: format!("must be > 0, got {}", self.embedding.batch_size),
            });
        }
        if self.embedding.provider == EmbeddingProviderKind::Local
            && !cfg!(feature = "local-embeddings")
        {
            warnings.push(ConfigWarning::MissingDependency {
                feature: "embedding.provider = local",
                required: "local-embeddings",
            });
        }

        if self.store.rrf_k <= 0.0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "store.rrf_k",
                reason: format!("must be > 0, got {}", self.store.rrf_k),
            });
        }
        if self.retry.timeout_ms == 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "retry.timeout_ms",
                reason: "must be > 0, got 0".to_string(),
            });
        }
        if self.retry.max_retries < 0 {
            warnings.push(ConfigWarning::InvalidValue {
                field: "retry.max_retries",
                reason: format!("must be >= 0, got {}", self.retry.max_retries),
            });
        }

        warnings
    }
}

/// Smallest budget that still fits a chunk header.
const MIN_CHUNK_BUDGET: usize = 100;

/// Configuration warning.
#[derive(Debug, Clone)]
pub enum ConfigWarning {
    /// Required cargo feature missing for a configured option
    MissingDependency {
        feature: &'static str,
        required: &'static str,
    },
    /// Invalid numeric value
    InvalidValue { field: &'static str, reason: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::MissingDependency { feature, required } => {
                write!(
                    f,
                    "Option '{feature}' requires the '{required}' cargo feature"
                )
            }
            ConfigWarning::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{field}': {reason}")
            }
        }
    }
}

#[cfg(test)]
#[path = "config.test.rs"]
mod tests;
