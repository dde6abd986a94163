//! Core data types: chunks, store hits and ranked search results.

use std::collections::BTreeMap;

use derive_more::IsVariant;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;

/// Key of the debug trace inside result metadata.
pub const DEBUG_KEY: &str = "_debug";

/// Granularity of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
    Register,
    PeripheralSummary,
    PeripheralDetail,
    DeviceSummary,
}

impl ChunkKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChunkKind::Register => "register",
            ChunkKind::PeripheralSummary => "peripheral_summary",
            ChunkKind::PeripheralDetail => "peripheral_detail",
            ChunkKind::DeviceSummary => "device_summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "register" => Some(ChunkKind::Register),
            "peripheral_summary" => Some(ChunkKind::PeripheralSummary),
            "peripheral_detail" => Some(ChunkKind::PeripheralDetail),
            "device_summary" => Some(ChunkKind::DeviceSummary),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChunkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Denormalized lookup fields stored alongside a chunk.
///
/// Serialized flat into the vector store payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub device: String,
    pub peripheral: String,
    #[serde(default)]
    pub peripheral_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
    /// Comma-joined field names.
    #[serde(default)]
    pub field_names: String,
    #[serde(default)]
    pub peripheral_lower: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_lower: Option<String>,
    #[serde(default)]
    pub devices: Vec<String>,
    #[serde(default)]
    pub peripheral_instances: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_map: Option<BTreeMap<String, String>>,
    /// Sorted full addresses of every register the chunk covers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_part: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_series: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peripheral_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub peripherals: Vec<String>,
}

impl ChunkMetadata {
    /// Metadata with identity fields set and everything else empty.
    pub fn new(kind: ChunkKind, device: impl Into<String>, peripheral: impl Into<String>) -> Self {
        let peripheral = peripheral.into();
        Self {
            kind,
            device: device.into(),
            peripheral_lower: peripheral.to_lowercase(),
            peripheral,
            peripheral_group: String::new(),
            register: None,
            address: None,
            size: None,
            access: None,
            field_names: String::new(),
            register_lower: None,
            devices: Vec::new(),
            peripheral_instances: Vec::new(),
            address_map: None,
            addresses: Vec::new(),
            register_count: None,
            registers: Vec::new(),
            chunk_part: None,
            chunk_total: None,
            device_series: None,
            peripheral_count: None,
            peripherals: Vec::new(),
        }
    }
}

/// A bounded text unit prepared for embedding and retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within one build.
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn kind(&self) -> ChunkKind {
        self.metadata.kind
    }

    /// Store payload: metadata fields plus `text` and `source_id`.
    pub fn to_payload(&self) -> Map<String, Value> {
        let mut payload = match serde_json::to_value(&self.metadata) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        payload.insert("text".to_string(), Value::String(self.text.clone()));
        payload.insert("source_id".to_string(), Value::String(self.id.clone()));
        payload
    }
}

/// Hex-encoded SHA-256 of `input`, truncated to `len` characters.
pub fn short_hash(input: &str, len: usize) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest[..len.min(digest.len())].to_string()
}

/// Restriction passed to the vector store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreFilter {
    /// Chunk covers the given address: payload `address` equals it or
    /// payload `addresses` contains it.
    AddressEquals(String),
}

/// Raw scored point returned by a vector store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreHit {
    pub score: f32,
    pub payload: Map<String, Value>,
}

impl StoreHit {
    pub fn new(score: f32, payload: Map<String, Value>) -> Self {
        Self { score, payload }
    }

    fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Which boosts and penalties fired for a hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBoosts {
    pub peripheral_match: bool,
    pub register_match: bool,
    pub summary_downweight: bool,
    pub peripheral_penalty: bool,
}

/// Cross-encoder contribution to a result's score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankTrace {
    /// Sigmoid-normalized cross-encoder score.
    pub rerank_score: f32,
    pub rerank_score_raw: f32,
    /// Score before blending.
    pub hybrid_score: f32,
    pub combined: bool,
}

/// Penalty applied after reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRerankTrace {
    pub post_rerank_penalty: bool,
    pub pre_penalty_score: f32,
    pub penalty_applied: String,
}

/// Accumulating record of every score adjustment made to a result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugTrace {
    /// Score returned by the store's fused search.
    pub fused_score: f32,
    pub post_boost_score: f32,
    pub applied_boosts: AppliedBoosts,
    pub peripheral_penalties_active: Vec<String>,
    #[serde(flatten)]
    pub rerank: Option<RerankTrace>,
    #[serde(flatten)]
    pub post_rerank: Option<PostRerankTrace>,
}

/// A ranked result flowing through boosting, reranking and penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub score: f32,
    pub source_id: String,
    pub kind: Option<ChunkKind>,
    pub peripheral: String,
    pub register: String,
    pub address: Option<String>,
    pub text: String,
    /// Store payload as returned.
    pub metadata: Map<String, Value>,
    pub debug: DebugTrace,
}

impl SearchResult {
    /// Build a result from a store hit, seeding the debug trace with the
    /// fused score.
    pub fn from_hit(hit: StoreHit) -> Self {
        let text = hit.payload_str("text").unwrap_or_default().to_string();
        let source_id = hit.payload_str("source_id").unwrap_or_default().to_string();
        let kind = hit.payload_str("type").and_then(ChunkKind::parse);
        let peripheral = hit.payload_str("peripheral").unwrap_or_default().to_string();
        let register = hit.payload_str("register").unwrap_or_default().to_string();
        let address = hit.payload_str("address").map(String::from);
        Self {
            score: hit.score,
            source_id,
            kind,
            peripheral,
            register,
            address,
            text,
            debug: DebugTrace {
                fused_score: hit.score,
                post_boost_score: hit.score,
                ..DebugTrace::default()
            },
            metadata: hit.payload,
        }
    }

    /// Text handed to a cross-encoder, falling back to `"{peripheral} {register}"`.
    pub fn rerank_text(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        if let Some(text) = self.metadata.get("text").and_then(Value::as_str)
            && !text.is_empty()
        {
            return text.to_string();
        }
        format!("{} {}", self.peripheral, self.register)
    }

    /// JSON view with the debug trace under `metadata._debug`.
    pub fn to_json(&self) -> Value {
        let mut metadata = self.metadata.clone();
        metadata.insert(
            DEBUG_KEY.to_string(),
            serde_json::to_value(&self.debug).unwrap_or(Value::Null),
        );
        serde_json::json!({
            "score": self.score,
            "source_id": self.source_id,
            "type": self.kind.map(ChunkKind::as_str),
            "peripheral": self.peripheral,
            "register": self.register,
            "address": self.address,
            "text": self.text,
            "metadata": metadata,
        })
    }
}

/// Sort by descending score, then ascending source id.
pub fn sort_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
}

#[cfg(test)]
#[path = "types.test.rs"]
mod tests;
