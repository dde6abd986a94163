//! Indexing: dedup → chunk → batch embed → upsert.

mod pipeline;

pub use pipeline::FailureStage;
pub use pipeline::IndexFailure;
pub use pipeline::IndexPipeline;
pub use pipeline::IndexReport;
pub use pipeline::PreparedChunks;
pub use pipeline::prepare_chunks;
