//! Hybrid retrieval and ranking.
//!
//! The store fuses dense and lexical candidates; this module applies the
//! domain rules on top, optionally reranks, and orders deterministically.

pub mod constants;
pub mod fusion;
mod hybrid;
mod ranking;

pub use hybrid::HybridRetriever;
pub use hybrid::SearchParams;
pub use hybrid::build_filter;
pub use ranking::apply_domain_boosts;
pub use ranking::matching_penalty;
pub use ranking::peripheral_family;
