//! Reciprocal Rank Fusion (RRF) for combining ranked lists.
//!
//! Score = Σ 1 / (rank + k) over every list an item appears in.

use std::collections::HashMap;

/// RRF contribution of an item at 1-based `rank`.
pub fn rrf_score(rank: usize, k: f32) -> f32 {
    1.0 / (rank as f32 + k)
}

/// Fuse ranked id lists into `(id, score)` pairs.
///
/// Sorted by descending score, ties broken by ascending id.
pub fn fuse_ranked(lists: &[Vec<String>], k: f32) -> Vec<(String, f32)> {
    let mut scores: HashMap<&str, f32> = HashMap::new();
    for list in lists {
        for (idx, id) in list.iter().enumerate() {
            *scores.entry(id.as_str()).or_insert(0.0) += rrf_score(idx + 1, k);
        }
    }

    let mut fused: Vec<(String, f32)> = scores
        .into_iter()
        .map(|(id, score)| (id.to_string(), score))
        .collect();
    fused.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    fused
}

#[cfg(test)]
#[path = "fusion.test.rs"]
mod tests;
