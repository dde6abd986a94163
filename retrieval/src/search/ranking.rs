//! Domain boosts and penalties over fused store hits.
//!
//! Each rule fires at most once per hit:
//! - peripheral family named by the query: `peripheral_boost`
//! - register name named by the query: `register_boost`
//! - device summary while the query names a peripheral or register: `summary_downweight`
//! - peripheral prefix the query rules out: `peripheral_penalty`

use crate::config::RankingConfig;
use crate::query::QueryInfo;
use crate::types::AppliedBoosts;
use crate::types::ChunkKind;
use crate::types::SearchResult;
use crate::types::sort_results;

use super::constants::PERIPHERAL_FAMILIES;

/// Family of a peripheral name, or the upper-cased name when unknown.
pub fn peripheral_family(peripheral: &str) -> String {
    let upper = peripheral.to_uppercase();
    PERIPHERAL_FAMILIES
        .iter()
        .find(|family| upper.starts_with(*family))
        .map(|family| (*family).to_string())
        .unwrap_or(upper)
}

/// First penalty prefix that `peripheral` starts with.
pub fn matching_penalty<'a>(peripheral: &str, penalties: &'a [String]) -> Option<&'a str> {
    let upper = peripheral.to_uppercase();
    penalties
        .iter()
        .find(|prefix| upper.starts_with(prefix.as_str()))
        .map(String::as_str)
}

/// Apply the domain rules to every hit and re-sort.
pub fn apply_domain_boosts(
    mut results: Vec<SearchResult>,
    info: &QueryInfo,
    config: &RankingConfig,
) -> Vec<SearchResult> {
    let register_hints: Vec<String> = info
        .register_hints
        .iter()
        .map(|r| r.to_uppercase())
        .collect();

    for result in &mut results {
        let fused = result.score;
        let mut score = fused;
        let mut applied = AppliedBoosts::default();

        if !info.peripheral_hints.is_empty() {
            let family = peripheral_family(&result.peripheral);
            if info.peripheral_hints.contains(&family) {
                score *= config.peripheral_boost;
                applied.peripheral_match = true;
            }
        }

        if !result.register.is_empty() && register_hints.contains(&result.register.to_uppercase()) {
            score *= config.register_boost;
            applied.register_match = true;
        }

        if result.kind == Some(ChunkKind::DeviceSummary) && info.has_hints() {
            score *= config.summary_downweight;
            applied.summary_downweight = true;
        }

        if matching_penalty(&result.peripheral, &info.peripheral_penalties).is_some() {
            score *= config.peripheral_penalty;
            applied.peripheral_penalty = true;
        }

        result.score = score;
        result.debug.fused_score = fused;
        result.debug.post_boost_score = score;
        result.debug.applied_boosts = applied;
        result.debug.peripheral_penalties_active = info.peripheral_penalties.clone();
    }

    sort_results(&mut results);
    results
}

#[cfg(test)]
#[path = "ranking.test.rs"]
mod tests;
