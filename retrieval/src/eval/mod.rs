//! Golden-question evaluation.
//!
//! Each [`EvalCase`] names the peripheral and acceptable register names a
//! developer question should resolve to. A case passes when the top search
//! result matches.

use std::collections::BTreeMap;
use std::path::Path;

use itertools::Itertools;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::RetrievalErr;
use crate::search::HybridRetriever;
use crate::search::SearchParams;
use crate::types::SearchResult;

/// Results fetched per question.
pub const EVAL_TOP_K: usize = 5;
/// Pass rate (percent) the suite is expected to reach.
pub const PASS_THRESHOLD_PCT: f64 = 70.0;

const DEFAULT_CASES: &str = include_str!("default_cases.toml");

/// One golden question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalCase {
    pub query: String,
    /// Substring expected in the result peripheral.
    pub peripheral: String,
    /// Acceptable register name variants; any substring match passes.
    pub registers: Vec<String>,
    pub category: String,
    /// Peripherals that must not appear in the result peripheral.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_peripherals: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CaseFile {
    cases: Vec<EvalCase>,
}

fn parse_cases(content: &str, path: &Path) -> Result<Vec<EvalCase>> {
    toml::from_str::<CaseFile>(content)
        .map(|f| f.cases)
        .map_err(|e| RetrievalErr::InputParseError {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })
}

/// The built-in question suite.
pub fn default_cases() -> Result<Vec<EvalCase>> {
    parse_cases(DEFAULT_CASES, Path::new("default_cases.toml"))
}

/// Load cases from a TOML file of `[[cases]]` tables.
pub fn load_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let content = std::fs::read_to_string(path)?;
    parse_cases(&content, path)
}

/// Whether `result` answers `case`.
///
/// Case-insensitive: the expected peripheral must be a substring of the
/// result peripheral, no excluded peripheral may be, and at least one
/// register variant must be a substring of the result register.
pub fn check_result(result: &SearchResult, case: &EvalCase) -> bool {
    let peripheral = result.peripheral.to_uppercase();
    let register = result.register.to_uppercase();

    if !peripheral.contains(&case.peripheral.to_uppercase()) {
        return false;
    }
    if case
        .exclude_peripherals
        .iter()
        .any(|excluded| peripheral.contains(&excluded.to_uppercase()))
    {
        return false;
    }
    case.registers
        .iter()
        .any(|variant| register.contains(&variant.to_uppercase()))
}

/// Pass/fail counts of one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub passed: usize,
    pub failed: usize,
}

impl CategoryStats {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn pass_rate(&self) -> f64 {
        percent(self.passed, self.total())
    }
}

/// A ranked result as shown in failure listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedHit {
    pub peripheral: String,
    pub register: String,
    pub score: f32,
    pub matches: bool,
}

/// A case whose top result was wrong.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalFailure {
    pub case: EvalCase,
    /// `peripheral/register` of the top result, or the reason nothing was returned.
    pub got: String,
    pub top_results: Vec<RankedHit>,
}

/// Outcome of a suite run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvalReport {
    pub passed: usize,
    pub failed: usize,
    pub by_category: BTreeMap<String, CategoryStats>,
    pub failures: Vec<EvalFailure>,
    pub reranked: bool,
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / total as f64
}

impl EvalReport {
    pub fn total(&self) -> usize {
        self.passed + self.failed
    }

    pub fn pass_rate(&self) -> f64 {
        percent(self.passed, self.total())
    }

    pub fn meets_threshold(&self) -> bool {
        self.pass_rate() >= PASS_THRESHOLD_PCT
    }

    fn record(&mut self, case: &EvalCase, failure: Option<EvalFailure>) {
        let stats = self.by_category.entry(case.category.clone()).or_default();
        match failure {
            None => {
                stats.passed += 1;
                self.passed += 1;
            }
            Some(failure) => {
                stats.failed += 1;
                self.failed += 1;
                self.failures.push(failure);
            }
        }
    }

    /// Plain-text summary: failures, per-category rates, overall rate.
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for failure in &self.failures {
            out.push_str(&format!(
                "FAIL  {}\n      expected {}/{}, got {}\n",
                failure.case.query,
                failure.case.peripheral,
                failure.case.registers.join("/"),
                failure.got
            ));
            for (rank, hit) in failure.top_results.iter().enumerate() {
                out.push_str(&format!(
                    "      {}. {}/{} ({:.6}){}\n",
                    rank + 1,
                    hit.peripheral,
                    hit.register,
                    hit.score,
                    if hit.matches { " *" } else { "" }
                ));
            }
        }

        out.push_str("\nBy category:\n");
        for (category, stats) in &self.by_category {
            out.push_str(&format!(
                "  {category}: {}/{} ({:.1}%)\n",
                stats.passed,
                stats.total(),
                stats.pass_rate()
            ));
        }

        let weakest = self
            .by_category
            .iter()
            .filter(|(_, s)| s.failed > 0)
            .sorted_by(|a, b| {
                a.1.pass_rate()
                    .partial_cmp(&b.1.pass_rate())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .take(5)
            .map(|(category, _)| category.as_str())
            .join(", ");
        if !weakest.is_empty() {
            out.push_str(&format!("\nNeeds improvement: {weakest}\n"));
        }

        out.push_str(&format!(
            "\nTotal: {}  Passed: {}  Failed: {}  Success rate: {:.1}%{}\n",
            self.total(),
            self.passed,
            self.failed,
            self.pass_rate(),
            if self.reranked { " (reranked)" } else { "" }
        ));
        out
    }
}

/// Run every case through `retriever`, judging the top result.
///
/// Search errors fail the case and the run continues.
pub async fn run_suite(retriever: &HybridRetriever, cases: &[EvalCase]) -> EvalReport {
    let params = SearchParams::default().with_top_k(EVAL_TOP_K);
    let mut report = EvalReport {
        reranked: retriever.has_reranker(),
        ..EvalReport::default()
    };

    for case in cases {
        let failure = match retriever.search(&case.query, &params).await {
            Err(e) => {
                tracing::warn!(query = %case.query, error = %e, "Eval search failed");
                Some(EvalFailure {
                    case: case.clone(),
                    got: format!("error: {e}"),
                    top_results: Vec::new(),
                })
            }
            Ok(results) => match results.first() {
                None => Some(EvalFailure {
                    case: case.clone(),
                    got: "no results".to_string(),
                    top_results: Vec::new(),
                }),
                Some(top) if check_result(top, case) => None,
                Some(top) => Some(EvalFailure {
                    case: case.clone(),
                    got: format!("{}/{}", top.peripheral, top.register),
                    top_results: results
                        .iter()
                        .take(EVAL_TOP_K)
                        .map(|r| RankedHit {
                            peripheral: r.peripheral.clone(),
                            register: r.register.clone(),
                            score: r.score,
                            matches: check_result(r, case),
                        })
                        .collect(),
                }),
            },
        };
        tracing::debug!(
            query = %case.query,
            category = %case.category,
            passed = failure.is_none(),
            "Eval case"
        );
        report.record(case, failure);
    }

    tracing::info!(
        total = report.total(),
        passed = report.passed,
        failed = report.failed,
        pass_rate = report.pass_rate(),
        "Eval suite complete"
    );
    report
}

#[cfg(test)]
#[path = "mod.test.rs"]
mod tests;
