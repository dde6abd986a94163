use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::*;
use crate::traits::StoredPoint;
use crate::traits::VectorStore;
use crate::types::StoreFilter;
use crate::types::StoreHit;
use pretty_assertions::assert_eq;

fn case(peripheral: &str, registers: &[&str], category: &str) -> EvalCase {
    EvalCase {
        query: format!("Which {peripheral} register?"),
        peripheral: peripheral.to_string(),
        registers: registers.iter().map(|r| r.to_string()).collect(),
        category: category.to_string(),
        exclude_peripherals: Vec::new(),
    }
}

fn hit(peripheral: &str, register: &str, score: f32) -> StoreHit {
    let payload = json!({
        "source_id": format!("{peripheral}_{register}"),
        "type": "peripheral_detail",
        "peripheral": peripheral,
        "register": register,
        "text": format!("{peripheral} {register}"),
    });
    StoreHit::new(score, payload.as_object().cloned().expect("object payload"))
}

fn result(peripheral: &str, register: &str) -> SearchResult {
    SearchResult::from_hit(hit(peripheral, register, 1.0))
}

/// Answers by the first word after "Which".
struct ScriptedStore;

#[async_trait]
impl VectorStore for ScriptedStore {
    fn name(&self) -> &str {
        "scripted"
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
        query: &str,
        limit: usize,
        _dense_k: usize,
        _sparse_k: usize,
        _filter: Option<&StoreFilter>,
    ) -> Result<Vec<StoreHit>> {
        let hits = match query.split_whitespace().nth(1) {
            Some("GPIO") => vec![hit("GPIOA", "IDR", 0.5), hit("GPIOB", "ODR", 0.4)],
            Some("DMA") => vec![hit("OTG_FS_GLOBAL", "DIEPDMA0", 0.9)],
            Some("PWR") => Vec::new(),
            _ => {
                return Err(RetrievalErr::InvalidInput(
                    "unknown question".to_string(),
                ));
            }
        };
        Ok(hits.into_iter().take(limit).collect())
    }

    async fn upsert(&self, _points: Vec<StoredPoint>) -> Result<()> {
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}

#[test]
fn test_default_cases_load() {
    let cases = default_cases().expect("built-in cases parse");
    assert_eq!(cases.len(), 44);
    assert_eq!(cases[0].category, "USART");

    let dma = cases
        .iter()
        .find(|c| c.query.contains("number of data items"))
        .expect("dma case");
    assert_eq!(dma.registers, vec!["CNDTR", "NDTR"]);
    assert_eq!(dma.exclude_peripherals, vec!["OTG", "USB"]);
}

#[test]
fn test_load_cases_from_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("cases.toml");
    std::fs::write(
        &path,
        r#"
[[cases]]
query = "Which CRC register holds the data?"
peripheral = "CRC"
registers = ["DR"]
category = "CRC"
"#,
    )
    .expect("write");

    let cases = load_cases(&path).expect("load");
    assert_eq!(cases, vec![EvalCase {
        query: "Which CRC register holds the data?".to_string(),
        ..case("CRC", &["DR"], "CRC")
    }]);

    std::fs::write(&path, "cases = 3").expect("write");
    let err = load_cases(&path).expect_err("bad file");
    assert!(matches!(err, RetrievalErr::InputParseError { .. }));
}

#[test]
fn test_check_result_is_case_insensitive_substring() {
    let usart = case("USART", &["DR", "TDR"], "USART");
    assert!(check_result(&result("usart1", "tdr"), &usart));
    assert!(check_result(&result("USART2", "USART_DR"), &usart));
    assert!(!check_result(&result("UART4", "DR"), &usart));
    assert!(!check_result(&result("USART1", "BRR"), &usart));
}

#[test]
fn test_check_result_honors_exclusions() {
    let mut timer = case("TIM", &["CNT"], "Timer");
    timer.exclude_peripherals = vec!["STK".to_string()];
    assert!(check_result(&result("TIM2", "CNT"), &timer));
    // "STK_TIM" would otherwise pass on the TIM substring
    assert!(!check_result(&result("STK_TIM", "CNT"), &timer));
}

#[tokio::test]
async fn test_run_suite_counts_per_category() {
    let retriever = HybridRetriever::new(Arc::new(ScriptedStore));
    let mut dma = case("DMA", &["NDTR"], "DMA");
    dma.exclude_peripherals = vec!["OTG".to_string()];
    let cases = vec![
        case("GPIO", &["IDR"], "GPIO"),
        case("GPIO", &["MODER"], "GPIO"),
        dma,
        case("PWR", &["CR1"], "PWR"),
        case("RTC", &["TR"], "RTC"),
    ];

    let report = run_suite(&retriever, &cases).await;

    assert_eq!(report.total(), 5);
    assert_eq!(report.passed, 1);
    assert_eq!(report.failed, 4);
    assert!(!report.reranked);
    assert!(!report.meets_threshold());
    assert_eq!(
        report.by_category.get("GPIO"),
        Some(&CategoryStats {
            passed: 1,
            failed: 1
        })
    );

    let got: Vec<&str> = report.failures.iter().map(|f| f.got.as_str()).collect();
    assert_eq!(got[0], "GPIOA/IDR");
    assert_eq!(got[1], "OTG_FS_GLOBAL/DIEPDMA0");
    assert_eq!(got[2], "no results");
    assert!(got[3].starts_with("error:"));

    let moder = &report.failures[0];
    assert_eq!(moder.top_results.len(), 2);
    assert!(moder.top_results.iter().all(|h| !h.matches));

    let text = report.render_text();
    assert!(text.contains("GPIO: 1/2 (50.0%)"));
    assert!(text.contains("Success rate: 20.0%"));
}
