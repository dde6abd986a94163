use serde_json::json;

use super::*;
use crate::query::QueryPreprocessor;
use crate::types::StoreHit;
use pretty_assertions::assert_eq;

fn hit(id: &str, peripheral: &str, register: &str, kind: &str, score: f32) -> SearchResult {
    let payload = json!({
        "source_id": id,
        "type": kind,
        "peripheral": peripheral,
        "register": register,
        "text": format!("{peripheral} {register}"),
    });
    let payload = payload.as_object().cloned().expect("object payload");
    SearchResult::from_hit(StoreHit::new(score, payload))
}

fn query(text: &str) -> QueryInfo {
    QueryPreprocessor::new().process(text)
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn test_family_resolution() {
    assert_eq!(peripheral_family("USART1"), "USART");
    assert_eq!(peripheral_family("uart4"), "UART");
    assert_eq!(peripheral_family("GPIOA"), "GPIO");
    assert_eq!(peripheral_family("DMA2"), "DMA");
    assert_eq!(peripheral_family("OTG_FS_GLOBAL"), "OTG");
    assert_eq!(peripheral_family("flash"), "FLASH");
}

#[test]
fn test_gpio_query_boosts_gpioa() {
    let info = query("How do I enable the gpio pull-up resistor?");
    let results = apply_domain_boosts(
        vec![hit("a", "GPIOA", "PUPDR", "peripheral_summary", 1.0)],
        &info,
        &RankingConfig::default(),
    );
    assert!(approx(results[0].score, 1.5));
    assert!(results[0].debug.applied_boosts.peripheral_match);
    assert!(approx(results[0].debug.fused_score, 1.0));
    assert!(approx(results[0].debug.post_boost_score, 1.5));
}

#[test]
fn test_dma_query_demotes_otg() {
    let info =
        query("Which DMA register on STM32F411 stores the number of data items to transfer?");
    let results = apply_domain_boosts(
        vec![
            hit("otg", "OTG_FS_GLOBAL", "DIEPDMA0", "peripheral_detail", 1.0),
            hit("dma", "DMA2", "S0NDTR", "peripheral_detail", 0.5),
        ],
        &info,
        &RankingConfig::default(),
    );

    let otg = results.iter().find(|r| r.source_id == "otg").expect("otg hit");
    assert!(approx(otg.score, 0.5));
    assert!(otg.debug.applied_boosts.peripheral_penalty);
    assert_eq!(
        otg.debug.peripheral_penalties_active,
        vec!["OTG", "OTG_FS", "OTG_HS", "USB"]
    );

    let dma = results.iter().find(|r| r.source_id == "dma").expect("dma hit");
    assert!(approx(dma.score, 0.75));
    assert!(dma.debug.applied_boosts.peripheral_match);
    assert!(!dma.debug.applied_boosts.peripheral_penalty);
    assert_eq!(results[0].source_id, "dma");
}

#[test]
fn test_register_match_case_insensitive() {
    let info = query("what does CR1 control");
    let results = apply_domain_boosts(
        vec![hit("a", "SPI1", "cr1", "register", 1.0)],
        &info,
        &RankingConfig::default(),
    );
    assert!(approx(results[0].score, 1.4));
    assert!(results[0].debug.applied_boosts.register_match);
}

#[test]
fn test_device_summary_downweighted_only_with_hints() {
    let summary = || hit("dev", "PWR RCC", "", "device_summary", 1.0);

    let with_hints = apply_domain_boosts(
        vec![summary()],
        &query("gpio speed"),
        &RankingConfig::default(),
    );
    assert!(approx(with_hints[0].score, 0.7));
    assert!(with_hints[0].debug.applied_boosts.summary_downweight);

    let without = apply_domain_boosts(
        vec![summary()],
        &query("which peripherals exist"),
        &RankingConfig::default(),
    );
    assert!(approx(without[0].score, 1.0));
    assert_eq!(without[0].debug.applied_boosts, AppliedBoosts::default());
}

#[test]
fn test_penalty_applies_once() {
    let info = query("dma stream config");
    let results = apply_domain_boosts(
        vec![hit("a", "OTG_FS_DEVICE", "DCFG", "peripheral_detail", 1.0)],
        &info,
        &RankingConfig::default(),
    );
    assert!(approx(results[0].score, 0.5));
}

#[test]
fn test_matching_hint_never_lowers_score() {
    let config = RankingConfig::default();
    for fused in [0.01_f32, 0.3, 1.0] {
        let plain = apply_domain_boosts(
            vec![hit("a", "SPI1", "CR1", "register", fused)],
            &query("clock phase"),
            &config,
        );
        let hinted = apply_domain_boosts(
            vec![hit("a", "SPI1", "CR1", "register", fused)],
            &query("spi CR1 clock phase"),
            &config,
        );
        assert!(hinted[0].score >= plain[0].score);
    }
}

#[test]
fn test_ties_broken_by_source_id() {
    let info = query("nothing relevant");
    let results = apply_domain_boosts(
        vec![
            hit("c", "RCC", "CR", "register", 0.5),
            hit("a", "RCC", "CFGR", "register", 0.5),
            hit("b", "PWR", "CR", "register", 0.9),
        ],
        &info,
        &RankingConfig::default(),
    );
    let order: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
}

#[test]
fn test_custom_multipliers() {
    let config = RankingConfig {
        peripheral_boost: 2.0,
        ..RankingConfig::default()
    };
    let results = apply_domain_boosts(
        vec![hit("a", "USART2", "BRR", "register", 1.0)],
        &query("usart baud"),
        &config,
    );
    assert!(approx(results[0].score, 2.0));
}
