use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn make_result(source_id: &str, score: f32) -> SearchResult {
    let payload = json!({
        "source_id": source_id,
        "type": "register",
        "peripheral": "USART1",
        "register": "DR",
        "address": "0x40011004",
        "text": "Register: DR",
    });
    let Value::Object(map) = payload else {
        unreachable!()
    };
    SearchResult::from_hit(StoreHit::new(score, map))
}

#[test]
fn test_chunk_kind_roundtrip() {
    for kind in [
        ChunkKind::Register,
        ChunkKind::PeripheralSummary,
        ChunkKind::PeripheralDetail,
        ChunkKind::DeviceSummary,
    ] {
        assert_eq!(ChunkKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(ChunkKind::parse("unknown"), None);
    assert!(ChunkKind::DeviceSummary.is_device_summary());
    assert!(!ChunkKind::Register.is_peripheral_detail());
}

#[test]
fn test_payload_contains_schema_fields() {
    let mut metadata = ChunkMetadata::new(ChunkKind::Register, "STM32F407", "USART1");
    metadata.register = Some("DR".to_string());
    metadata.register_lower = Some("dr".to_string());
    metadata.address = Some("0x40011004".to_string());
    let chunk = Chunk {
        id: "STM32F407/USART1/DR".to_string(),
        text: "Register: DR".to_string(),
        metadata,
    };

    let payload = chunk.to_payload();
    assert_eq!(payload["type"], json!("register"));
    assert_eq!(payload["peripheral_lower"], json!("usart1"));
    assert_eq!(payload["source_id"], json!("STM32F407/USART1/DR"));
    assert_eq!(payload["text"], json!("Register: DR"));
    assert_eq!(payload["address"], json!("0x40011004"));
    assert!(!payload.contains_key("chunk_part"));
}

#[test]
fn test_from_hit_reads_payload() {
    let result = make_result("a", 0.25);
    assert_eq!(result.kind, Some(ChunkKind::Register));
    assert_eq!(result.peripheral, "USART1");
    assert_eq!(result.register, "DR");
    assert_eq!(result.debug.fused_score, 0.25);
}

#[test]
fn test_rerank_text_fallback() {
    let mut result = make_result("a", 0.1);
    result.text.clear();
    result.metadata.remove("text");
    assert_eq!(result.rerank_text(), "USART1 DR");
}

#[test]
fn test_sort_tie_breaks_on_source_id() {
    let mut results = vec![
        make_result("c", 0.5),
        make_result("b", 0.9),
        make_result("a", 0.5),
    ];
    sort_results(&mut results);
    let ids: Vec<&str> = results.iter().map(|r| r.source_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
}

#[test]
fn test_to_json_exposes_debug_trace() {
    let mut result = make_result("a", 0.5);
    result.debug.rerank = Some(RerankTrace {
        rerank_score: 0.9,
        rerank_score_raw: 2.2,
        hybrid_score: 0.5,
        combined: true,
    });
    let value = result.to_json();
    let debug = &value["metadata"][DEBUG_KEY];
    assert_eq!(debug["fused_score"], json!(0.5));
    assert_eq!(debug["combined"], json!(true));
    assert_eq!(debug["applied_boosts"]["peripheral_match"], json!(false));
    assert!(debug.get("post_rerank_penalty").is_none());
}

#[test]
fn test_short_hash_is_stable() {
    assert_eq!(short_hash("STM32F407/USART1", 8), short_hash("STM32F407/USART1", 8));
    assert_eq!(short_hash("x", 8).len(), 8);
    assert_ne!(short_hash("a", 8), short_hash("b", 8));
}
