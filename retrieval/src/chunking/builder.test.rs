use std::collections::HashSet;

use super::*;
use crate::model::Aggregation;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn reg(device: &str, peripheral: &str, register: &str) -> Register {
    Register::new(device, peripheral, register, 0x4001_1000, 0x4)
        .with_fields(vec![Field::new("EN", 0, 1)])
}

fn sample() -> Vec<Register> {
    vec![
        reg("STM32F407", "USART1", "SR"),
        reg("STM32F407", "USART1", "DR"),
        reg("STM32F407", "GPIOA", "MODER"),
        reg("STM32F411", "USART1", "SR"),
    ]
}

#[test]
fn test_groups_keep_first_appearance_order() {
    let regs = sample();
    let groups = group_by_peripheral(&regs);
    let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["STM32F407/USART1", "STM32F407/GPIOA", "STM32F411/USART1"]
    );
    let first: Vec<&str> = groups[0]
        .registers
        .iter()
        .map(|r| r.register.as_str())
        .collect();
    assert_eq!(first, vec!["SR", "DR"]);
}

#[test]
fn test_multi_device_records_grouped_by_peripheral() {
    let mut generalized = reg("STM32F4xx", "USART1", "CR1");
    generalized.aggregation = Some(Aggregation {
        devices: vec!["STM32F405".to_string(), "STM32F407".to_string()],
        peripheral_instances: vec!["USART1".to_string()],
        address_map: [("STM32F405/USART1".to_string(), "0x40011000".to_string())]
            .into_iter()
            .collect(),
        device_series: Default::default(),
    });
    let regs = vec![generalized];
    let groups = group_by_peripheral(&regs);
    assert_eq!(groups[0].key, "USART1");
}

#[test]
fn test_default_build_produces_summaries_details_and_devices() {
    let batch = ChunkBuilder::default().build(&sample());

    assert!(batch.failures.is_empty());
    assert_eq!(batch.count(ChunkKind::Register), 0);
    assert_eq!(batch.count(ChunkKind::PeripheralSummary), 3);
    assert_eq!(batch.count(ChunkKind::PeripheralDetail), 3);
    assert_eq!(batch.count(ChunkKind::DeviceSummary), 2);

    let ids: HashSet<&str> = batch.chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids.len(), batch.chunks.len());
}

#[test]
fn test_register_chunks_when_enabled() {
    let builder = ChunkBuilder::new(ChunkingConfig {
        register_chunks: true,
        peripheral_chunks: false,
        device_summaries: false,
        ..ChunkingConfig::default()
    });
    let batch = builder.build(&sample());
    assert_eq!(batch.chunks.len(), 4);
    assert!(batch.chunks.iter().all(|c| c.kind().is_register()));
}

#[test]
fn test_malformed_group_reported_and_skipped() {
    let mut regs = sample();
    regs.push(
        Register::new("STM32F407", "SPI1", "CR1", 0x4001_3000, 0)
            .with_fields(vec![Field::new("BROKEN", 3, 0)]),
    );
    let batch = ChunkBuilder::default().build(&regs);

    assert_eq!(
        batch.failures,
        vec![ChunkFailure {
            item: "STM32F407/SPI1".to_string(),
            reason: "field BROKEN of CR1 has zero width".to_string(),
        }]
    );
    assert!(
        batch
            .chunks
            .iter()
            .filter(|c| !c.kind().is_device_summary())
            .all(|c| c.metadata.peripheral != "SPI1")
    );
    assert_eq!(batch.count(ChunkKind::PeripheralSummary), 3);
}

#[test]
fn test_build_is_deterministic() {
    let builder = ChunkBuilder::default();
    let a = builder.build(&sample());
    let b = builder.build(&sample());
    assert_eq!(a.chunks, b.chunks);
}

#[test]
fn test_empty_input() {
    let batch = ChunkBuilder::default().build(&[]);
    assert!(batch.chunks.is_empty());
    assert!(batch.failures.is_empty());
}
