use std::collections::BTreeMap;

use super::*;
use crate::model::Aggregation;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart_cr1() -> Register {
    Register::new("STM32F407", "USART1", "CR1", 0x4001_1000, 0xC)
        .with_description("Control register 1")
        .with_access("read-write")
        .with_reset_value("0x00000000")
        .with_fields(vec![
            Field::new("UE", 13, 1).with_description("USART enable"),
            Field::new("M", 12, 1),
        ])
}

fn wide_register(i: u32) -> Register {
    let fields = (0..4)
        .map(|bit| Field::new(format!("FIELD_{bit}"), bit, 1).with_description("field description"))
        .collect();
    Register::new("STM32F407", "USART1", format!("REG_{i}"), 0x4001_1000, u64::from(i) * 4)
        .with_fields(fields)
}

#[test]
fn test_single_register_layout() {
    let cr1 = usart_cr1();
    let chunks = build_detail_chunks("STM32F407/USART1", &[&cr1], &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0].text,
        "Peripheral: USART1 (Detail 1 of 1)\n\
         Device: STM32F407\n\
         Registers: CR1\n\
         \n\
         CR1\n  \
         Control register 1\n  \
         Address: 0x4001100C\n  \
         Access: read-write\n  \
         Reset: 0x00000000\n  \
         Fields: UE[13:13] - USART enable, M[12:12]"
    );
    assert!(chunks[0].id.starts_with("USART1_detail_1_"));
}

#[test]
fn test_packs_into_budgeted_parts() {
    let regs: Vec<Register> = (0..10).map(wide_register).collect();
    let refs: Vec<&Register> = regs.iter().collect();
    let config = ChunkingConfig {
        detail_max_chars: 400,
        ..ChunkingConfig::default()
    };
    let chunks = build_detail_chunks("STM32F407/USART1", &refs, &config);

    assert!(chunks.len() > 1);
    let total = chunks.len();
    for (idx, chunk) in chunks.iter().enumerate() {
        assert!(chunk.text.chars().count() <= 400, "part {idx} over budget");
        assert!(
            chunk
                .text
                .starts_with(&format!("Peripheral: USART1 (Detail {} of {total})", idx + 1))
        );
        assert_eq!(chunk.metadata.chunk_part, Some(idx + 1));
        assert_eq!(chunk.metadata.chunk_total, Some(total));
        assert_eq!(chunk.text.ends_with(TRUNCATED_MARKER), idx + 1 < total);
        assert!(!chunk.text.ends_with("..."));
    }

    let packed: Vec<String> = chunks
        .iter()
        .flat_map(|c| c.metadata.registers.clone())
        .collect();
    let expected: Vec<String> = regs.iter().map(|r| r.register.clone()).collect();
    assert_eq!(packed, expected);

    let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[test]
fn test_oversized_register_truncated_alone() {
    let fields = (0..32)
        .map(|bit| Field::new(format!("FIELD_{bit}"), bit, 1).with_description("field description"))
        .collect();
    let big = usart_cr1().with_fields(fields);
    let small = wide_register(1);
    let config = ChunkingConfig {
        detail_max_chars: 300,
        ..ChunkingConfig::default()
    };
    let chunks = build_detail_chunks("k", &[&big, &small], &config);

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].metadata.registers, vec!["CR1"]);
    assert_eq!(chunks[0].text.chars().count(), 300);
    assert!(chunks[0].text.ends_with(TRUNCATED_MARKER));
    let body = chunks[0].text.trim_end_matches(TRUNCATED_MARKER);
    assert!(body.ends_with("..."));
    assert_eq!(chunks[1].metadata.registers, vec!["REG_1"]);
    assert!(!chunks[1].text.ends_with(TRUNCATED_MARKER));
}

#[test]
fn test_parts_list_addresses_of_their_own_registers() {
    let regs: Vec<Register> = (0..10).map(wide_register).collect();
    let refs: Vec<&Register> = regs.iter().collect();
    let config = ChunkingConfig {
        detail_max_chars: 400,
        ..ChunkingConfig::default()
    };
    let chunks = build_detail_chunks("STM32F407/USART1", &refs, &config);
    assert!(chunks.len() > 1);

    for chunk in &chunks {
        let expected: Vec<String> = regs
            .iter()
            .filter(|r| chunk.metadata.registers.contains(&r.register))
            .map(|r| r.full_address.clone())
            .collect();
        assert_eq!(chunk.metadata.addresses, expected);
        assert!(chunk.metadata.address.is_none());
    }
    let covered: Vec<String> = chunks
        .iter()
        .flat_map(|c| c.metadata.addresses.clone())
        .collect();
    let all: Vec<String> = regs.iter().map(|r| r.full_address.clone()).collect();
    assert_eq!(covered, all);
}

#[test]
fn test_scope_is_union_across_group() {
    let mut generalized = usart_cr1();
    generalized.aggregation = Some(Aggregation {
        devices: vec!["STM32F405".to_string(), "STM32F407".to_string()],
        peripheral_instances: vec!["USART1".to_string(), "USART2".to_string()],
        address_map: BTreeMap::from([
            ("STM32F405/USART1".to_string(), "0x4001100C".to_string()),
            ("STM32F407/USART2".to_string(), "0x4000440C".to_string()),
        ]),
        device_series: Default::default(),
    });
    let other = Register::new("STM32F411", "USART6", "DR", 0x4001_1400, 0x4);
    let chunks = build_detail_chunks("USART", &[&generalized, &other], &ChunkingConfig::default());

    for chunk in &chunks {
        assert_eq!(
            chunk.metadata.devices,
            vec!["STM32F405", "STM32F407", "STM32F411"]
        );
        assert_eq!(
            chunk.metadata.peripheral_instances,
            vec!["USART1", "USART2", "USART6"]
        );
    }
}

#[test]
fn test_empty_group() {
    assert!(build_detail_chunks("k", &[], &ChunkingConfig::default()).is_empty());
}
