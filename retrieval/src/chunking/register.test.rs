use std::collections::BTreeMap;

use super::*;
use crate::model::Aggregation;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart_cr1() -> Register {
    Register::new("STM32F407", "USART1", "CR1", 0x4001_1000, 0xC)
        .with_group("USART")
        .with_description("Control register 1")
        .with_access("read-write")
        .with_reset_value("0x00000000")
        .with_fields(vec![
            Field::new("UE", 13, 1)
                .with_access("read-write")
                .with_description("USART enable"),
            Field::new("M", 12, 1),
        ])
}

#[test]
fn test_renders_fields_in_order() {
    let chunk = build_register_chunk(&usart_cr1(), &ChunkingConfig::default());
    assert_eq!(
        chunk.text,
        "Device: STM32F407\n\
         Peripheral: USART1\n\
         Register: CR1\n\
         Description: Control register 1\n\
         Address: 0x4001100C\n\
         Size: 32 bits\n\
         Access: read-write\n\
         Reset: 0x00000000\n\
         Fields:\n  \
         UE [13:13] (read-write) — USART enable\n  \
         M [12:12]"
    );
    assert_eq!(chunk.id, "STM32F407/USART1/CR1");
}

#[test]
fn test_metadata_lookup_fields() {
    let chunk = build_register_chunk(&usart_cr1(), &ChunkingConfig::default());
    let meta = &chunk.metadata;
    assert_eq!(meta.kind, ChunkKind::Register);
    assert_eq!(meta.register_lower.as_deref(), Some("cr1"));
    assert_eq!(meta.peripheral_lower, "usart1");
    assert_eq!(meta.peripheral_group, "USART");
    assert_eq!(meta.field_names, "M, UE");
    assert_eq!(meta.devices, vec!["STM32F407".to_string()]);
    assert!(meta.address_map.is_none());
}

#[test]
fn test_generalized_register_lists_example_addresses() {
    let mut reg = usart_cr1();
    reg.peripheral = "USART".to_string();
    let address_map: BTreeMap<String, String> = (1..=5)
        .map(|i| (format!("STM32F407/USART{i}"), format!("0x4000{i}00C")))
        .collect();
    reg.aggregation = Some(Aggregation {
        devices: vec!["STM32F407".to_string()],
        peripheral_instances: (1..=5).map(|i| format!("USART{i}")).collect(),
        address_map,
        device_series: Default::default(),
    });

    let chunk = build_register_chunk(&reg, &ChunkingConfig::default());
    assert!(chunk.text.contains(
        "Addresses: 0x4000100C (STM32F407/USART1), 0x4000200C (STM32F407/USART2), \
         0x4000300C (STM32F407/USART3) (+2 more)"
    ));
    assert_eq!(chunk.metadata.peripheral_instances.len(), 5);
    assert_eq!(chunk.metadata.address_map.as_ref().map(BTreeMap::len), Some(5));
    assert_eq!(chunk.metadata.addresses.len(), 5);
    assert_eq!(chunk.metadata.addresses[0], "0x4000100C");
}

#[test]
fn test_truncated_to_budget() {
    let fields = (0..32)
        .map(|i| Field::new(format!("FIELD_{i}"), i, 1).with_description("a long description"))
        .collect();
    let reg = usart_cr1().with_fields(fields);
    let config = ChunkingConfig {
        register_max_chars: 200,
        ..ChunkingConfig::default()
    };
    let chunk = build_register_chunk(&reg, &config);
    assert_eq!(chunk.text.chars().count(), 200);
    assert!(chunk.text.ends_with("..."));
}

#[test]
fn test_render_toggles() {
    let config = ChunkingConfig {
        include_device: false,
        include_field_desc: false,
        ..ChunkingConfig::default()
    };
    let chunk = build_register_chunk(&usart_cr1(), &config);
    assert!(!chunk.text.contains("Device:"));
    assert!(!chunk.text.contains("USART enable"));
    assert!(chunk.text.contains("UE [13:13]"));
}
