use super::*;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart_dr(device: &str, peripheral: &str, base: u64) -> Register {
    Register::new(device, peripheral, "DR", base, 0x4)
        .with_group("USART")
        .with_fields(vec![Field::new("DR", 0, 9)])
}

#[test]
fn test_same_register_on_two_devices_merges() {
    let registers = vec![
        usart_dr("A", "PERIPH", 0x4001_1000),
        usart_dr("B", "PERIPH", 0x4002_1000),
    ];
    let (merged, report) = dedup_generalized(registers, 4);

    assert_eq!(merged.len(), 1);
    assert_eq!(report.max_group_size, 2);
    let agg = merged[0].aggregation().expect("aggregation");
    assert_eq!(agg.devices, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(agg.peripheral_instances, vec!["PERIPH".to_string()]);
    assert_eq!(
        agg.address_map.get("A/PERIPH").map(String::as_str),
        Some("0x40011004")
    );
    assert_eq!(
        agg.address_map.get("B/PERIPH").map(String::as_str),
        Some("0x40021004")
    );
    // one instance: peripheral keeps its name; two devices: label
    assert_eq!(merged[0].peripheral, "PERIPH");
    assert_eq!(merged[0].device, "A, B");
}

#[test]
fn test_instances_generalize_to_group() {
    let registers = vec![
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F407", "USART2", 0x4000_4400),
        usart_dr("STM32F407", "USART3", 0x4000_4800),
    ];
    let (merged, _) = dedup_generalized(registers, 4);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].peripheral, "USART");
    assert_eq!(merged[0].device, "STM32F407");
    assert_eq!(
        merged[0].scope().peripheral_instances,
        ["USART1".to_string(), "USART2".to_string(), "USART3".to_string()]
    );
}

#[test]
fn test_different_layout_is_not_merged() {
    let a = Register::new("STM32F407", "USART1", "CR1", 0x4001_1000, 0xC)
        .with_group("USART")
        .with_fields(vec![Field::new("UE", 13, 1)]);
    let b = Register::new("STM32F411", "USART1", "CR1", 0x4001_1000, 0xC)
        .with_group("USART")
        .with_fields(vec![Field::new("UE", 12, 1)]);
    let (merged, _) = dedup_generalized(vec![a, b], 4);
    assert_eq!(merged.len(), 2);
    assert!(merged.iter().all(|r| r.aggregation().is_none()));
}

#[test]
fn test_merged_members_share_signature() {
    let registers = vec![
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F411", "USART1", 0x4001_1000),
        Register::new("STM32F407", "SPI1", "DR", 0x4001_3000, 0xC)
            .with_group("SPI")
            .with_fields(vec![Field::new("DR", 0, 16)]),
    ];
    let keys: Vec<FamilyKey> = registers.iter().map(|r| family_key(r, 4)).collect();
    let (merged, _) = dedup_generalized(registers, 4);

    assert_eq!(merged.len(), 2);
    assert_eq!(keys[0], keys[1]);
    assert_ne!(keys[0], keys[2]);
    assert_eq!(keys[0].field_signature, "DR@0:9");
}

#[test]
fn test_ungrouped_prefix_collision_is_preserved() {
    let tim1 = Register::new("STM32F407", "TIM1", "PSC", 0x4001_0000, 0x28)
        .with_fields(vec![Field::new("PSC", 0, 16)]);
    let tim10 = Register::new("STM32F407", "TIM10", "PSC", 0x4001_4400, 0x28)
        .with_fields(vec![Field::new("PSC", 0, 16)]);

    let (merged, _) = dedup_generalized(vec![tim1.clone(), tim10.clone()], 4);
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].peripheral, "TIM1");

    let (separate, _) = dedup_generalized(vec![tim1, tim10], 5);
    assert_eq!(separate.len(), 2);
}

#[test]
fn test_output_follows_first_appearance() {
    let spi = Register::new("STM32F407", "SPI1", "CR1", 0x4001_3000, 0x0)
        .with_group("SPI")
        .with_fields(vec![Field::new("SPE", 6, 1)]);
    let registers = vec![
        spi.clone(),
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F411", "USART1", 0x4001_1000),
    ];
    let (merged, _) = dedup_generalized(registers, 4);
    assert_eq!(merged[0], spi);
    assert_eq!(merged[1].register, "DR");
}

#[test]
fn test_field_signature_ignores_declaration_order_of_same_name_fields() {
    let a = Register::new("STM32F407", "TIM2", "CCMR1", 0x4000_0000, 0x18)
        .with_group("TIM")
        .with_fields(vec![Field::new("OCM", 4, 3), Field::new("OCM", 12, 3)]);
    let b = Register::new("STM32F411", "TIM2", "CCMR1", 0x4000_0000, 0x18)
        .with_group("TIM")
        .with_fields(vec![Field::new("OCM", 12, 3), Field::new("OCM", 4, 3)]);

    assert_eq!(family_key(&a, 4), family_key(&b, 4));
    let (merged, _) = dedup_generalized(vec![a, b], 4);
    assert_eq!(merged.len(), 1);
}

#[test]
fn test_series_recorded_per_member_device() {
    let registers = vec![
        usart_dr("STM32F103", "USART1", 0x4001_3800).with_series("STM32F1"),
        usart_dr("STM32F407", "USART1", 0x4001_1000).with_series("STM32F4"),
        usart_dr("STM32F411", "USART1", 0x4001_1000),
    ];
    let (merged, _) = dedup_generalized(registers, 4);

    assert_eq!(merged.len(), 1);
    let rep = &merged[0];
    assert_eq!(rep.series_of("STM32F103"), Some("STM32F1"));
    assert_eq!(rep.series_of("STM32F407"), Some("STM32F4"));
    assert_eq!(rep.series_of("STM32F411"), None);
}
