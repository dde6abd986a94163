use super::*;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart_dr(device: &str, peripheral: &str, base: u64) -> Register {
    Register::new(device, peripheral, "DR", base, 0x4)
        .with_group("USART")
        .with_fields(vec![Field::new("DR", 0, 9)])
}

#[test]
fn test_identical_records_collapse_to_first() {
    let first = usart_dr("STM32F407", "USART1", 0x4001_1000).with_description("first");
    let second = usart_dr("STM32F407", "USART1", 0x4001_1000).with_description("second");
    let (kept, report) = dedup_exact(vec![first, second]);

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].register_description.as_deref(), Some("first"));
    assert_eq!(report.before, 2);
    assert_eq!(report.after, 1);
    assert_eq!(report.max_group_size, 2);
}

#[test]
fn test_never_merges_across_devices_or_instances() {
    let registers = vec![
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F411", "USART1", 0x4001_1000),
        usart_dr("STM32F407", "USART2", 0x4000_4400),
    ];
    let (kept, _) = dedup_exact(registers.clone());
    assert_eq!(kept, registers);
}

#[test]
fn test_field_order_does_not_change_key() {
    let a = Register::new("D", "P", "CR1", 0, 0)
        .with_fields(vec![Field::new("UE", 13, 1), Field::new("TE", 3, 1)]);
    let b = Register::new("D", "P", "CR1", 0, 0)
        .with_fields(vec![Field::new("TE", 3, 1), Field::new("UE", 13, 1)]);
    assert_eq!(exact_key(&a), exact_key(&b));
}

#[test]
fn test_layout_change_changes_key() {
    let a = Register::new("D", "P", "CR1", 0, 0).with_fields(vec![Field::new("UE", 13, 1)]);
    let b = Register::new("D", "P", "CR1", 0, 0).with_fields(vec![Field::new("UE", 12, 1)]);
    assert_ne!(exact_key(&a), exact_key(&b));

    let c = a.clone().with_reset_value("0x00000000");
    assert_ne!(exact_key(&a), exact_key(&c));
}

#[test]
fn test_idempotent() {
    let registers = vec![
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F407", "USART1", 0x4001_1000),
        usart_dr("STM32F411", "USART1", 0x4001_1000),
    ];
    let (once, _) = dedup_exact(registers);
    let (twice, report) = dedup_exact(once.clone());
    assert_eq!(twice, once);
    assert_eq!(report.removed(), 0);
}
