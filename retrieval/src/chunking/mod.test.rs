use super::*;
use crate::model::Field;
use pretty_assertions::assert_eq;

#[test]
fn test_truncate_short_text_unchanged() {
    assert_eq!(truncate_with_ellipsis("short", 10), "short");
    assert_eq!(truncate_with_ellipsis("exactly10!", 10), "exactly10!");
}

#[test]
fn test_truncate_counts_characters() {
    let text = "→".repeat(20);
    let cut = truncate_with_ellipsis(&text, 10);
    assert_eq!(cut.chars().count(), 10);
    assert_eq!(cut, format!("{}...", "→".repeat(7)));
}

#[test]
fn test_take_chars_on_boundaries() {
    assert_eq!(take_chars("héllo", 2), "hé");
    assert_eq!(take_chars("abc", 10), "abc");
}

#[test]
fn test_field_names_sorted_union() {
    let a = Register::new("D", "P", "A", 0, 0)
        .with_fields(vec![Field::new("TXE", 7, 1), Field::new("RXNE", 5, 1)]);
    let b = Register::new("D", "P", "B", 0, 4).with_fields(vec![Field::new("TXE", 7, 1)]);
    assert_eq!(joined_field_names([&a, &b]), "RXNE, TXE");
}

#[test]
fn test_truncate_budget_smaller_than_ellipsis() {
    assert_eq!(truncate_with_ellipsis("abcdef", 0), "");
    assert_eq!(truncate_with_ellipsis("abcdef", 1), "a");
    assert_eq!(truncate_with_ellipsis("abcdef", 2), "ab");
    assert_eq!(truncate_with_ellipsis("abcdef", 3), "...");
}

#[test]
fn test_union_addresses_covers_generalized_members() {
    let sr = Register::new("STM32F407", "USART1", "SR", 0x4001_1000, 0x0);
    let dr = Register::new("STM32F407", "USART1", "DR", 0x4001_1000, 0x4);
    let mut merged = Register::new("STM32F103", "USART2", "CR1", 0x4000_4400, 0xC);
    merged.aggregation = Some(crate::model::Aggregation {
        devices: vec!["STM32F103".to_string(), "STM32F407".to_string()],
        peripheral_instances: vec!["USART2".to_string()],
        address_map: [
            ("STM32F103/USART2".to_string(), "0x4000440C".to_string()),
            ("STM32F407/USART2".to_string(), "0x4000440C".to_string()),
        ]
        .into_iter()
        .collect(),
        device_series: Default::default(),
    });

    assert_eq!(
        union_addresses([&dr, &sr, &merged]),
        vec!["0x4000440C", "0x40011000", "0x40011004"]
    );
}
