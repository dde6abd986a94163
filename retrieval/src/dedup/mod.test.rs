use super::*;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart_dr(device: &str) -> Register {
    Register::new(device, "USART1", "DR", 0x4001_1000, 0x4)
        .with_group("USART")
        .with_fields(vec![Field::new("DR", 0, 9)])
}

fn sample() -> Vec<Register> {
    vec![
        usart_dr("STM32F407"),
        usart_dr("STM32F407"),
        usart_dr("STM32F411"),
    ]
}

#[test]
fn test_mode_none_passes_through() {
    let config = DedupConfig {
        mode: DedupMode::None,
        ..DedupConfig::default()
    };
    let (registers, reports) = deduplicate(sample(), &config);
    assert_eq!(registers.len(), 3);
    assert!(reports.is_empty());
}

#[test]
fn test_mode_exact() {
    let config = DedupConfig {
        mode: DedupMode::Exact,
        ..DedupConfig::default()
    };
    let (registers, reports) = deduplicate(sample(), &config);
    assert_eq!(registers.len(), 2);
    assert_eq!(reports.len(), 1);
}

#[test]
fn test_mode_exact_then_generalized() {
    let (registers, reports) = deduplicate(sample(), &DedupConfig::default());
    assert_eq!(registers.len(), 1);
    assert_eq!(registers[0].device, "STM32F4xx");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].after, 2);
    assert_eq!(reports[1].after, 1);
    // exact pass removed the duplicate before merging
    assert_eq!(reports[1].max_group_size, 2);
}

#[test]
fn test_report_reduction() {
    let report = DedupReport {
        before: 200,
        after: 50,
        max_group_size: 10,
    };
    assert_eq!(report.removed(), 150);
    assert!((report.reduction_pct() - 75.0).abs() < f64::EPSILON);
    assert_eq!(DedupReport::default().reduction_pct(), 0.0);
}
