use super::*;
use pretty_assertions::assert_eq;

fn reg(device: &str, series: Option<&str>) -> Register {
    let r = Register::new(device, "USART1", "DR", 0x4001_1000, 0x4);
    match series {
        Some(s) => r.with_series(s),
        None => r,
    }
}

fn label(registers: &[Register]) -> String {
    let refs: Vec<&Register> = registers.iter().collect();
    device_family_label(&refs)
}

#[test]
fn test_single_series_tag_wins() {
    let group = vec![reg("STM32F407", Some("STM32F4")), reg("STM32F411", None)];
    assert_eq!(label(&group), "STM32F4");
}

#[test]
fn test_conflicting_series_tags() {
    let group = vec![
        reg("STM32F407", Some("STM32F4")),
        reg("STM32L476", Some("STM32L4")),
    ];
    assert_eq!(label(&group), "Multiple families (2)");
}

#[test]
fn test_stm32_pattern() {
    assert_eq!(
        family_from_names(&["STM32F407", "STM32F411"]),
        Some("STM32F4xx".to_string())
    );
    assert_eq!(
        family_from_names(&["STM32F407", "STM32L476"]),
        Some("STM32 (multiple families)".to_string())
    );
}

#[test]
fn test_nordic_and_kinetis_patterns() {
    assert_eq!(
        family_from_names(&["nRF52832", "nRF52840"]),
        Some("nRF52xxx".to_string())
    );
    assert_eq!(
        family_from_names(&["nRF51822", "nRF52840"]),
        Some("nRF (multiple series)".to_string())
    );
    assert_eq!(
        family_from_names(&["MK64FN1M0", "MK64FX512"]),
        Some("MK64xxx".to_string())
    );
    assert_eq!(
        family_from_names(&["MK22F51212", "MK64FN1M0"]),
        Some("Kinetis (multiple series)".to_string())
    );
}

#[test]
fn test_mixed_vendors_have_no_pattern() {
    assert_eq!(family_from_names(&["STM32F407", "nRF52840"]), None);
    assert_eq!(family_from_names(&[]), None);
}

#[test]
fn test_fallback_listing() {
    let three = vec![reg("ATSAMD21", None), reg("LPC1768", None), reg("EFM32GG", None)];
    assert_eq!(label(&three), "ATSAMD21, EFM32GG, LPC1768");

    let four = vec![
        reg("ATSAMD21", None),
        reg("LPC1768", None),
        reg("EFM32GG", None),
        reg("XMC4500", None),
    ];
    assert_eq!(label(&four), "Multiple devices (4)");
}
