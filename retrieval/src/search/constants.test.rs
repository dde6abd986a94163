use super::*;

#[test]
fn test_rrf_k_standard_value() {
    assert_eq!(DEFAULT_RRF_K, 60.0);
}

#[test]
fn test_longer_families_shadow_their_prefixes() {
    let pos = |f: &str| PERIPHERAL_FAMILIES.iter().position(|p| *p == f);
    assert!(pos("USART") < pos("UART"));
    assert!(PERIPHERAL_FAMILIES.contains(&"DMA"));
}
