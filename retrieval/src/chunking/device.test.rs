use super::*;
use crate::model::Aggregation;
use pretty_assertions::assert_eq;

fn reg(device: &str, peripheral: &str) -> Register {
    Register::new(device, peripheral, "CR1", 0x4000_0000, 0)
}

#[test]
fn test_buckets_and_layout() {
    let regs = vec![
        reg("STM32F407", "TIM2").with_series("STM32F4"),
        reg("STM32F407", "GPIOA"),
        reg("STM32F407", "USART1"),
        reg("STM32F407", "UART4"),
        reg("STM32F407", "RCC"),
        reg("STM32F407", "TIM1"),
        reg("STM32F407", "OTG_FS_GLOBAL"),
    ];
    let chunks = build_device_summaries(&regs, &ChunkingConfig::default());
    assert_eq!(chunks.len(), 1);
    assert_eq!(
        chunks[0].text,
        "Device: STM32F407\n\
         Series: STM32F4\n\
         \n\
         Available Peripherals (7 total):\n\
         Timers (2): TIM1, TIM2\n\
         GPIO (1): GPIOA\n\
         UART/USART (2): UART4, USART1\n\
         \n\
         System/Other: OTG_FS_GLOBAL, RCC"
    );
    assert_eq!(chunks[0].id, "device_summary_STM32F407");

    let meta = &chunks[0].metadata;
    assert_eq!(meta.kind, ChunkKind::DeviceSummary);
    assert_eq!(meta.peripheral_count, Some(7));
    assert_eq!(meta.device_series.as_deref(), Some("STM32F4"));
    assert_eq!(
        meta.peripheral,
        "GPIOA OTG_FS_GLOBAL RCC TIM1 TIM2 UART4 USART1"
    );
}

#[test]
fn test_unknown_devices_skipped() {
    let regs = vec![reg("", "RCC"), reg(UNKNOWN_DEVICE, "RCC"), reg("nRF52840", "UARTE0")];
    let chunks = build_device_summaries(&regs, &ChunkingConfig::default());
    let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["device_summary_nRF52840"]);
}

#[test]
fn test_generalized_register_attributed_per_device() {
    let mut generalized = reg("STM32F4xx", "USART");
    generalized.aggregation = Some(Aggregation {
        devices: vec!["STM32F405".to_string(), "STM32F407".to_string()],
        peripheral_instances: vec!["USART1".to_string(), "USART2".to_string()],
        address_map: [
            ("STM32F405/USART1", "0x40011000"),
            ("STM32F407/USART2", "0x40004400"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect(),
        device_series: Default::default(),
    });
    let chunks = build_device_summaries(&[generalized], &ChunkingConfig::default());

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].metadata.device, "STM32F405");
    assert_eq!(chunks[0].metadata.peripherals, vec!["USART1"]);
    assert_eq!(chunks[1].metadata.device, "STM32F407");
    assert_eq!(chunks[1].metadata.peripherals, vec!["USART2"]);
}

#[test]
fn test_bounded_by_budget() {
    let regs: Vec<Register> = (0..200).map(|i| reg("STM32H743", &format!("PERIPH{i}"))).collect();
    let config = ChunkingConfig {
        device_summary_max_chars: 300,
        ..ChunkingConfig::default()
    };
    let chunks = build_device_summaries(&regs, &config);
    assert_eq!(chunks[0].text.chars().count(), 300);
    assert_eq!(chunks[0].metadata.peripheral_count, Some(200));
}

#[test]
fn test_merged_devices_keep_their_own_series() {
    let registers = vec![
        reg("STM32F103", "USART1").with_series("STM32F1"),
        reg("STM32F407", "USART1").with_series("STM32F4"),
    ];
    let (merged, _) = crate::dedup::dedup_generalized(registers, 4);
    assert_eq!(merged.len(), 1);

    let chunks = build_device_summaries(&merged, &ChunkingConfig::default());
    let series: Vec<(&str, Option<&str>)> = chunks
        .iter()
        .map(|c| (c.metadata.device.as_str(), c.metadata.device_series.as_deref()))
        .collect();
    assert_eq!(
        series,
        vec![("STM32F103", Some("STM32F1")), ("STM32F407", Some("STM32F4"))]
    );
    assert!(chunks[1].text.contains("Series: STM32F4"));
}
