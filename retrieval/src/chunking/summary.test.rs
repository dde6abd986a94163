use super::*;
use crate::model::Field;
use pretty_assertions::assert_eq;

fn usart(register: &str) -> Register {
    Register::new("STM32F407", "USART1", register, 0x4001_1000, 0x4)
}

#[test]
fn test_register_list_present_without_group() {
    let dr = usart("DR");
    let chunk = build_summary_chunk("STM32F407/USART1", &[&dr], &ChunkingConfig::default())
        .expect("non-empty group");
    assert!(chunk.text.contains("Registers (1): DR"));
    assert_eq!(chunk.metadata.peripheral_group, "");
}

#[test]
fn test_sections_in_priority_order() {
    let dr = usart("DR");
    let sr = usart("SR");
    let chunk = build_summary_chunk("STM32F407/USART1", &[&sr, &dr], &ChunkingConfig::default())
        .expect("non-empty group");
    assert_eq!(
        chunk.text,
        "Peripheral: USART1\n\
         Device: STM32F407\n\
         \n\
         Registers (2): DR, SR\n\
         Status: SR\n\
         Data: DR\n\
         \n\
         Config: Enable clock (RCC) → Configure baud rate (BRR) → Enable TX/RX (CR1) → \
         Enable UART (CR1.UE). Key: CR1, DR, SR, BRR"
    );
}

#[test]
fn test_categorize_first_match_wins() {
    let regs: Vec<Register> = ["GTPR", "DR", "CR1", "BRR", "ISR", "SR", "TXDR"]
        .into_iter()
        .map(usart)
        .collect();
    let refs: Vec<&Register> = regs.iter().collect();
    assert_eq!(
        categorize_registers(&refs),
        vec![
            ("Control", vec!["CR1"]),
            ("Status", vec!["ISR", "SR"]),
            ("Data", vec!["DR", "TXDR"]),
            ("Other", vec!["BRR", "GTPR"]),
        ]
    );
}

#[test]
fn test_config_hint_families() {
    assert!(config_hint("UART4").contains("baud rate (BRR)"));
    assert!(config_hint("SPI2").contains("CR1.SPE"));
    assert!(config_hint("TIM3").contains("prescaler (PSC)"));
    assert!(config_hint("GPIOB").starts_with("Configure mode (MODER)"));
    assert_eq!(config_hint("FLASH"), "FLASH: System peripheral");
}

#[test]
fn test_description_capped() {
    let long_desc = "x".repeat(150);
    let reg = usart("DR").with_peripheral_description(long_desc);
    let config = ChunkingConfig {
        summary_max_chars: 2000,
        ..ChunkingConfig::default()
    };
    let chunk = build_summary_chunk("k", &[&reg], &config).expect("non-empty group");
    assert!(chunk.text.contains(&format!("Description: {}\n", "x".repeat(100))));
}

#[test]
fn test_budget_respected() {
    let regs: Vec<Register> = (0..40)
        .map(|i| {
            usart(&format!("REG_{i}")).with_fields(vec![
                Field::new(format!("FIELD_A{i}"), 0, 4),
                Field::new(format!("FIELD_B{i}"), 4, 4),
            ])
        })
        .collect();
    let refs: Vec<&Register> = regs.iter().collect();

    for budget in [100, 250, 400, 800] {
        let config = ChunkingConfig {
            summary_max_chars: budget,
            ..ChunkingConfig::default()
        };
        let chunk = build_summary_chunk("k", &refs, &config).expect("non-empty group");
        assert!(
            chunk.text.chars().count() <= budget,
            "budget {budget} exceeded: {}",
            chunk.text.chars().count()
        );
        assert!(chunk.text.starts_with("Peripheral: USART1"));
    }
}

#[test]
fn test_metadata_and_id() {
    let dr = usart("DR").with_fields(vec![Field::new("DATA", 0, 9)]);
    let sr = usart("SR").with_fields(vec![Field::new("TXE", 7, 1)]);
    let chunk = build_summary_chunk("STM32F407/USART1", &[&dr, &sr], &ChunkingConfig::default())
        .expect("non-empty group");

    assert!(chunk.id.starts_with("USART1_summary_"));
    assert_eq!(chunk.id.len(), "USART1_summary_".len() + 8);
    assert_eq!(chunk.kind(), ChunkKind::PeripheralSummary);
    assert_eq!(chunk.metadata.register_count, Some(2));
    assert_eq!(chunk.metadata.registers, vec!["DR", "SR"]);
    assert_eq!(chunk.metadata.field_names, "DATA, TXE");
    assert_eq!(chunk.metadata.devices, vec!["STM32F407"]);
    assert_eq!(chunk.metadata.peripheral_instances, vec!["USART1"]);
    assert_eq!(chunk.metadata.addresses, vec!["0x40011004"]);
    assert!(chunk.metadata.address.is_none());
    assert!(chunk.text.contains("Common fields: DATA, TXE"));
}

#[test]
fn test_empty_group_has_no_summary() {
    assert!(build_summary_chunk("k", &[], &ChunkingConfig::default()).is_none());
}
