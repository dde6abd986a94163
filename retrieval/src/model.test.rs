use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_bit_range_and_signature() {
    let field = Field::new("UE", 13, 1);
    assert_eq!(field.bit_range(), "[13:13]");
    assert_eq!(field.signature(), "UE@13:1");

    let wide = Field::new("DIV_Mantissa", 4, 12);
    assert_eq!(wide.bit_range(), "[4:15]");
    assert_eq!(wide.high_bit(), 15);
}

#[test]
fn test_new_register_formats_addresses() {
    let reg = Register::new("STM32F407", "USART1", "DR", 0x4001_1000, 0x4);
    assert_eq!(reg.base_address, "0x40011000");
    assert_eq!(reg.address_offset, "0x00000004");
    assert_eq!(reg.full_address, "0x40011004");
    assert_eq!(reg.size, 32);
}

#[test]
fn test_scope_without_aggregation() {
    let reg = Register::new("STM32F407", "USART1", "DR", 0x4001_1000, 0x4);
    let scope = reg.scope();
    assert_eq!(scope.devices, ["STM32F407".to_string()]);
    assert_eq!(scope.peripheral_instances, ["USART1".to_string()]);
    assert!(scope.address_map.is_none());
    assert!(!reg.is_multi_device());
}

#[test]
fn test_scope_with_aggregation() {
    let mut reg = Register::new("STM32F4xx", "USART", "DR", 0x4001_1000, 0x4);
    reg.aggregation = Some(Aggregation {
        devices: vec!["STM32F407".to_string(), "STM32F411".to_string()],
        peripheral_instances: vec!["USART1".to_string()],
        address_map: BTreeMap::from([
            ("STM32F407/USART1".to_string(), "0x40011004".to_string()),
            ("STM32F411/USART1".to_string(), "0x40011004".to_string()),
        ]),
        device_series: Default::default(),
    });
    assert!(reg.is_multi_device());
    assert_eq!(reg.scope().address_map.map(BTreeMap::len), Some(2));
}

#[test]
fn test_malformed_aggregation_is_ignored() {
    let mut reg = Register::new("STM32F407", "USART1", "DR", 0x4001_1000, 0x4);
    reg.aggregation = Some(Aggregation {
        devices: Vec::new(),
        peripheral_instances: vec!["USART1".to_string()],
        address_map: BTreeMap::new(),
        device_series: Default::default(),
    });
    assert!(reg.aggregation().is_none());
    assert_eq!(reg.scope().devices, ["STM32F407".to_string()]);
}

#[test]
fn test_load_registers_drops_reserved_fields() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registers.json");
    std::fs::write(
        &path,
        r#"[{
            "device": "STM32F407",
            "device_series": null,
            "peripheral": "USART1",
            "peripheral_group": "USART",
            "register": "CR1",
            "base_address": "0x40011000",
            "address_offset": "0x0C",
            "full_address": "0x4001100C",
            "fields": [
                {"name": "UE", "bit_offset": 13, "bit_width": 1, "bit_range": "[13:13]"},
                {"name": "Reserved", "bit_offset": 14, "bit_width": 2}
            ]
        }]"#,
    )
    .expect("write");

    let registers = load_registers(&path).expect("load");
    assert_eq!(registers.len(), 1);
    let reg = &registers[0];
    assert_eq!(reg.size, DEFAULT_REGISTER_SIZE);
    assert_eq!(reg.peripheral_group.as_deref(), Some("USART"));
    assert_eq!(reg.field_names().collect::<Vec<_>>(), vec!["UE"]);
    assert!(reg.aggregation().is_none());
}

#[test]
fn test_load_registers_reports_path_on_bad_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{not json").expect("write");

    let err = load_registers(&path).expect_err("should fail");
    assert!(matches!(err, RetrievalErr::InputParseError { .. }));
}

#[test]
fn test_canonical_address() {
    assert_eq!(canonical_address("0x4001100c").as_deref(), Some("0x4001100C"));
    assert_eq!(canonical_address(" 0X1c ").as_deref(), Some("0x0000001C"));
    assert_eq!(canonical_address("4001100C").as_deref(), Some("0x4001100C"));
    assert_eq!(canonical_address("0xZZ"), None);
    assert_eq!(canonical_address(""), None);
}

#[test]
fn test_load_registers_canonicalizes_addresses() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("registers.json");
    std::fs::write(
        &path,
        r#"[{
            "device": "STM32F407",
            "peripheral": "USART1",
            "register": "CR1",
            "base_address": "0x40011000",
            "address_offset": "0xc",
            "full_address": "0x4001100c",
            "aggregation": {
                "devices": ["STM32F407"],
                "peripheral_instances": ["USART1"],
                "address_map": {"STM32F407/USART1": "0x4001100c"}
            }
        }]"#,
    )
    .expect("write");

    let registers = load_registers(&path).expect("load");
    let reg = &registers[0];
    assert_eq!(reg.full_address, "0x4001100C");
    assert_eq!(reg.address_offset, "0x0000000C");
    assert_eq!(
        reg.scope().address_map.and_then(|m| m.get("STM32F407/USART1")).map(String::as_str),
        Some("0x4001100C")
    );
}
