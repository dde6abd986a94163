use super::*;
use pretty_assertions::assert_eq;

fn process(query: &str) -> QueryInfo {
    QueryPreprocessor::new().process(query)
}

#[test]
fn test_tokens_lowercased() {
    let info = process("  Enable USART1 TX  ");
    assert_eq!(info.clean, "enable usart1 tx");
    assert_eq!(info.tokens, vec!["enable", "usart1", "tx"]);
}

#[test]
fn test_dma_question_penalizes_usb() {
    let info =
        process("Which DMA register on STM32F411 stores the number of data items to transfer?");
    assert_eq!(info.peripheral_hints, vec!["DMA"]);
    assert_eq!(info.register_hints, vec!["DMA", "STM32F411"]);
    assert_eq!(
        info.peripheral_penalties,
        vec!["OTG", "OTG_FS", "OTG_HS", "USB"]
    );
    assert!(info.address_hints.is_empty());
}

#[test]
fn test_usb_mention_lifts_dma_penalty() {
    let info = process("usb dma endpoint buffer");
    assert!(info.peripheral_penalties.is_empty());
    assert_eq!(info.peripheral_hints, vec!["DMA", "USB"]);
}

#[test]
fn test_uart_triggers_both_families() {
    let info = process("how do I set the uart baud rate");
    assert_eq!(info.peripheral_hints, vec!["UART", "USART"]);
}

#[test]
fn test_timer_penalties() {
    let info = process("timer prescaler value");
    assert_eq!(
        info.peripheral_penalties,
        vec!["IWDG", "STK", "SYSTICK", "WWDG"]
    );
    // "timer" is not a family trigger on its own
    assert!(info.peripheral_hints.is_empty());

    let info = process("systick timer reload");
    assert_eq!(info.peripheral_penalties, vec!["IWDG", "WWDG"]);

    let info = process("watchdog prescaler");
    assert_eq!(info.peripheral_penalties, vec!["IWDG", "WWDG"]);
}

#[test]
fn test_i2c_penalizes_usb_controllers() {
    let info = process("i2c clock stretching");
    assert_eq!(info.peripheral_penalties, vec!["OTG_FS", "OTG_HS", "USB"]);
}

#[test]
fn test_register_hints_need_upper_case() {
    let info = process("what does BSRR or moder or X do in GPIOA");
    assert_eq!(info.register_hints, vec!["BSRR", "GPIOA"]);
    assert_eq!(info.peripheral_hints, Vec::<String>::new());
}

#[test]
fn test_address_hints_in_order() {
    let info = process("register at 0x40011000 or 0X1 or 0x4001100C");
    assert_eq!(info.address_hints, vec!["0x40011000", "0x4001100C"]);
    assert_eq!(info.first_address(), Some("0x40011000"));
}

#[test]
fn test_address_hints_are_canonical() {
    let info = process("what is at 0x4001100c? also 0x1c");
    assert_eq!(info.address_hints, vec!["0x4001100C", "0x0000001C"]);
}

#[test]
fn test_has_hints() {
    assert!(!process("how do clocks work").has_hints());
    assert!(process("gpio pull-up").has_hints());
    assert!(process("what is CR1").has_hints());
}

#[test]
fn test_trigger_lookup() {
    assert_eq!(peripheral_triggers("uart"), &["UART", "USART"]);
    assert!(peripheral_triggers("timer").is_empty());
}
