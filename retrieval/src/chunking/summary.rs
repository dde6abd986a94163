//! Peripheral summary chunks.
//!
//! Sections are appended in priority order, each only when it fits the
//! remaining budget:
//!
//! 1. identity, description and device
//! 2. sorted register list (always present)
//! 3. registers by category
//! 4. union of field names
//! 5. a canned configuration sequence for the peripheral family
//!
//! The result is finally hard-truncated to the budget.

use crate::config::ChunkingConfig;
use crate::model::Register;
use crate::types::Chunk;
use crate::types::ChunkKind;
use crate::types::ChunkMetadata;
use crate::types::short_hash;

use super::char_len;
use super::joined_field_names;
use super::sorted_field_names;
use super::take_chars;
use super::truncate_with_ellipsis;
use super::union_addresses;
use super::union_scope;

/// Peripheral description is cut to this many characters.
const MAX_DESCRIPTION_CHARS: usize = 100;
/// Categories are only listed when more than this much budget remains.
const CATEGORY_MIN_REMAINING: usize = 100;
/// Head-room kept free while adding category lines.
const CATEGORY_RESERVE: usize = 50;
/// Field names are only listed when more than this much budget remains.
const FIELDS_MIN_REMAINING: usize = 80;
/// Room kept for the `Common fields:` label.
const FIELDS_LABEL_RESERVE: usize = 20;
/// The configuration hint is only added when more than this much budget remains.
const HINT_MIN_REMAINING: usize = 60;
const HINT_LABEL_RESERVE: usize = 10;

/// Register categories by name substring; the first match wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Control", &["CR", "CTL", "CTRL"]),
    ("Status", &["SR", "STAT", "STATUS", "ISR", "FLAG"]),
    ("Data", &["DR", "DATA", "TX", "RX", "BUF"]),
    ("Configuration", &["CFG", "CONFIG", "CONF"]),
];
const OTHER_CATEGORY: &str = "Other";

/// Group registers by likely function.
///
/// Returns `(category, sorted register names)` in fixed category order,
/// omitting empty categories.
pub fn categorize_registers<'a>(registers: &[&'a Register]) -> Vec<(&'static str, Vec<&'a str>)> {
    let mut buckets: Vec<(&'static str, Vec<&'a str>)> = CATEGORIES
        .iter()
        .map(|(name, _)| (*name, Vec::new()))
        .chain(std::iter::once((OTHER_CATEGORY, Vec::new())))
        .collect();

    for register in registers {
        let upper = register.register.to_uppercase();
        let idx = CATEGORIES
            .iter()
            .position(|(_, needles)| needles.iter().any(|n| upper.contains(n)))
            .unwrap_or(CATEGORIES.len());
        buckets[idx].1.push(register.register.as_str());
    }

    buckets.retain(|(_, names)| !names.is_empty());
    for (_, names) in &mut buckets {
        names.sort_unstable();
    }
    buckets
}

/// Canned configuration sequence for a peripheral family.
pub fn config_hint(peripheral: &str) -> String {
    let upper = peripheral.to_uppercase();
    let hint = if upper.contains("USART") || upper.contains("UART") {
        "Enable clock (RCC) → Configure baud rate (BRR) → Enable TX/RX (CR1) → \
         Enable UART (CR1.UE). Key: CR1, DR, SR, BRR"
    } else if upper.contains("SPI") {
        "Enable clock (RCC) → Configure mode/clock (CR1) → Enable SPI (CR1.SPE) → \
         Write to DR. Key: CR1, CR2, DR, SR"
    } else if upper.contains("I2C") {
        "Enable clock (RCC) → Configure timing (TIMINGR/CCR) → Enable I2C (CR1.PE) → \
         Generate START. Key: CR1, CR2, SR1, SR2"
    } else if upper.contains("TIM") {
        "Enable clock (RCC) → Set prescaler (PSC) → Set auto-reload (ARR) → \
         Enable counter (CR1.CEN). PWM: Configure CCR → Set mode (CCMR) → Enable (CCER)"
    } else if upper.contains("GPIO") {
        "Configure mode (MODER) → Set output (BSRR) → Read input (IDR) → Pull-up/down (PUPDR)"
    } else if upper.contains("ADC") {
        "Enable clock (RCC) → Configure channels (SQR) → Start conversion (CR2.SWSTART) → \
         Read result (DR)"
    } else if upper.contains("DMA") {
        "Configure addresses (PAR/MAR) → Set count (NDTR) → Configure mode (CCR) → \
         Enable (CCR.EN)"
    } else if upper.contains("RCC") {
        "System clock configuration and peripheral clock enables"
    } else if upper.contains("PWR") {
        "Power control, low-power modes, voltage regulation"
    } else {
        return format!("{peripheral}: System peripheral");
    };
    hint.to_string()
}

/// Budget left after `text`, zero when already over.
fn remaining(budget: usize, text: &str) -> usize {
    budget.saturating_sub(char_len(text))
}

/// Build the summary chunk of one peripheral group.
///
/// `key` identifies the group and seeds the chunk id.
pub fn build_summary_chunk(key: &str, registers: &[&Register], config: &ChunkingConfig) -> Option<Chunk> {
    let rep = registers.first()?;
    let budget = config.summary_max_chars;
    let mut lines: Vec<String> = Vec::new();

    lines.push(format!("Peripheral: {}", rep.peripheral));
    if config.include_peripheral_desc
        && let Some(desc) = rep.peripheral_description.as_deref()
        && !desc.is_empty()
    {
        lines.push(format!(
            "Description: {}",
            take_chars(desc, MAX_DESCRIPTION_CHARS)
        ));
    }
    if config.include_device {
        lines.push(format!("Device: {}", rep.device));
    }

    let mut names: Vec<&str> = registers.iter().map(|r| r.register.as_str()).collect();
    names.sort_unstable();
    lines.push(format!(
        "\nRegisters ({}): {}",
        registers.len(),
        names.join(", ")
    ));
    let mut current = lines.join("\n");

    if remaining(budget, &current) > CATEGORY_MIN_REMAINING {
        let limit = budget.saturating_sub(CATEGORY_RESERVE);
        for (category, members) in categorize_registers(registers) {
            let line = format!("{category}: {}", members.join(", "));
            if char_len(&current) + char_len(&line) + 1 < limit {
                lines.push(line);
                current = lines.join("\n");
            } else {
                break;
            }
        }
    }

    let room = remaining(budget, &current);
    if room > FIELDS_MIN_REMAINING {
        let fields = sorted_field_names(registers.iter().copied());
        if !fields.is_empty() {
            let field_str = truncate_with_ellipsis(&fields.join(", "), room - FIELDS_LABEL_RESERVE);
            lines.push(format!("\nCommon fields: {field_str}"));
            current = lines.join("\n");
        }
    }

    let room = remaining(budget, &current);
    if room > HINT_MIN_REMAINING {
        let hint = truncate_with_ellipsis(&config_hint(&rep.peripheral), room - HINT_LABEL_RESERVE);
        lines.push(format!("\nConfig: {hint}"));
    }

    let text = truncate_with_ellipsis(&lines.join("\n"), budget);

    let (devices, instances) = union_scope(registers.iter().copied());
    let mut metadata =
        ChunkMetadata::new(ChunkKind::PeripheralSummary, &rep.device, &rep.peripheral);
    metadata.peripheral_group = rep.peripheral_group.clone().unwrap_or_default();
    metadata.register_count = Some(registers.len());
    metadata.registers = registers.iter().map(|r| r.register.clone()).collect();
    metadata.field_names = joined_field_names(registers.iter().copied());
    metadata.devices = devices;
    metadata.peripheral_instances = instances;
    metadata.addresses = union_addresses(registers.iter().copied());

    Some(Chunk {
        id: format!("{}_summary_{}", rep.peripheral, short_hash(key, 8)),
        text,
        metadata,
    })
}

#[cfg(test)]
#[path = "summary.test.rs"]
mod tests;
