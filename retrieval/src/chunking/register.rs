use crate::config::ChunkingConfig;
use crate::model::Register;
use crate::types::Chunk;
use crate::types::ChunkKind;
use crate::types::ChunkMetadata;

use super::joined_field_names;
use super::truncate_with_ellipsis;
use super::union_addresses;

/// Example addresses shown for a generalized register.
const MAX_EXAMPLE_ADDRESSES: usize = 3;

/// Render one register as a chunk.
///
/// Identity, address, size, access, reset value, then one line per field.
pub fn build_register_chunk(register: &Register, config: &ChunkingConfig) -> Chunk {
    let mut lines = Vec::new();

    if config.include_device {
        lines.push(format!("Device: {}", register.device));
    }
    match register.peripheral_description.as_deref() {
        Some(desc) if config.include_peripheral_desc && !desc.is_empty() => {
            lines.push(format!("Peripheral: {} - {desc}", register.peripheral));
        }
        _ => lines.push(format!("Peripheral: {}", register.peripheral)),
    }
    lines.push(format!("Register: {}", register.register));
    if config.include_register_desc
        && let Some(desc) = register.register_description.as_deref()
        && !desc.is_empty()
    {
        lines.push(format!("Description: {desc}"));
    }

    lines.push(address_line(register));
    lines.push(format!("Size: {} bits", register.size));
    if let Some(access) = register.access.as_deref() {
        lines.push(format!("Access: {access}"));
    }
    if let Some(reset) = register.reset_value.as_deref() {
        lines.push(format!("Reset: {reset}"));
    }

    if config.include_field_names && !register.fields.is_empty() {
        lines.push("Fields:".to_string());
        for field in &register.fields {
            let mut line = format!("  {} {}", field.name, field.bit_range());
            if let Some(access) = field.access.as_deref() {
                line.push_str(&format!(" ({access})"));
            }
            if config.include_field_desc
                && let Some(desc) = field.description.as_deref()
                && !desc.is_empty()
            {
                line.push_str(&format!(" — {desc}"));
            }
            lines.push(line);
        }
    }

    let text = truncate_with_ellipsis(&lines.join("\n"), config.register_max_chars);

    let scope = register.scope();
    let mut metadata =
        ChunkMetadata::new(ChunkKind::Register, &register.device, &register.peripheral);
    metadata.peripheral_group = register.peripheral_group.clone().unwrap_or_default();
    metadata.register = Some(register.register.clone());
    metadata.register_lower = Some(register.register.to_lowercase());
    metadata.address = Some(register.full_address.clone());
    metadata.size = Some(register.size);
    metadata.access = register.access.clone();
    metadata.field_names = joined_field_names([register]);
    metadata.devices = scope.devices.to_vec();
    metadata.peripheral_instances = scope.peripheral_instances.to_vec();
    metadata.address_map = scope.address_map.cloned();
    metadata.addresses = union_addresses([register]);

    Chunk {
        id: format!(
            "{}/{}/{}",
            register.device, register.peripheral, register.register
        ),
        text,
        metadata,
    }
}

/// `Address: X`, or up to three example addresses plus a count of the rest.
fn address_line(register: &Register) -> String {
    match register.scope().address_map {
        Some(map) if map.len() > 1 => {
            let examples: Vec<String> = map
                .iter()
                .take(MAX_EXAMPLE_ADDRESSES)
                .map(|(key, addr)| format!("{addr} ({key})"))
                .collect();
            let rest = map.len().saturating_sub(MAX_EXAMPLE_ADDRESSES);
            if rest > 0 {
                format!("Addresses: {} (+{rest} more)", examples.join(", "))
            } else {
                format!("Addresses: {}", examples.join(", "))
            }
        }
        _ => format!("Address: {}", register.full_address),
    }
}

#[cfg(test)]
#[path = "register.test.rs"]
mod tests;
