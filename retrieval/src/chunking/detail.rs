//! Peripheral detail chunks.
//!
//! Full register descriptions of one peripheral group, bin-packed in input
//! order so every chunk stays within `detail_max_chars`. A register is never
//! split across chunks; one that is too large alone gets a chunk of its own
//! and is hard-truncated.

use crate::config::ChunkingConfig;
use crate::model::Register;
use crate::types::Chunk;
use crate::types::ChunkKind;
use crate::types::ChunkMetadata;
use crate::types::short_hash;

use super::char_len;
use super::joined_field_names;
use super::truncate_with_ellipsis;
use super::union_addresses;
use super::union_scope;

/// Appended to every detail chunk except the last of its group.
pub const TRUNCATED_MARKER: &str = "\n[truncated]";

#[derive(Clone)]
struct Bin<'a> {
    registers: Vec<&'a Register>,
    bodies: Vec<String>,
}

impl<'a> Bin<'a> {
    fn new() -> Self {
        Self {
            registers: Vec::new(),
            bodies: Vec::new(),
        }
    }

    fn push(&mut self, register: &'a Register, body: String) {
        self.registers.push(register);
        self.bodies.push(body);
    }

    fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    fn render(&self, rep: &Register, part: usize, total: usize, config: &ChunkingConfig) -> String {
        let mut header = vec![format!(
            "Peripheral: {} (Detail {part} of {total})",
            rep.peripheral
        )];
        if config.include_device {
            header.push(format!("Device: {}", rep.device));
        }
        let names: Vec<&str> = self.registers.iter().map(|r| r.register.as_str()).collect();
        header.push(format!("Registers: {}", names.join(", ")));
        format!("{}\n\n{}", header.join("\n"), self.bodies.join("\n\n"))
    }
}

/// Full description of one register as rendered in detail chunks.
pub fn format_register_detailed(register: &Register, config: &ChunkingConfig) -> String {
    let mut lines = vec![register.register.clone()];
    if config.include_register_desc
        && let Some(desc) = register.register_description.as_deref()
        && !desc.is_empty()
    {
        lines.push(format!("  {desc}"));
    }
    lines.push(format!("  Address: {}", register.full_address));
    if let Some(access) = register.access.as_deref() {
        lines.push(format!("  Access: {access}"));
    }
    if let Some(reset) = register.reset_value.as_deref() {
        lines.push(format!("  Reset: {reset}"));
    }
    if config.include_field_names && !register.fields.is_empty() {
        let fields: Vec<String> = register
            .fields
            .iter()
            .map(|f| match f.description.as_deref() {
                Some(desc) if config.include_field_desc && !desc.is_empty() => {
                    format!("{}{} - {desc}", f.name, f.bit_range())
                }
                _ => format!("{}{}", f.name, f.bit_range()),
            })
            .collect();
        lines.push(format!("  Fields: {}", fields.join(", ")));
    }
    lines.join("\n")
}

/// Build the detail chunks of one peripheral group.
///
/// Bins are sized against the largest possible `Detail k of N` header and
/// with room for the truncation marker, so the final numbering never
/// pushes a chunk over budget.
pub fn build_detail_chunks(key: &str, registers: &[&Register], config: &ChunkingConfig) -> Vec<Chunk> {
    let Some(rep) = registers.first() else {
        return Vec::new();
    };
    let budget = config.detail_max_chars;
    let placeholder = registers.len();
    let marker_len = char_len(TRUNCATED_MARKER);

    let mut bins: Vec<Bin<'_>> = Vec::new();
    let mut current = Bin::new();
    for &register in registers {
        let body = format_register_detailed(register, config);
        let mut candidate = current.clone();
        candidate.push(register, body.clone());
        let fits = char_len(&candidate.render(rep, placeholder, placeholder, config)) + marker_len
            <= budget;
        if fits || current.is_empty() {
            current = candidate;
        } else {
            bins.push(std::mem::replace(&mut current, Bin::new()));
            current.push(register, body);
        }
    }
    if !current.is_empty() {
        bins.push(current);
    }

    let total = bins.len();
    let (devices, instances) = union_scope(registers.iter().copied());
    let hash = short_hash(key, 8);

    bins.iter()
        .enumerate()
        .map(|(idx, bin)| {
            let part = idx + 1;
            let rendered = bin.render(rep, part, total, config);
            // Cut the body, never the marker.
            let text = if part < total && budget >= marker_len {
                let body = truncate_with_ellipsis(&rendered, budget - marker_len);
                format!("{body}{TRUNCATED_MARKER}")
            } else {
                truncate_with_ellipsis(&rendered, budget)
            };

            let mut metadata =
                ChunkMetadata::new(ChunkKind::PeripheralDetail, &rep.device, &rep.peripheral);
            metadata.peripheral_group = rep.peripheral_group.clone().unwrap_or_default();
            metadata.chunk_part = Some(part);
            metadata.chunk_total = Some(total);
            metadata.register_count = Some(bin.registers.len());
            metadata.registers = bin.registers.iter().map(|r| r.register.clone()).collect();
            metadata.field_names = joined_field_names(bin.registers.iter().copied());
            metadata.devices = devices.clone();
            metadata.peripheral_instances = instances.clone();
            metadata.addresses = union_addresses(bin.registers.iter().copied());

            Chunk {
                id: format!("{}_detail_{part}_{hash}", rep.peripheral),
                text,
                metadata,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "detail.test.rs"]
mod tests;
