//! Chunk builder over a full register set.
//!
//! Groups registers by peripheral, renders every enabled chunk family and
//! makes ids unique across the batch. A malformed group is reported as a
//! failure and skipped; the rest of the batch is still built.

use std::collections::HashMap;

use crate::config::ChunkingConfig;
use crate::model::Register;
use crate::types::Chunk;
use crate::types::ChunkKind;

use super::IdAllocator;
use super::build_detail_chunks;
use super::build_device_summaries;
use super::build_register_chunk;
use super::build_summary_chunk;

/// Registers of one peripheral, in input order.
///
/// Multi-device records are keyed by peripheral alone, others by
/// `device/peripheral`.
#[derive(Debug, Clone)]
pub struct PeripheralGroup<'a> {
    pub key: String,
    pub registers: Vec<&'a Register>,
}

/// Group registers by peripheral, keeping first-appearance order.
pub fn group_by_peripheral(registers: &[Register]) -> Vec<PeripheralGroup<'_>> {
    let mut groups: Vec<PeripheralGroup<'_>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for register in registers {
        let key = if register.is_multi_device() {
            register.peripheral.clone()
        } else {
            format!("{}/{}", register.device, register.peripheral)
        };
        match index.get(&key) {
            Some(&idx) => groups[idx].registers.push(register),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push(PeripheralGroup {
                    key,
                    registers: vec![register],
                });
            }
        }
    }
    groups
}

/// An input item that produced no chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    /// Register id or peripheral group key.
    pub item: String,
    pub reason: String,
}

/// Output of one build.
#[derive(Debug, Clone, Default)]
pub struct ChunkBatch {
    pub chunks: Vec<Chunk>,
    pub failures: Vec<ChunkFailure>,
}

impl ChunkBatch {
    /// Number of chunks of `kind`.
    pub fn count(&self, kind: ChunkKind) -> usize {
        self.chunks.iter().filter(|c| c.kind() == kind).count()
    }
}

/// Reject records that cannot be rendered meaningfully.
fn validate_register(register: &Register) -> Result<(), String> {
    if register.peripheral.trim().is_empty() {
        return Err("empty peripheral name".to_string());
    }
    if register.register.trim().is_empty() {
        return Err("empty register name".to_string());
    }
    for field in &register.fields {
        if field.bit_width == 0 {
            return Err(format!(
                "field {} of {} has zero width",
                field.name, register.register
            ));
        }
    }
    Ok(())
}

/// Renders chunks according to a [`ChunkingConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChunkBuilder {
    config: ChunkingConfig,
}

impl ChunkBuilder {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Build all enabled chunk families for `registers`.
    pub fn build(&self, registers: &[Register]) -> ChunkBatch {
        let mut batch = ChunkBatch::default();

        if self.config.register_chunks {
            for register in registers {
                match validate_register(register) {
                    Ok(()) => batch
                        .chunks
                        .push(build_register_chunk(register, &self.config)),
                    Err(reason) => batch.failures.push(ChunkFailure {
                        item: format!(
                            "{}/{}/{}",
                            register.device, register.peripheral, register.register
                        ),
                        reason,
                    }),
                }
            }
        }

        if self.config.peripheral_chunks {
            for group in group_by_peripheral(registers) {
                if let Some(reason) = group
                    .registers
                    .iter()
                    .find_map(|r| validate_register(r).err())
                {
                    batch.failures.push(ChunkFailure {
                        item: group.key,
                        reason,
                    });
                    continue;
                }
                if let Some(summary) =
                    build_summary_chunk(&group.key, &group.registers, &self.config)
                {
                    batch.chunks.push(summary);
                }
                batch.chunks.extend(build_detail_chunks(
                    &group.key,
                    &group.registers,
                    &self.config,
                ));
            }
        }

        if self.config.device_summaries {
            batch
                .chunks
                .extend(build_device_summaries(registers, &self.config));
        }

        let mut ids = IdAllocator::new();
        for chunk in &mut batch.chunks {
            chunk.id = ids.assign(std::mem::take(&mut chunk.id));
        }

        for failure in &batch.failures {
            tracing::warn!(
                item = %failure.item,
                reason = %failure.reason,
                "Skipped malformed input"
            );
        }
        tracing::info!(
            registers = registers.len(),
            chunks = batch.chunks.len(),
            register_chunks = batch.count(ChunkKind::Register),
            summaries = batch.count(ChunkKind::PeripheralSummary),
            details = batch.count(ChunkKind::PeripheralDetail),
            device_summaries = batch.count(ChunkKind::DeviceSummary),
            failures = batch.failures.len(),
            "Built chunks"
        );
        batch
    }
}

#[cfg(test)]
#[path = "builder.test.rs"]
mod tests;
