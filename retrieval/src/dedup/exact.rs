use std::collections::HashMap;

use sha2::Digest;
use sha2::Sha256;

use super::DedupReport;
use crate::model::Register;

/// Separator between key components; cannot appear in parsed names.
const SEP: u8 = 0x1f;

/// Identity hash of a register.
///
/// Covers device, series, peripheral, register name, the address triple,
/// size, access, reset value and the field layout sorted by
/// (name, offset, width).
pub fn exact_key(register: &Register) -> String {
    let mut hasher = Sha256::new();
    let size = register.size.to_string();
    let parts: [&str; 10] = [
        &register.device,
        register.device_series.as_deref().unwrap_or_default(),
        &register.peripheral,
        &register.register,
        &register.base_address,
        &register.address_offset,
        &register.full_address,
        &size,
        register.access.as_deref().unwrap_or_default(),
        register.reset_value.as_deref().unwrap_or_default(),
    ];
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([SEP]);
    }

    let mut fields: Vec<(&str, u32, u32)> = register
        .fields
        .iter()
        .map(|f| (f.name.as_str(), f.bit_offset, f.bit_width))
        .collect();
    fields.sort_unstable();
    for (name, offset, width) in fields {
        hasher.update(format!("{name}@{offset}:{width}").as_bytes());
        hasher.update([SEP]);
    }

    hex::encode(hasher.finalize())
}

/// Drop exact duplicates, keeping the first occurrence of each key.
pub fn dedup_exact(registers: Vec<Register>) -> (Vec<Register>, DedupReport) {
    let before = registers.len();
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(before);
    let mut kept = Vec::with_capacity(before);

    for register in registers {
        let count = counts.entry(exact_key(&register)).or_default();
        if *count == 0 {
            kept.push(register);
        }
        *count += 1;
    }

    let report = DedupReport {
        before,
        after: kept.len(),
        max_group_size: counts.values().copied().max().unwrap_or(0),
    };
    tracing::info!(
        before = report.before,
        after = report.after,
        removed = report.removed(),
        "Exact deduplication complete"
    );
    (kept, report)
}

#[cfg(test)]
#[path = "exact.test.rs"]
mod tests;
