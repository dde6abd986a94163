//! Chunk construction from register records.
//!
//! Four chunk families, each bounded by a character budget:
//!
//! | Kind | Unit | Budget key |
//! |------|------|------------|
//! | `register` | one register | `chunking.register_max_chars` |
//! | `peripheral_summary` | one peripheral group | `chunking.summary_max_chars` |
//! | `peripheral_detail` | registers bin-packed per group | `chunking.detail_max_chars` |
//! | `device_summary` | one device | `chunking.device_summary_max_chars` |
//!
//! Ids are derived from content, so identical input yields identical ids.

mod builder;
mod detail;
mod device;
mod ids;
mod register;
mod summary;

pub use builder::ChunkBatch;
pub use builder::ChunkBuilder;
pub use builder::ChunkFailure;
pub use builder::PeripheralGroup;
pub use builder::group_by_peripheral;
pub use detail::TRUNCATED_MARKER;
pub use detail::build_detail_chunks;
pub use detail::format_register_detailed;
pub use device::build_device_summaries;
pub use ids::IdAllocator;
pub use register::build_register_chunk;
pub use summary::build_summary_chunk;
pub use summary::categorize_registers;
pub use summary::config_hint;

use std::collections::BTreeSet;

use crate::model::Register;

/// Suffix marking text cut to fit a budget.
pub const ELLIPSIS: &str = "...";

/// Length in characters.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// First `n` characters of `s`.
pub(crate) fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Cut `text` to at most `max` characters, ending in `...` when cut.
///
/// Budgets too small for the ellipsis get a plain cut.
pub fn truncate_with_ellipsis(text: &str, max: usize) -> String {
    if char_len(text) <= max {
        return text.to_string();
    }
    if max < ELLIPSIS.len() {
        return take_chars(text, max).to_string();
    }
    let keep = max.saturating_sub(ELLIPSIS.len());
    format!("{}{ELLIPSIS}", take_chars(text, keep))
}

/// Sorted union of field names across registers, comma-joined.
pub(crate) fn joined_field_names<'a>(registers: impl IntoIterator<Item = &'a Register>) -> String {
    sorted_field_names(registers).join(", ")
}

pub(crate) fn sorted_field_names<'a>(
    registers: impl IntoIterator<Item = &'a Register>,
) -> Vec<&'a str> {
    registers
        .into_iter()
        .flat_map(Register::field_names)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Sorted union of devices and instances covered by `registers`.
pub(crate) fn union_scope<'a>(
    registers: impl IntoIterator<Item = &'a Register>,
) -> (Vec<String>, Vec<String>) {
    let mut devices = BTreeSet::new();
    let mut instances = BTreeSet::new();
    for register in registers {
        let scope = register.scope();
        devices.extend(scope.devices.iter().cloned());
        instances.extend(scope.peripheral_instances.iter().cloned());
    }
    (devices.into_iter().collect(), instances.into_iter().collect())
}

/// Sorted, distinct full addresses covered by `registers`, including every
/// member address of generalized records.
pub(crate) fn union_addresses<'a>(
    registers: impl IntoIterator<Item = &'a Register>,
) -> Vec<String> {
    let mut addresses = BTreeSet::new();
    for register in registers {
        match register.scope().address_map {
            Some(map) => addresses.extend(map.values().cloned()),
            None => {
                addresses.insert(register.full_address.clone());
            }
        }
    }
    addresses.into_iter().collect()
}

#[cfg(test)]
#[path = "mod.test.rs"]
mod tests;
