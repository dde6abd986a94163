use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use super::DedupReport;
use super::family::device_family_label;
use crate::model::Aggregation;
use crate::model::Register;

/// Grouping key of the generalized pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FamilyKey {
    /// Peripheral group, or the peripheral name prefix when ungrouped.
    pub family: String,
    pub register: String,
    /// Fields sorted by name, offset and width, `name@offset:width` joined with `,`.
    pub field_signature: String,
}

/// Family name of a register: its explicit group, else the first
/// `prefix_len` characters of the peripheral name.
fn peripheral_family(register: &Register, prefix_len: usize) -> String {
    match register.peripheral_group.as_deref() {
        Some(group) if !group.is_empty() => group.to_string(),
        _ => register.peripheral.chars().take(prefix_len).collect(),
    }
}

/// Compute the generalized key of a register.
pub fn family_key(register: &Register, prefix_len: usize) -> FamilyKey {
    let mut fields: Vec<_> = register.fields.iter().collect();
    fields.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then(a.bit_offset.cmp(&b.bit_offset))
            .then(a.bit_width.cmp(&b.bit_width))
    });
    let field_signature = fields
        .iter()
        .map(|f| f.signature())
        .collect::<Vec<_>>()
        .join(",");

    FamilyKey {
        family: peripheral_family(register, prefix_len),
        register: register.register.clone(),
        field_signature,
    }
}

/// Merge registers sharing a [`FamilyKey`] into one representative.
///
/// Output order follows the first appearance of each key. Groups of one are
/// passed through unchanged.
pub fn dedup_generalized(
    registers: Vec<Register>,
    prefix_len: usize,
) -> (Vec<Register>, DedupReport) {
    let before = registers.len();
    let mut order: Vec<FamilyKey> = Vec::new();
    let mut groups: HashMap<FamilyKey, Vec<Register>> = HashMap::new();

    for register in registers {
        let key = family_key(&register, prefix_len);
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(register);
    }

    let mut max_group_size = 0;
    let mut merged = Vec::with_capacity(order.len());
    for key in order {
        let Some(group) = groups.remove(&key) else {
            continue;
        };
        max_group_size = max_group_size.max(group.len());
        if let Some(register) = merge_group(group, &key) {
            merged.push(register);
        }
    }

    let report = DedupReport {
        before,
        after: merged.len(),
        max_group_size,
    };
    tracing::info!(
        before = report.before,
        after = report.after,
        reduction_pct = report.reduction_pct(),
        max_group_size = report.max_group_size,
        "Generalized deduplication complete"
    );
    (merged, report)
}

fn merge_group(group: Vec<Register>, key: &FamilyKey) -> Option<Register> {
    if group.len() == 1 {
        return group.into_iter().next();
    }

    let mut devices = BTreeSet::new();
    let mut peripheral_instances = BTreeSet::new();
    let mut address_map = BTreeMap::new();
    let mut device_series = BTreeMap::new();
    for register in &group {
        let scope = register.scope();
        devices.extend(scope.devices.iter().cloned());
        peripheral_instances.extend(scope.peripheral_instances.iter().cloned());
        match register.aggregation() {
            Some(agg) => {
                address_map.extend(agg.address_map.clone());
                for (device, series) in &agg.device_series {
                    device_series
                        .entry(device.clone())
                        .or_insert_with(|| series.clone());
                }
            }
            None => {
                address_map.insert(
                    format!("{}/{}", register.device, register.peripheral),
                    register.full_address.clone(),
                );
                if let Some(series) = &register.device_series {
                    device_series
                        .entry(register.device.clone())
                        .or_insert_with(|| series.clone());
                }
            }
        }
    }
    let devices: Vec<String> = devices.into_iter().collect();
    let peripheral_instances: Vec<String> = peripheral_instances.into_iter().collect();

    let device_label = (devices.len() > 1).then(|| {
        let members: Vec<&Register> = group.iter().collect();
        device_family_label(&members)
    });

    let mut representative = group.into_iter().next()?;
    if peripheral_instances.len() > 1 {
        representative.peripheral = key.family.clone();
    }
    if let Some(label) = device_label {
        representative.device = label;
    }
    representative.aggregation = Some(Aggregation {
        devices,
        peripheral_instances,
        address_map,
        device_series,
    });
    Some(representative)
}

#[cfg(test)]
#[path = "generalized.test.rs"]
mod tests;
