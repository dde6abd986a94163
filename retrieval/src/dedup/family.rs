//! Display label for a group of devices sharing a register.

use std::collections::BTreeSet;

use crate::model::Register;

/// Devices listed verbatim up to this count.
const MAX_LISTED_DEVICES: usize = 3;

/// Resolve a family label for the devices in `group`.
///
/// In priority order:
/// 1. series tags: the single tag, or `Multiple families (N)`;
/// 2. vendor name patterns (see [`family_from_names`]);
/// 3. the device name, a comma-joined list of up to three, or
///    `Multiple devices (N)`.
pub fn device_family_label(group: &[&Register]) -> String {
    let series: BTreeSet<&str> = group
        .iter()
        .filter_map(|r| r.device_series.as_deref())
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(first) = series.first() {
        return if series.len() == 1 {
            (*first).to_string()
        } else {
            format!("Multiple families ({})", series.len())
        };
    }

    let devices: Vec<&str> = group
        .iter()
        .map(|r| r.device.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if let Some(family) = family_from_names(&devices) {
        return family;
    }

    match devices.len() {
        1 => devices[0].to_string(),
        n if n <= MAX_LISTED_DEVICES => devices.join(", "),
        n => format!("Multiple devices ({n})"),
    }
}

/// Vendor naming patterns, checked in order.
struct VendorPattern {
    prefix: &'static str,
    /// Characters identifying the family.
    family: fn(&str) -> Option<String>,
    label: fn(&str) -> String,
    mixed: &'static str,
}

const PATTERNS: &[VendorPattern] = &[
    // STM32F407 -> STM32F4xx
    VendorPattern {
        prefix: "STM32",
        family: |d| d.get(5..7).map(String::from),
        label: |f| format!("STM32{f}xx"),
        mixed: "STM32 (multiple families)",
    },
    // nRF52840 -> nRF52xxx
    VendorPattern {
        prefix: "nRF",
        family: |d| d.get(..5).map(String::from),
        label: |f| format!("{f}xxx"),
        mixed: "nRF (multiple series)",
    },
    // MK64FN1M0 -> MK64xxx
    VendorPattern {
        prefix: "MK",
        family: |d| d.get(..4).map(String::from),
        label: |f| format!("{f}xxx"),
        mixed: "Kinetis (multiple series)",
    },
];

/// Extract a family label from device names sharing a vendor prefix.
///
/// Every name must carry the same vendor prefix. Names too short to carry a
/// family code are ignored; if none carries one, the next pattern is tried.
pub fn family_from_names(devices: &[&str]) -> Option<String> {
    if devices.is_empty() {
        return None;
    }
    for pattern in PATTERNS {
        if !devices.iter().all(|d| d.starts_with(pattern.prefix)) {
            continue;
        }
        let families: BTreeSet<String> =
            devices.iter().filter_map(|d| (pattern.family)(d)).collect();
        match families.len() {
            0 => continue,
            1 => return families.first().map(|f| (pattern.label)(f)),
            _ => return Some(pattern.mixed.to_string()),
        }
    }
    None
}

#[cfg(test)]
#[path = "family.test.rs"]
mod tests;
