//! Device overview chunks listing the peripherals of each device.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::config::ChunkingConfig;
use crate::model::Register;
use crate::model::UNKNOWN_DEVICE;
use crate::types::Chunk;
use crate::types::ChunkKind;
use crate::types::ChunkMetadata;

use super::truncate_with_ellipsis;

enum Match {
    Prefix(&'static str),
    Contains(&'static [&'static str]),
}

/// Peripheral buckets in display order; the first match wins.
const BUCKETS: &[(&str, Match)] = &[
    ("Timers", Match::Prefix("TIM")),
    ("GPIO", Match::Prefix("GPIO")),
    ("UART/USART", Match::Contains(&["UART", "USART"])),
    ("SPI", Match::Prefix("SPI")),
    ("I2C", Match::Prefix("I2C")),
    ("ADC", Match::Prefix("ADC")),
    ("DAC", Match::Prefix("DAC")),
    ("DMA", Match::Prefix("DMA")),
    ("USB", Match::Contains(&["USB"])),
    ("CAN", Match::Contains(&["CAN"])),
];

impl Match {
    fn matches(&self, peripheral: &str) -> bool {
        match self {
            Match::Prefix(prefix) => peripheral.starts_with(prefix),
            Match::Contains(needles) => needles.iter().any(|n| peripheral.contains(n)),
        }
    }
}

#[derive(Default)]
struct DeviceEntry {
    series: Option<String>,
    peripherals: BTreeSet<String>,
}

fn is_known_device(device: &str) -> bool {
    !device.is_empty() && device != UNKNOWN_DEVICE
}

/// Collect the peripherals of every device covered by `registers`.
///
/// Generalized registers contribute each `device/instance` pair of their
/// address map.
fn collect_devices(registers: &[Register]) -> BTreeMap<String, DeviceEntry> {
    let mut devices: BTreeMap<String, DeviceEntry> = BTreeMap::new();
    for register in registers {
        let pairs: Vec<(&str, &str)> = match register.scope().address_map {
            Some(map) => map.keys().filter_map(|key| key.split_once('/')).collect(),
            None => vec![(register.device.as_str(), register.peripheral.as_str())],
        };
        for (device, peripheral) in pairs {
            if !is_known_device(device) || peripheral.is_empty() {
                continue;
            }
            let entry = devices.entry(device.to_string()).or_default();
            entry.peripherals.insert(peripheral.to_string());
            if entry.series.is_none() {
                entry.series = register.series_of(device).map(String::from);
            }
        }
    }
    devices
}

/// Build one overview chunk per known device, ordered by device name.
pub fn build_device_summaries(registers: &[Register], config: &ChunkingConfig) -> Vec<Chunk> {
    collect_devices(registers)
        .into_iter()
        .map(|(device, entry)| build_device_summary(&device, &entry, config))
        .collect()
}

fn build_device_summary(device: &str, entry: &DeviceEntry, config: &ChunkingConfig) -> Chunk {
    let peripherals: Vec<String> = entry.peripherals.iter().cloned().collect();

    let mut lines = vec![format!("Device: {device}")];
    if let Some(series) = entry.series.as_deref() {
        lines.push(format!("Series: {series}"));
    }
    lines.push(format!(
        "\nAvailable Peripherals ({} total):",
        peripherals.len()
    ));

    let mut buckets: Vec<Vec<&str>> = vec![Vec::new(); BUCKETS.len()];
    let mut other: Vec<&str> = Vec::new();
    for peripheral in &peripherals {
        let upper = peripheral.to_uppercase();
        match BUCKETS.iter().position(|(_, m)| m.matches(&upper)) {
            Some(idx) => buckets[idx].push(peripheral),
            None => other.push(peripheral),
        }
    }
    for ((label, _), members) in BUCKETS.iter().zip(&buckets) {
        if !members.is_empty() {
            lines.push(format!("{label} ({}): {}", members.len(), members.join(", ")));
        }
    }
    if !other.is_empty() {
        lines.push(format!("\nSystem/Other: {}", other.join(", ")));
    }

    let text = truncate_with_ellipsis(&lines.join("\n"), config.device_summary_max_chars);

    let mut metadata = ChunkMetadata::new(ChunkKind::DeviceSummary, device, peripherals.join(" "));
    metadata.device_series = entry.series.clone();
    metadata.peripheral_count = Some(peripherals.len());
    metadata.devices = vec![device.to_string()];
    metadata.peripheral_instances = peripherals.clone();
    metadata.peripherals = peripherals;

    Chunk {
        id: format!("device_summary_{device}"),
        text,
        metadata,
    }
}

#[cfg(test)]
#[path = "device.test.rs"]
mod tests;
