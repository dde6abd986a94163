//! Register and bit-field records.
//!
//! Records arrive already parsed from a device description file. A
//! [`Register`] is specific to one device and one peripheral instance until
//! generalized deduplication attaches an [`Aggregation`].

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::RetrievalErr;

/// Default register width in bits.
pub const DEFAULT_REGISTER_SIZE: u32 = 32;

/// Placeholder device name emitted by parsers when the device is unknown.
pub const UNKNOWN_DEVICE: &str = "None";

/// A named bit range within a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub bit_offset: u32,
    pub bit_width: u32,
    #[serde(default)]
    pub access: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, bit_offset: u32, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            description: None,
            bit_offset,
            bit_width,
            access: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }

    /// Highest bit covered by the field.
    pub fn high_bit(&self) -> u32 {
        (self.bit_offset + self.bit_width).saturating_sub(1)
    }

    /// Bit range label, `[offset:high]`.
    pub fn bit_range(&self) -> String {
        format!("[{}:{}]", self.bit_offset, self.high_bit())
    }

    /// Structural identity used by deduplication, `name@offset:width`.
    pub fn signature(&self) -> String {
        format!("{}@{}:{}", self.name, self.bit_offset, self.bit_width)
    }

    pub fn is_reserved(&self) -> bool {
        self.name.eq_ignore_ascii_case("reserved")
    }
}

/// Devices and peripheral instances sharing one generalized register.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation {
    /// Sorted, distinct device names.
    pub devices: Vec<String>,
    /// Sorted, distinct peripheral instance names.
    pub peripheral_instances: Vec<String>,
    /// `"device/peripheral"` to full address.
    pub address_map: BTreeMap<String, String>,
    /// Device to series tag, for members that carried one.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub device_series: BTreeMap<String, String>,
}

impl Aggregation {
    /// Malformed aggregation is treated as absent.
    fn is_well_formed(&self) -> bool {
        !self.devices.is_empty()
            && !self.peripheral_instances.is_empty()
            && !self.address_map.is_empty()
    }
}

/// An addressable register of a peripheral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    pub device: String,
    #[serde(default)]
    pub device_series: Option<String>,
    pub peripheral: String,
    #[serde(default)]
    pub peripheral_description: Option<String>,
    #[serde(default)]
    pub peripheral_group: Option<String>,
    pub register: String,
    #[serde(default)]
    pub register_description: Option<String>,
    pub base_address: String,
    pub address_offset: String,
    pub full_address: String,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub reset_value: Option<String>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregation: Option<Aggregation>,
}

fn default_size() -> u32 {
    DEFAULT_REGISTER_SIZE
}

/// Effective device/instance view of a register.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub devices: &'a [String],
    pub peripheral_instances: &'a [String],
    pub address_map: Option<&'a BTreeMap<String, String>>,
}

impl Register {
    /// Create a register of one device and peripheral instance.
    ///
    /// `base` and `offset` are combined into the full address.
    pub fn new(
        device: impl Into<String>,
        peripheral: impl Into<String>,
        register: impl Into<String>,
        base: u64,
        offset: u64,
    ) -> Self {
        Self {
            device: device.into(),
            device_series: None,
            peripheral: peripheral.into(),
            peripheral_description: None,
            peripheral_group: None,
            register: register.into(),
            register_description: None,
            base_address: format_address(base),
            address_offset: format_address(offset),
            full_address: format_address(base + offset),
            size: DEFAULT_REGISTER_SIZE,
            access: None,
            reset_value: None,
            fields: Vec::new(),
            aggregation: None,
        }
    }

    pub fn with_series(mut self, series: impl Into<String>) -> Self {
        self.device_series = Some(series.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.peripheral_group = Some(group.into());
        self
    }

    pub fn with_peripheral_description(mut self, description: impl Into<String>) -> Self {
        self.peripheral_description = Some(description.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.register_description = Some(description.into());
        self
    }

    pub fn with_access(mut self, access: impl Into<String>) -> Self {
        self.access = Some(access.into());
        self
    }

    pub fn with_reset_value(mut self, reset_value: impl Into<String>) -> Self {
        self.reset_value = Some(reset_value.into());
        self
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Aggregation data, if present and well formed.
    pub fn aggregation(&self) -> Option<&Aggregation> {
        self.aggregation.as_ref().filter(|a| a.is_well_formed())
    }

    /// Devices and instances this register stands for.
    ///
    /// Falls back to the register's own device and peripheral when it was
    /// not produced by generalized deduplication.
    pub fn scope(&self) -> Scope<'_> {
        match self.aggregation() {
            Some(agg) => Scope {
                devices: &agg.devices,
                peripheral_instances: &agg.peripheral_instances,
                address_map: Some(&agg.address_map),
            },
            None => Scope {
                devices: std::slice::from_ref(&self.device),
                peripheral_instances: std::slice::from_ref(&self.peripheral),
                address_map: None,
            },
        }
    }

    /// Series tag of `device` as covered by this record.
    ///
    /// Generalized records answer from the per-device map, so one member's
    /// series is never attributed to another device.
    pub fn series_of(&self, device: &str) -> Option<&str> {
        match self.aggregation() {
            Some(agg) => agg.device_series.get(device).map(String::as_str),
            None if self.device == device => self.device_series.as_deref(),
            None => None,
        }
    }

    /// Rewrite every address literal in canonical form.
    fn canonicalize_addresses(&mut self) {
        for literal in [
            &mut self.base_address,
            &mut self.address_offset,
            &mut self.full_address,
        ] {
            if let Some(canonical) = canonical_address(literal) {
                *literal = canonical;
            }
        }
        if let Some(agg) = self.aggregation.as_mut() {
            for literal in agg.address_map.values_mut() {
                if let Some(canonical) = canonical_address(literal) {
                    *literal = canonical;
                }
            }
        }
    }

    /// True when this record stands for more than one device.
    pub fn is_multi_device(&self) -> bool {
        self.scope().devices.len() > 1
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// Format an address as a fixed-width hexadecimal literal.
pub fn format_address(address: u64) -> String {
    format!("0x{address:08X}")
}

/// Parse a hex literal (`0x` prefix optional, any case) and re-render it
/// with [`format_address`]. `None` when it is not a valid 64-bit hex number.
pub fn canonical_address(literal: &str) -> Option<String> {
    let trimmed = literal.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    u64::from_str_radix(digits, 16).ok().map(format_address)
}

/// Load parsed register records from a JSON array.
///
/// Reserved fields are dropped and addresses are canonicalized, so
/// `0x4001100c` and `0x4001100C` compare equal downstream.
pub fn load_registers(path: &Path) -> Result<Vec<Register>> {
    let content = std::fs::read_to_string(path)?;
    let mut registers: Vec<Register> =
        serde_json::from_str(&content).map_err(|e| RetrievalErr::InputParseError {
            path: path.to_path_buf(),
            cause: e.to_string(),
        })?;
    for register in &mut registers {
        register.fields.retain(|f| !f.is_reserved());
        register.canonicalize_addresses();
    }
    tracing::info!(
        path = %path.display(),
        count = registers.len(),
        "Loaded register records"
    );
    Ok(registers)
}

#[cfg(test)]
#[path = "model.test.rs"]
mod tests;
