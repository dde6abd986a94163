//! Query preprocessing.
//!
//! Extracts three kinds of positive hints and one negative one:
//! - peripheral families named by trigger words (`uart`, `gpio`, ...)
//! - register-like upper-case tokens (`CR1`, `BSRR`)
//! - literal hex addresses (`0x40011000`)
//! - peripheral prefixes to penalize when the question rules them out

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::model::canonical_address;

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9_]+").expect("invalid regex"));
static ADDR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b0x[0-9a-fA-F]+\b").expect("invalid regex"));
static REG_HINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Z0-9_]{1,15}$").expect("invalid regex"));

/// Lower-case trigger token to peripheral family tags.
const PERIPHERAL_TRIGGERS: &[(&str, &[&str])] = &[
    ("uart", &["UART", "USART"]),
    ("usart", &["USART"]),
    ("gpio", &["GPIO"]),
    ("dma", &["DMA"]),
    ("spi", &["SPI"]),
    ("i2c", &["I2C"]),
    ("tim", &["TIM"]),
    ("rcc", &["RCC"]),
    ("adc", &["ADC"]),
    ("dac", &["DAC"]),
    ("can", &["CAN"]),
    ("usb", &["USB"]),
];

const USB_PREFIXES: &[&str] = &["OTG_FS", "OTG_HS", "OTG", "USB"];
const SYSTICK_PREFIXES: &[&str] = &["STK", "SYSTICK"];
const WATCHDOG_PREFIXES: &[&str] = &["WWDG", "IWDG"];
const USB_I2C_PREFIXES: &[&str] = &["OTG_FS", "OTG_HS", "USB"];

/// Peripheral family tags triggered by a lower-case token.
pub fn peripheral_triggers(token: &str) -> &'static [&'static str] {
    PERIPHERAL_TRIGGERS
        .iter()
        .find(|(trigger, _)| *trigger == token)
        .map(|(_, families)| *families)
        .unwrap_or(&[])
}

/// Hints extracted from one query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryInfo {
    pub raw: String,
    /// Trimmed, lower-cased text.
    pub clean: String,
    /// Lower-cased tokens in query order.
    pub tokens: Vec<String>,
    pub peripheral_hints: Vec<String>,
    pub register_hints: Vec<String>,
    /// Hex literals in order of appearance, rewritten in the canonical
    /// `0x%08X` form stored on chunks.
    pub address_hints: Vec<String>,
    /// Peripheral name prefixes to demote.
    pub peripheral_penalties: Vec<String>,
}

impl QueryInfo {
    /// True when the query names a peripheral family or a register.
    pub fn has_hints(&self) -> bool {
        !self.peripheral_hints.is_empty() || !self.register_hints.is_empty()
    }

    pub fn first_address(&self) -> Option<&str> {
        self.address_hints.first().map(String::as_str)
    }

    fn has_token(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }
}

/// Stateless query preprocessor.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryPreprocessor;

impl QueryPreprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Extract hints from `query`.
    pub fn process(&self, query: &str) -> QueryInfo {
        let clean = query.trim().to_lowercase();
        let tokens: Vec<String> = TOKEN_RE
            .find_iter(&clean)
            .map(|m| m.as_str().to_lowercase())
            .collect();

        let address_hints = ADDR_RE
            .find_iter(query)
            .map(|m| canonical_address(m.as_str()).unwrap_or_else(|| m.as_str().to_string()))
            .collect();

        let peripheral_hints: BTreeSet<&str> = tokens
            .iter()
            .flat_map(|t| peripheral_triggers(t).iter().copied())
            .collect();

        let register_hints: BTreeSet<&str> = TOKEN_RE
            .find_iter(query)
            .map(|m| m.as_str())
            .filter(|t| REG_HINT_RE.is_match(t))
            .collect();

        let mut info = QueryInfo {
            raw: query.to_string(),
            clean: clean.clone(),
            peripheral_hints: peripheral_hints.into_iter().map(String::from).collect(),
            register_hints: register_hints.into_iter().map(String::from).collect(),
            address_hints,
            tokens,
            peripheral_penalties: Vec::new(),
        };
        info.peripheral_penalties = penalties_for(&info);

        tracing::debug!(
            tokens = info.tokens.len(),
            peripherals = ?info.peripheral_hints,
            registers = ?info.register_hints,
            addresses = ?info.address_hints,
            penalties = ?info.peripheral_penalties,
            "Preprocessed query"
        );
        info
    }
}

/// Peripheral prefixes the query implicitly rules out.
fn penalties_for(info: &QueryInfo) -> Vec<String> {
    let mut penalties: BTreeSet<&str> = BTreeSet::new();
    let timer = info.has_token("timer") || info.has_token("tim");
    let usb = info.has_token("usb");

    if info.has_token("dma") && !usb {
        penalties.extend(USB_PREFIXES);
    }
    if timer && !info.has_token("systick") {
        penalties.extend(SYSTICK_PREFIXES);
    }
    if timer || info.has_token("prescaler") {
        penalties.extend(WATCHDOG_PREFIXES);
    }
    if info.has_token("i2c") && !usb {
        penalties.extend(USB_I2C_PREFIXES);
    }
    penalties.into_iter().map(String::from).collect()
}

#[cfg(test)]
#[path = "preprocessor.test.rs"]
mod tests;
