//! Search algorithm constants.

/// Default RRF (Reciprocal Rank Fusion) k parameter.
///
/// Formula: score = 1 / (rank + k), rank starting at 1.
pub const DEFAULT_RRF_K: f32 = 60.0;

/// Peripheral family prefixes, matched first to last.
///
/// `USART` precedes `UART` so `USART1` resolves to its own family.
pub const PERIPHERAL_FAMILIES: &[&str] = &[
    "USART", "UART", "GPIO", "SPI", "I2C", "TIM", "RCC", "ADC", "DAC", "DMA", "CAN", "USB", "OTG",
];

/// Reranked candidates kept per requested result, ahead of the final penalty pass.
pub const RERANK_KEEP_FACTOR: usize = 2;

#[cfg(test)]
#[path = "constants.test.rs"]
mod tests;
