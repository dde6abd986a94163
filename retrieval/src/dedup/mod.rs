//! Register deduplication.
//!
//! Two passes over the same register list:
//!
//! - **Exact**: drops records identical in device, instance, address and
//!   field layout. Never merges across devices or instances.
//! - **Generalized**: merges registers with the same family, name and field
//!   layout into one representative carrying an [`Aggregation`].
//!
//! [`Aggregation`]: crate::model::Aggregation

mod exact;
mod family;
mod generalized;

pub use exact::dedup_exact;
pub use exact::exact_key;
pub use family::device_family_label;
pub use family::family_from_names;
pub use generalized::FamilyKey;
pub use generalized::dedup_generalized;
pub use generalized::family_key;

use serde::Serialize;

use crate::config::DedupConfig;
use crate::config::DedupMode;
use crate::model::Register;

/// Counts for one deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DedupReport {
    pub before: usize,
    pub after: usize,
    /// Size of the largest group collapsed into one record.
    pub max_group_size: usize,
}

impl DedupReport {
    pub fn removed(&self) -> usize {
        self.before - self.after
    }

    /// Percentage of records removed.
    pub fn reduction_pct(&self) -> f64 {
        if self.before == 0 {
            return 0.0;
        }
        self.removed() as f64 * 100.0 / self.before as f64
    }
}

/// Run the passes selected by `config.mode`.
///
/// Returns the surviving records and one report per pass that ran.
pub fn deduplicate(
    registers: Vec<Register>,
    config: &DedupConfig,
) -> (Vec<Register>, Vec<DedupReport>) {
    match config.mode {
        DedupMode::None => (registers, Vec::new()),
        DedupMode::Exact => {
            let (registers, report) = dedup_exact(registers);
            (registers, vec![report])
        }
        DedupMode::Generalized => {
            let (registers, report) = dedup_generalized(registers, config.fallback_prefix_len);
            (registers, vec![report])
        }
        DedupMode::ExactThenGeneralized => {
            let (registers, exact) = dedup_exact(registers);
            let (registers, generalized) =
                dedup_generalized(registers, config.fallback_prefix_len);
            (registers, vec![exact, generalized])
        }
    }
}

#[cfg(test)]
#[path = "mod.test.rs"]
mod tests;
