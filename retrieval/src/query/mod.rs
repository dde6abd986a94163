//! Query understanding.
//!
//! Turns a free-text question into a [`QueryInfo`] of hints consumed by the
//! store filter and the ranking engine.

mod preprocessor;

pub use preprocessor::QueryInfo;
pub use preprocessor::QueryPreprocessor;
pub use preprocessor::peripheral_triggers;
