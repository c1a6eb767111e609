//! Core data types for the Pendle market monitor.

pub mod analysis;
pub mod chain;
pub mod market;
pub mod transaction;

pub use analysis::*;
pub use chain::*;
pub use market::*;
pub use transaction::*;
