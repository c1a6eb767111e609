//! Analysis engine for the Pendle market monitor.
//!
//! This crate contains the per-market risk estimator and the orchestrator
//! that runs a whole chain end-to-end with bounded concurrency.

pub mod error;
pub mod estimator;
pub mod orchestrator;
pub mod report;

pub use error::{AnalysisError, RunError};
pub use estimator::analyze;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use report::RunReport;
