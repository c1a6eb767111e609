//! Engine error types.

use pendle_feeds::UpstreamError;
use thiserror::Error;

/// Estimator invariant violations. Should not occur on well-formed input;
/// when one does, the orchestrator isolates the market instead of aborting
/// the batch.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("non-finite {field} computed for market {market}")]
    NonFinite {
        field: &'static str,
        market: String,
    },
}

/// Fatal failure of a whole chain run. Per-market failures never surface
/// here; only the initial market listing can end a run this way.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to list active markets: {0}")]
    Listing(#[from] UpstreamError),
}
