//! Trait seam between ingestion and the orchestrator.

use crate::UpstreamError;
use async_trait::async_trait;
use pendle_core::{Market, Transaction};

/// Upstream source of markets and their transaction histories.
///
/// `PendleClient` is the production implementation; tests drive the
/// orchestrator with synthetic sources.
#[async_trait]
pub trait MarketSource: Send + Sync {
    /// List currently active markets for this source's chain.
    async fn list_active_markets(&self) -> Result<Vec<Market>, UpstreamError>;

    /// Fetch the deduplicated transaction history for one market.
    /// A partial history is an accepted degradation; an `Err` means
    /// retrieval failed entirely.
    async fn list_transactions(
        &self,
        market_address: &str,
    ) -> Result<Vec<Transaction>, UpstreamError>;
}
