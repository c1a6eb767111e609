//! Per-run analysis output for a single market.

use crate::Market;
use serde::Serialize;

/// Risk summary derived from one market's transaction history.
/// Computed fresh each run; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub market: Market,
    /// Observed or estimated yield-token price (0.0 when unavailable).
    pub current_yt_price: f64,
    /// Historical decline rate, percent per day.
    pub average_decline_rate: f64,
    /// Decline rate over the last 24 hours, percent per day.
    pub latest_daily_decline_rate: f64,
    /// Short-term decline measurably exceeds the historical trend.
    pub alert_triggered: bool,
    pub volume_usd: f64,
    pub average_implied_apy: f64,
    pub transaction_count: usize,
}

impl AnalysisResult {
    /// Degraded result substituted when ingestion fails for a market, so it
    /// still appears in the report instead of vanishing silently.
    pub fn zeroed(market: Market) -> Self {
        Self {
            market,
            current_yt_price: 0.0,
            average_decline_rate: 0.0,
            latest_daily_decline_rate: 0.0,
            alert_triggered: false,
            volume_usd: 0.0,
            average_implied_apy: 0.0,
            transaction_count: 0,
        }
    }
}
