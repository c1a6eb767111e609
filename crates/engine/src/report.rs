//! Per-run summary.

use pendle_core::{AnalysisResult, Chain};
use serde::Serialize;

/// Summary of one chain run. Emitted on every completed run, even when
/// nothing alerted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub chain: Chain,
    /// Markets the upstream listing returned.
    pub active_markets: usize,
    /// Markets actually analyzed this run (the configured cap).
    pub analyzed: usize,
    pub stable: usize,
    pub alerting: usize,
    /// Alerting markets suppressed by the notification cache.
    pub suppressed: usize,
    /// Alerting markets included in a delivered notification.
    pub sent: usize,
    /// Expired cache entries removed at the end of the run.
    pub purged: usize,
    pub total_volume_usd: f64,
    pub mean_yt_price: f64,
}

impl RunReport {
    pub(crate) fn summarize(
        chain: Chain,
        active_markets: usize,
        results: &[AnalysisResult],
    ) -> Self {
        let alerting = results.iter().filter(|r| r.alert_triggered).count();
        let total_volume_usd = results.iter().map(|r| r.volume_usd).sum();
        let mean_yt_price = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.current_yt_price).sum::<f64>() / results.len() as f64
        };
        Self {
            chain,
            active_markets,
            analyzed: results.len(),
            stable: results.len() - alerting,
            alerting,
            suppressed: 0,
            sent: 0,
            purged: 0,
            total_volume_usd,
            mean_yt_price,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} active, {} analyzed ({} stable / {} alerting, {} suppressed, {} sent), \
             volume ${:.0}, mean YT price {:.4}, {} cache entries purged",
            self.chain,
            self.active_markets,
            self.analyzed,
            self.stable,
            self.alerting,
            self.suppressed,
            self.sent,
            self.total_volume_usd,
            self.mean_yt_price,
            self.purged,
        )
    }
}
