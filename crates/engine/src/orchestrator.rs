//! Chain run orchestration.
//!
//! Drives one chain end-to-end: list markets, analyze a bounded subset
//! with a small concurrency pool, classify, dispatch alerts through the
//! cache-gated notifier, persist the cache, and report.

use crate::error::RunError;
use crate::estimator;
use crate::report::RunReport;
use futures_util::future::join_all;
use pendle_alerts::Notifier;
use pendle_core::{AnalysisResult, Chain, Market};
use pendle_feeds::MarketSource;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Rate-limit shape of one run. The upstream API throttles aggressively,
/// so analysis runs in small batches with a pause between them.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// How many of the listed markets to analyze per run.
    pub markets_per_run: usize,
    /// Markets analyzed concurrently within a batch.
    pub max_concurrent: usize,
    /// Fixed pause between batches.
    pub batch_delay: Duration,
    /// Random extra pause added to `batch_delay`, up to this many ms.
    pub batch_jitter_ms: u64,
    /// Wall-clock ceiling for the analysis phase. When it passes, pending
    /// network waits are abandoned and the run reports what completed.
    pub run_timeout: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            markets_per_run: 10,
            max_concurrent: 2,
            batch_delay: Duration::from_secs(5),
            batch_jitter_ms: 2000,
            run_timeout: None,
        }
    }
}

pub struct Orchestrator {
    chain: Chain,
    source: Arc<dyn MarketSource>,
    notifier: Notifier,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        chain: Chain,
        source: Arc<dyn MarketSource>,
        notifier: Notifier,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chain,
            source,
            notifier,
            config,
        }
    }

    /// Run the chain once. Only a market-listing failure is fatal; every
    /// per-market failure degrades to a zeroed result in the report.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let markets = self.source.list_active_markets().await?;
        info!(chain = %self.chain, markets = markets.len(), "listed active markets");

        let selected: Vec<Market> = markets
            .iter()
            .take(self.config.markets_per_run)
            .cloned()
            .collect();

        let deadline = self
            .config
            .run_timeout
            .map(|timeout| tokio::time::Instant::now() + timeout);
        let mut results: Vec<AnalysisResult> = Vec::with_capacity(selected.len());
        let batches: Vec<&[Market]> = selected.chunks(self.config.max_concurrent).collect();
        let batch_count = batches.len();
        for (i, batch) in batches.into_iter().enumerate() {
            let analyses = join_all(batch.iter().map(|m| self.analyze_market(m)));
            let analyses = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, analyses).await {
                    Ok(analyses) => analyses,
                    Err(_) => {
                        warn!(
                            chain = %self.chain,
                            analyzed = results.len(),
                            remaining = selected.len() - results.len(),
                            "run deadline reached, reporting what completed"
                        );
                        break;
                    }
                },
                None => analyses.await,
            };
            results.extend(analyses);
            if i + 1 < batch_count {
                tokio::time::sleep(self.batch_pause()).await;
            }
        }

        let mut report = RunReport::summarize(self.chain, markets.len(), &results);

        let alerting: Vec<AnalysisResult> = results
            .into_iter()
            .filter(|r| r.alert_triggered)
            .collect();
        let outcome = self.notifier.dispatch(&alerting).await;
        report.suppressed = outcome.suppressed.len();
        report.sent = outcome.sent;

        match self.notifier.purge_and_persist() {
            Ok(purged) => report.purged = purged,
            Err(err) => error!(chain = %self.chain, error = %err, "failed to persist cache"),
        }

        info!(chain = %self.chain, %report, "run complete");
        Ok(report)
    }

    /// Ingest and estimate one market. Any failure degrades to a zeroed
    /// result so the market still shows up in the report.
    async fn analyze_market(&self, market: &Market) -> AnalysisResult {
        let txs = match self
            .source
            .list_transactions(&market.normalized_address())
            .await
        {
            Ok(txs) => txs,
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    market = %market.name,
                    error = %err,
                    "transaction ingestion failed, reporting zeroed result"
                );
                return AnalysisResult::zeroed(market.clone());
            }
        };
        match estimator::analyze(market.clone(), &txs) {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    chain = %self.chain,
                    market = %market.name,
                    error = %err,
                    "analysis failed, reporting zeroed result"
                );
                AnalysisResult::zeroed(market.clone())
            }
        }
    }

    fn batch_pause(&self) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..=self.config.batch_jitter_ms);
        self.config.batch_delay + Duration::from_millis(jitter)
    }
}
