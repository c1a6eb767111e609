//! Alert dispatch gated by the notification cache.

use crate::cache::{CacheError, CacheStats, NotificationCache};
use crate::telegram::{format_alert_message, AlertChannel};
use pendle_core::{AnalysisResult, Chain};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

/// What happened to one batch of alerting markets.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    /// Markets included in a successfully delivered message.
    pub sent: usize,
    /// Market names suppressed by an active cache entry.
    pub suppressed: Vec<String>,
}

/// Sends alerts for markets not suppressed by the cache, and records only
/// successfully delivered alerts back into it.
pub struct Notifier {
    chain: Chain,
    channel: Option<Arc<dyn AlertChannel>>,
    cache: Mutex<NotificationCache>,
    ttl_hours: i64,
}

impl Notifier {
    pub fn new(
        chain: Chain,
        channel: Option<Arc<dyn AlertChannel>>,
        cache: NotificationCache,
        ttl_hours: i64,
    ) -> Self {
        if channel.is_none() {
            warn!("no notification channel configured, alerts will be logged only");
        }
        Self {
            chain,
            channel,
            cache: Mutex::new(cache),
            ttl_hours,
        }
    }

    /// Dispatch alerts for the given alerting markets. Cache-suppressed
    /// markets are excluded and their entries left untouched; a delivery
    /// failure is logged and caches nothing, so those markets stay eligible
    /// on the next run.
    pub async fn dispatch(&self, alerting: &[AnalysisResult]) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if alerting.is_empty() {
            debug!(chain = %self.chain, "no alerting markets, nothing to dispatch");
            return outcome;
        }

        let to_notify: Vec<&AnalysisResult> = {
            let cache = self.cache.lock().expect("cache lock poisoned");
            let (suppressed, fresh): (Vec<_>, Vec<_>) = alerting
                .iter()
                .partition(|a| cache.is_active(self.chain, &a.market.normalized_address()));
            outcome.suppressed = suppressed.iter().map(|a| a.market.name.clone()).collect();
            fresh
        };

        if !outcome.suppressed.is_empty() {
            info!(
                chain = %self.chain,
                suppressed = outcome.suppressed.len(),
                markets = ?outcome.suppressed,
                "skipping markets inside the notification window"
            );
        }
        if to_notify.is_empty() {
            info!(chain = %self.chain, "all alerting markets are within the cache window");
            return outcome;
        }

        let Some(channel) = &self.channel else {
            warn!(
                chain = %self.chain,
                markets = to_notify.len(),
                "alerts not dispatched: channel unconfigured"
            );
            return outcome;
        };

        let message = format_alert_message(self.chain, &to_notify, outcome.suppressed.len());
        match channel.send(&message).await {
            Ok(()) => {
                let mut cache = self.cache.lock().expect("cache lock poisoned");
                for analysis in &to_notify {
                    cache.record(
                        self.chain,
                        &analysis.market.normalized_address(),
                        &analysis.market.name,
                        self.ttl_hours,
                    );
                }
                outcome.sent = to_notify.len();
                info!(chain = %self.chain, sent = outcome.sent, "alerts dispatched and cached");
            }
            Err(err) => {
                // Not cached: these markets remain eligible next run.
                error!(chain = %self.chain, error = %err, "failed to dispatch alerts");
            }
        }
        outcome
    }

    /// Purge expired entries and persist the cache. Returns the purge count.
    pub fn purge_and_persist(&self) -> Result<usize, CacheError> {
        let mut cache = self.cache.lock().expect("cache lock poisoned");
        let purged = cache.purge_expired();
        cache.persist()?;
        Ok(purged)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().expect("cache lock poisoned").stats()
    }

    /// Timestamp of a market's cache entry, if present.
    pub fn recorded_at(&self, address: &str) -> Option<chrono::DateTime<chrono::Utc>> {
        self.cache
            .lock()
            .expect("cache lock poisoned")
            .recorded_at(self.chain, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::NotificationError;
    use async_trait::async_trait;
    use pendle_core::Market;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockChannel {
        fail: AtomicBool,
        sent: Mutex<Vec<String>>,
    }

    impl MockChannel {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fail: AtomicBool::new(fail),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl AlertChannel for MockChannel {
        async fn send(&self, text: &str) -> Result<(), NotificationError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(NotificationError::Api(502));
            }
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn alerting(name: &str, address: &str) -> AnalysisResult {
        let market = Market {
            name: name.to_string(),
            address: address.to_string(),
            expiry: "2026-12-26T00:00:00Z".parse().unwrap(),
            pt: String::new(),
            yt: String::new(),
            sy: String::new(),
            underlying_asset: String::new(),
        };
        AnalysisResult {
            alert_triggered: true,
            latest_daily_decline_rate: -5.0,
            average_decline_rate: -1.0,
            ..AnalysisResult::zeroed(market)
        }
    }

    fn notifier(channel: Option<Arc<dyn AlertChannel>>) -> (tempfile::TempDir, Notifier) {
        let dir = tempfile::tempdir().unwrap();
        let cache = NotificationCache::load(dir.path().join("cache.json"));
        (dir, Notifier::new(Chain::Ethereum, channel, cache, 24))
    }

    #[tokio::test]
    async fn test_successful_dispatch_records_cache() {
        let channel = MockChannel::new(false);
        let (_dir, notifier) = notifier(Some(channel.clone()));

        let outcome = notifier.dispatch(&[alerting("m1", "0xAAA")]).await;
        assert_eq!(outcome.sent, 1);
        assert!(notifier.recorded_at("0xaaa").is_some());
        assert_eq!(channel.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_dispatch_does_not_cache() {
        let channel = MockChannel::new(true);
        let (_dir, notifier) = notifier(Some(channel));

        let outcome = notifier.dispatch(&[alerting("m1", "0xaaa")]).await;
        assert_eq!(outcome.sent, 0);
        assert!(notifier.recorded_at("0xaaa").is_none());
    }

    #[tokio::test]
    async fn test_suppressed_market_not_sent_and_timestamp_unchanged() {
        let channel = MockChannel::new(false);
        let (_dir, notifier) = notifier(Some(channel.clone()));

        // First dispatch alerts and caches m1.
        notifier.dispatch(&[alerting("m1", "0xaaa")]).await;
        let first_ts = notifier.recorded_at("0xaaa").unwrap();

        // Second run: m1 suppressed, m2 goes out.
        let outcome = notifier
            .dispatch(&[alerting("m1", "0xaaa"), alerting("m2", "0xbbb")])
            .await;
        assert_eq!(outcome.sent, 1);
        assert_eq!(outcome.suppressed, vec!["m1".to_string()]);
        assert_eq!(notifier.recorded_at("0xaaa").unwrap(), first_ts);

        let messages = channel.sent.lock().unwrap();
        assert!(messages[1].contains("m2"));
        assert!(!messages[1].contains("Market #1:</b> m1"));
    }

    #[tokio::test]
    async fn test_unconfigured_channel_is_a_noop() {
        let (_dir, notifier) = notifier(None);
        let outcome = notifier.dispatch(&[alerting("m1", "0xaaa")]).await;
        assert_eq!(outcome.sent, 0);
        assert!(notifier.recorded_at("0xaaa").is_none());
    }
}
