//! Time-windowed cache of sent notifications.
//!
//! The only state that survives across runs. Losing the file merely causes
//! re-notification, so load failures degrade to an empty cache instead of
//! aborting the run; persisting goes through a temp-file rename so a crash
//! mid-write cannot corrupt it.

use chrono::{DateTime, Duration, Utc};
use pendle_core::Chain;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One sent-alert record, keyed externally by `"{chain_id}:{address}"`.
/// Extra unknown fields in the file are tolerated on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub market_address: String,
    pub chain_id: u64,
    pub market_name: String,
    pub timestamp: DateTime<Utc>,
    pub cache_duration_hours: i64,
}

impl CacheEntry {
    fn is_active(&self, now: DateTime<Utc>) -> bool {
        now - self.timestamp < Duration::hours(self.cache_duration_hours)
    }
}

/// Active/expired entry counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub active: usize,
    pub expired: usize,
}

/// Persistent map of recently notified markets.
#[derive(Debug)]
pub struct NotificationCache {
    path: PathBuf,
    entries: HashMap<String, CacheEntry>,
}

fn cache_key(chain: Chain, address: &str) -> String {
    format!("{}:{}", chain.id(), address.to_lowercase())
}

impl NotificationCache {
    /// Load the cache from `path`. A missing or unreadable file is not
    /// fatal; it degrades to an empty cache with a warning.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<HashMap<String, CacheEntry>>(&raw) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err,
                        "notification cache is malformed, starting empty");
                    HashMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                warn!(path = %path.display(), error = %err,
                    "failed to read notification cache, starting empty");
                HashMap::new()
            }
        };
        debug!(path = %path.display(), entries = entries.len(), "loaded notification cache");
        Self { path, entries }
    }

    /// True iff an unexpired entry exists for this market.
    pub fn is_active(&self, chain: Chain, address: &str) -> bool {
        self.is_active_at(chain, address, Utc::now())
    }

    fn is_active_at(&self, chain: Chain, address: &str, now: DateTime<Utc>) -> bool {
        self.entries
            .get(&cache_key(chain, address))
            .is_some_and(|entry| entry.is_active(now))
    }

    /// Timestamp of the entry for this market, if any. Used to verify that
    /// suppression never refreshes an entry.
    pub fn recorded_at(&self, chain: Chain, address: &str) -> Option<DateTime<Utc>> {
        self.entries
            .get(&cache_key(chain, address))
            .map(|entry| entry.timestamp)
    }

    /// Upsert an entry for a just-delivered alert.
    pub fn record(&mut self, chain: Chain, address: &str, market_name: &str, ttl_hours: i64) {
        self.record_at(chain, address, market_name, ttl_hours, Utc::now());
    }

    fn record_at(
        &mut self,
        chain: Chain,
        address: &str,
        market_name: &str,
        ttl_hours: i64,
        now: DateTime<Utc>,
    ) {
        let key = cache_key(chain, address);
        self.entries.insert(
            key,
            CacheEntry {
                market_address: address.to_lowercase(),
                chain_id: chain.id(),
                market_name: market_name.to_string(),
                timestamp: now,
                cache_duration_hours: ttl_hours,
            },
        );
    }

    /// Remove entries whose age reached their own TTL. Returns how many
    /// were removed, for logging.
    pub fn purge_expired(&mut self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    fn purge_expired_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_active(now));
        let purged = before - self.entries.len();
        if purged > 0 {
            info!(purged, "purged expired notification cache entries");
        }
        purged
    }

    /// Entry counts without mutating state.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let active = self.entries.values().filter(|e| e.is_active(now)).count();
        CacheStats {
            active,
            expired: self.entries.len() - active,
        }
    }

    /// Remove all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the cache to disk atomically (temp file, then rename).
    pub fn persist(&self) -> Result<(), CacheError> {
        let serialized = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serialized)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
