//! Monitor configuration.

use pendle_engine::OrchestratorConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Per-process settings, assembled from CLI flags and environment.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Notification cache file path.
    pub cache_file: PathBuf,
    /// How long a sent alert suppresses repeats, in hours.
    pub ttl_hours: i64,
    /// Markets analyzed per chain per run.
    pub markets_per_run: usize,
    /// Wall-clock ceiling for one chain run.
    pub run_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from("notification_cache.json"),
            ttl_hours: 24,
            markets_per_run: 10,
            run_timeout: Duration::from_secs(300),
        }
    }
}

impl MonitorConfig {
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            markets_per_run: self.markets_per_run,
            run_timeout: Some(self.run_timeout),
            ..OrchestratorConfig::default()
        }
    }
}
