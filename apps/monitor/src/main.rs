//! Pendle Watch - Market Decline Monitor
//!
//! Polls the Pendle v2 API for active markets, estimates yield-token
//! decline rates, and sends deduplicated Telegram alerts when a market's
//! short-term decline outpaces its historical trend.

mod config;

use clap::Parser;
use config::MonitorConfig;
use pendle_alerts::{AlertChannel, Notifier, NotificationCache, TelegramChannel};
use pendle_core::Chain;
use pendle_engine::Orchestrator;
use pendle_feeds::PendleClient;
use rand::Rng;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Pause between chains in all-chains mode, plus random jitter, to avoid
/// hammering the API with back-to-back chain scans.
const CHAIN_PAUSE_SECS: u64 = 10;
const CHAIN_PAUSE_JITTER_SECS: u64 = 5;

/// Pendle Watch CLI
#[derive(Parser, Debug)]
#[command(name = "pendle-watch")]
#[command(about = "Pendle YT decline-rate monitor", long_about = None)]
struct Args {
    /// Chain id to monitor (e.g. 1, 42161), or "all"
    #[arg(default_value = "all")]
    chain: String,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Notification cache file
    #[arg(long, default_value = "notification_cache.json")]
    cache_file: PathBuf,

    /// Alert suppression window in hours
    #[arg(long, default_value_t = 24)]
    ttl_hours: i64,

    /// Markets analyzed per chain per run
    #[arg(long, default_value_t = 10)]
    markets: usize,

    /// Wall-clock ceiling per chain run, in seconds
    #[arg(long, default_value_t = 300)]
    timeout_secs: u64,
}

impl Args {
    fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            cache_file: self.cache_file.clone(),
            ttl_hours: self.ttl_hours,
            markets_per_run: self.markets,
            run_timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn init_logging(level: &str) {
    let level = match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Run one chain end-to-end. The orchestrator enforces the wall-clock
/// ceiling itself and reports whatever completed before it. Returns
/// whether the run completed.
async fn run_chain(
    chain: Chain,
    config: &MonitorConfig,
    channel: Option<Arc<dyn AlertChannel>>,
) -> bool {
    info!(%chain, "starting chain run");

    let cache = NotificationCache::load(&config.cache_file);
    let notifier = Notifier::new(chain, channel, cache, config.ttl_hours);
    let source = Arc::new(PendleClient::new(chain));
    let orchestrator = Orchestrator::new(chain, source, notifier, config.orchestrator_config());

    match orchestrator.run().await {
        Ok(report) => {
            info!(%report, "chain run finished");
            true
        }
        Err(err) => {
            error!(%chain, error = %err, "chain run failed");
            false
        }
    }
}

fn chain_pause() -> Duration {
    let jitter = rand::thread_rng().gen_range(0..=CHAIN_PAUSE_JITTER_SECS);
    Duration::from_secs(CHAIN_PAUSE_SECS + jitter)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    // .env is optional; real environments set the variables directly.
    dotenvy::dotenv().ok();

    let channel: Option<Arc<dyn AlertChannel>> = match TelegramChannel::from_env() {
        Some(telegram) => Some(Arc::new(telegram)),
        None => {
            warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set, alerts will be logged only");
            None
        }
    };

    let config = args.monitor_config();

    if args.chain == "all" {
        let mut completed = Vec::new();
        let mut failed = Vec::new();
        for (i, &chain) in Chain::all().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(chain_pause()).await;
            }
            if run_chain(chain, &config, channel.clone()).await {
                completed.push(chain.name());
            } else {
                failed.push(chain.name());
            }
        }
        info!(
            completed = completed.len(),
            failed = failed.len(),
            failed_chains = ?failed,
            "all chains processed"
        );
        if completed.is_empty() {
            error!("every chain run failed");
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        }
    } else {
        let chain = match args.chain.parse::<u64>().ok().and_then(Chain::from_id) {
            Some(chain) => chain,
            None => {
                error!(chain = %args.chain, "unknown chain id");
                return ExitCode::FAILURE;
            }
        };
        if run_chain(chain, &config, channel).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
