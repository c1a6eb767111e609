//! Per-market risk estimation.
//!
//! Pure computation over a market and its transaction history. The only
//! ambient input is "now", read once per analysis for age calculations.

use crate::error::AnalysisError;
use chrono::{DateTime, Duration, Utc};
use pendle_core::{AnalysisResult, Market, Transaction};

/// Value band accepted as a direct YT price observation.
const PRICE_BAND_MIN: f64 = 0.001;
const PRICE_BAND_MAX: f64 = 5.0;

/// Floor on years-to-expiry in the APY-discount price estimate, so markets
/// at or past expiry do not blow the exponent up.
const MIN_EXPIRY_YEARS: f64 = 0.1;

/// Window for the short-term decline rate.
const RECENT_WINDOW_HOURS: i64 = 24;

/// Transactions considered by the coarse decline fallback.
const COARSE_FALLBACK_LEN: usize = 5;

/// Relative tolerance in the alert predicate. The short-term rate must
/// exceed the historical one measurably, not merely match it after
/// floating-point noise.
const ALERT_TOLERANCE: f64 = 1e-5;

const SECONDS_PER_DAY: f64 = 86_400.0;
const SECONDS_PER_HOUR: f64 = 3_600.0;

/// One way of reading a YT price out of the transaction set.
type PriceStrategy = fn(&Market, &[Transaction], DateTime<Utc>) -> Option<f64>;

/// Candidate strategies in priority order; the first that yields a value
/// wins. An empty yield means "price unavailable", reported as 0.
const PRICE_STRATEGIES: &[PriceStrategy] = &[
    latest_yield_swap_price,
    latest_banded_value,
    apy_discounted_price,
];

/// Most recent yield-token swap with a positive traded value.
fn latest_yield_swap_price(_: &Market, txs: &[Transaction], _: DateTime<Utc>) -> Option<f64> {
    txs.iter()
        .filter(|tx| tx.is_priced_yield_swap())
        .max_by_key(|tx| tx.timestamp)
        .and_then(|tx| tx.value)
}

/// Most recent transaction whose value sits in the plausible YT price band.
fn latest_banded_value(_: &Market, txs: &[Transaction], _: DateTime<Utc>) -> Option<f64> {
    txs.iter()
        .filter(|tx| {
            tx.value
                .is_some_and(|v| v > PRICE_BAND_MIN && v < PRICE_BAND_MAX)
        })
        .max_by_key(|tx| tx.timestamp)
        .and_then(|tx| tx.value)
}

/// Discount the most recent positive implied APY over the remaining term:
/// `1 / (1 + apy)^T` with T floored at [`MIN_EXPIRY_YEARS`].
fn apy_discounted_price(market: &Market, txs: &[Transaction], now: DateTime<Utc>) -> Option<f64> {
    let apy = txs
        .iter()
        .filter(|tx| tx.implied_apy.is_some_and(|a| a > 0.0))
        .max_by_key(|tx| tx.timestamp)
        .and_then(|tx| tx.implied_apy)?;
    let years = market.years_until_expiry(now).max(MIN_EXPIRY_YEARS);
    Some(1.0 / (1.0 + apy).powf(years))
}

fn estimate_price(market: &Market, txs: &[Transaction], now: DateTime<Utc>) -> f64 {
    PRICE_STRATEGIES
        .iter()
        .find_map(|strategy| strategy(market, txs, now))
        .unwrap_or(0.0)
}

/// Historical decline rate in percent per day, from the full span of
/// APY-bearing transactions. When that span is degenerate (fewer than two
/// points, or zero elapsed time) the coarse fallback kicks in: the
/// first-to-last APY difference over the last few transactions, with no
/// time normalization. The units differ from the primary path; that is the
/// established behavior and downstream thresholds are tuned to it.
fn average_decline_rate(txs: &[Transaction]) -> f64 {
    let mut with_apy: Vec<&Transaction> =
        txs.iter().filter(|tx| tx.implied_apy.is_some()).collect();
    with_apy.sort_by_key(|tx| tx.timestamp);

    let mut rate = 0.0;
    if let (Some(first), Some(last)) = (with_apy.first(), with_apy.last()) {
        let span_days =
            (last.timestamp - first.timestamp).num_seconds() as f64 / SECONDS_PER_DAY;
        if with_apy.len() >= 2 && span_days > 0.0 {
            if let (Some(a0), Some(a1)) = (first.implied_apy, last.implied_apy) {
                rate = (a1 - a0) / span_days * 100.0;
            }
        }
    }

    if rate == 0.0 && txs.len() >= 2 {
        rate = coarse_decline_rate(txs);
    }
    rate
}

fn coarse_decline_rate(txs: &[Transaction]) -> f64 {
    let mut ordered: Vec<&Transaction> = txs.iter().collect();
    ordered.sort_by_key(|tx| tx.timestamp);
    let tail = &ordered[ordered.len().saturating_sub(COARSE_FALLBACK_LEN)..];
    let apys: Vec<f64> = tail.iter().filter_map(|tx| tx.implied_apy).collect();
    match (apys.first(), apys.last()) {
        (Some(first), Some(last)) if apys.len() >= 2 => (last - first) * 100.0,
        _ => 0.0,
    }
}

/// Decline rate over the last 24 hours, extrapolated to percent per day.
fn latest_daily_decline_rate(txs: &[Transaction], now: DateTime<Utc>) -> f64 {
    let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
    let mut recent: Vec<&Transaction> = txs
        .iter()
        .filter(|tx| tx.implied_apy.is_some() && tx.timestamp >= cutoff)
        .collect();
    recent.sort_by_key(|tx| std::cmp::Reverse(tx.timestamp));

    let (Some(newest), Some(oldest)) = (recent.first(), recent.last()) else {
        return 0.0;
    };
    let span_hours =
        (newest.timestamp - oldest.timestamp).num_seconds() as f64 / SECONDS_PER_HOUR;
    if recent.len() < 2 || span_hours <= 0.0 {
        return 0.0;
    }
    match (newest.implied_apy, oldest.implied_apy) {
        (Some(new_apy), Some(old_apy)) => (new_apy - old_apy) / span_hours * 24.0 * 100.0,
        _ => 0.0,
    }
}

/// Strict magnitude comparison behind `alert_triggered`.
fn exceeds_trend(latest: f64, average: f64) -> bool {
    latest.abs() > average.abs() * (1.0 + ALERT_TOLERANCE)
}

/// Analyze one market's transaction history into a risk summary.
pub fn analyze(market: Market, txs: &[Transaction]) -> Result<AnalysisResult, AnalysisError> {
    analyze_at(market, txs, Utc::now())
}

fn analyze_at(
    market: Market,
    txs: &[Transaction],
    now: DateTime<Utc>,
) -> Result<AnalysisResult, AnalysisError> {
    let current_yt_price = estimate_price(&market, txs, now);
    let average_decline = average_decline_rate(txs);
    let latest_decline = latest_daily_decline_rate(txs, now);

    let volume_usd: f64 = txs.iter().filter_map(|tx| tx.valuation_usd()).sum();
    let apys: Vec<f64> = txs.iter().filter_map(|tx| tx.implied_apy).collect();
    let average_implied_apy = if apys.is_empty() {
        0.0
    } else {
        apys.iter().sum::<f64>() / apys.len() as f64
    };

    for (field, value) in [
        ("current_yt_price", current_yt_price),
        ("average_decline_rate", average_decline),
        ("latest_daily_decline_rate", latest_decline),
        ("volume_usd", volume_usd),
        ("average_implied_apy", average_implied_apy),
    ] {
        if !value.is_finite() {
            return Err(AnalysisError::NonFinite {
                field,
                market: market.name.clone(),
            });
        }
    }

    Ok(AnalysisResult {
        market,
        current_yt_price,
        average_decline_rate: average_decline,
        latest_daily_decline_rate: latest_decline,
        alert_triggered: exceeds_trend(latest_decline, average_decline),
        volume_usd,
        average_implied_apy,
        transaction_count: txs.len(),
    })
}
