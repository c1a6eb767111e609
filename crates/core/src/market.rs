//! Market data as returned by the active-markets endpoint.

use crate::Chain;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A Pendle market. Immutable once fetched; refreshed each run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Market {
    #[serde(default)]
    pub name: String,
    pub address: String,
    pub expiry: DateTime<Utc>,
    // Token addresses, kept for display only.
    #[serde(default)]
    pub pt: String,
    #[serde(default)]
    pub yt: String,
    #[serde(default)]
    pub sy: String,
    #[serde(default)]
    pub underlying_asset: String,
}

impl Market {
    /// Address normalized to lowercase. Every cache and dedup key is built
    /// from this form so mixed-case upstream addresses collide correctly.
    pub fn normalized_address(&self) -> String {
        self.address.to_lowercase()
    }

    /// Cache key for this market on the given chain.
    pub fn cache_key(&self, chain: Chain) -> String {
        format!("{}:{}", chain.id(), self.normalized_address())
    }

    /// Years from `now` until this market's expiry. Negative once expired.
    pub fn years_until_expiry(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (self.expiry - now).num_seconds() as f64;
        seconds / (365.25 * 24.0 * 3600.0)
    }

    /// Link to the YT swap page for this market.
    pub fn trade_url(&self) -> String {
        format!(
            "https://app.pendle.finance/trade/markets/{}/swap?view=yt",
            self.address
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn market(address: &str) -> Market {
        Market {
            name: "stETH 26DEC2024".to_string(),
            address: address.to_string(),
            expiry: "2026-12-26T00:00:00Z".parse().unwrap(),
            pt: String::new(),
            yt: String::new(),
            sy: String::new(),
            underlying_asset: String::new(),
        }
    }

    #[test]
    fn test_cache_key_is_case_normalized() {
        let upper = market("0xABCDEF0123");
        let lower = market("0xabcdef0123");
        assert_eq!(
            upper.cache_key(Chain::Ethereum),
            lower.cache_key(Chain::Ethereum)
        );
        assert_eq!(upper.cache_key(Chain::Ethereum), "1:0xabcdef0123");
    }

    #[test]
    fn test_deserializes_upstream_shape() {
        let json = r#"{
            "name": "eETH",
            "address": "0x123",
            "expiry": "2026-06-25T00:00:00.000Z",
            "pt": "0xp", "yt": "0xy", "sy": "0xs",
            "underlyingAsset": "0xu",
            "somethingNew": 42
        }"#;
        let market: Market = serde_json::from_str(json).unwrap();
        assert_eq!(market.underlying_asset, "0xu");
        assert_eq!(market.name, "eETH");
    }

    #[test]
    fn test_years_until_expiry() {
        let m = market("0x1");
        let now: DateTime<Utc> = "2025-12-26T00:00:00Z".parse().unwrap();
        let years = m.years_until_expiry(now);
        assert!((years - 1.0).abs() < 0.01);
    }
}
