//! Transaction records from the paginated history endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Action tags identifying a yield-token swap. `SWAP_PY` trades move the
/// PT/YT pair and price the yield leg just like a direct `SWAP_YT`.
pub const ACTION_SWAP_YT: &str = "SWAP_YT";
pub const ACTION_SWAP_PY: &str = "SWAP_PY";

/// USD valuation as the API nests it: `{"valuation": {"usd": 123.4}}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Valuation {
    #[serde(default)]
    pub usd: Option<f64>,
}

/// A single market transaction.
///
/// `value` and `implied_apy` are both optional on the wire; a transaction
/// carrying neither is immaterial to analysis and gets dropped at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, rename = "impliedApy")]
    pub implied_apy: Option<f64>,
    // Older payloads carried a flat `valuation_usd` instead of the nested
    // object; accept both and let `valuation_usd()` pick whichever is set.
    #[serde(default)]
    pub valuation: Option<Valuation>,
    #[serde(default)]
    pub valuation_usd: Option<f64>,
}

impl Transaction {
    /// USD valuation, nested form preferred over the flat field.
    pub fn valuation_usd(&self) -> Option<f64> {
        self.valuation.and_then(|v| v.usd).or(self.valuation_usd)
    }

    /// A transaction with neither a value nor an implied APY carries no
    /// signal for the estimator.
    pub fn is_material(&self) -> bool {
        self.value.is_some() || self.implied_apy.is_some()
    }

    /// True for yield-token swaps (`SWAP_YT` or `SWAP_PY` actions) with a
    /// usable positive price.
    pub fn is_priced_yield_swap(&self) -> bool {
        let is_yield_swap =
            self.action.contains(ACTION_SWAP_YT) || self.action.contains(ACTION_SWAP_PY);
        is_yield_swap && self.value.is_some_and(|v| v > 0.0)
    }
}
