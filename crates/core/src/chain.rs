//! Pendle chain identifiers and utilities.

use serde::{Deserialize, Serialize};

/// Blockchain network identifier.
/// Discriminants match the chain ids the Pendle API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum Chain {
    Ethereum = 1,
    Optimism = 10,
    BnbChain = 56,
    Sonic = 146,
    HyperEvm = 999,
    Mantle = 5000,
    Base = 8453,
    Plasma = 9745,
    Arbitrum = 42161,
    Berachain = 80094,
}

impl Chain {
    /// Create Chain from its numeric chain id.
    pub fn from_id(id: u64) -> Option<Self> {
        match id {
            1 => Some(Chain::Ethereum),
            10 => Some(Chain::Optimism),
            56 => Some(Chain::BnbChain),
            146 => Some(Chain::Sonic),
            999 => Some(Chain::HyperEvm),
            5000 => Some(Chain::Mantle),
            8453 => Some(Chain::Base),
            9745 => Some(Chain::Plasma),
            42161 => Some(Chain::Arbitrum),
            80094 => Some(Chain::Berachain),
            _ => None,
        }
    }

    /// Get the numeric chain id.
    #[inline]
    pub fn id(self) -> u64 {
        self as u64
    }

    /// Human-readable network name.
    pub fn name(self) -> &'static str {
        match self {
            Chain::Ethereum => "Ethereum",
            Chain::Optimism => "Optimism",
            Chain::BnbChain => "BNB Smart Chain",
            Chain::Sonic => "Sonic",
            Chain::HyperEvm => "Hyper EVM",
            Chain::Mantle => "Mantle",
            Chain::Base => "Base",
            Chain::Plasma => "Plasma",
            Chain::Arbitrum => "Arbitrum One",
            Chain::Berachain => "Berachain",
        }
    }

    /// Get all supported chains.
    pub fn all() -> &'static [Chain] {
        &[
            Chain::Ethereum,
            Chain::Optimism,
            Chain::BnbChain,
            Chain::Sonic,
            Chain::HyperEvm,
            Chain::Mantle,
            Chain::Base,
            Chain::Plasma,
            Chain::Arbitrum,
            Chain::Berachain,
        ]
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (ID: {})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_from_id() {
        assert_eq!(Chain::from_id(1), Some(Chain::Ethereum));
        assert_eq!(Chain::from_id(42161), Some(Chain::Arbitrum));
        assert_eq!(Chain::from_id(8453), Some(Chain::Base));
        // Unknown id should return None
        assert_eq!(Chain::from_id(1337), None);
    }

    #[test]
    fn test_chain_to_id() {
        assert_eq!(Chain::Ethereum.id(), 1);
        assert_eq!(Chain::BnbChain.id(), 56);
        assert_eq!(Chain::Berachain.id(), 80094);
    }

    #[test]
    fn test_chain_name() {
        assert_eq!(Chain::Arbitrum.name(), "Arbitrum One");
        assert_eq!(Chain::BnbChain.name(), "BNB Smart Chain");
    }

    #[test]
    fn test_chain_all_round_trips() {
        for &chain in Chain::all() {
            assert_eq!(Chain::from_id(chain.id()), Some(chain));
        }
    }
}
