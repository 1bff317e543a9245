pub mod aggregator;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod reputation;
pub mod scheduler;
pub mod service;
pub mod sources;
pub mod submitter;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::Serialize;

/// On-chain token identifier of the collection (ERC-721 `uint256`).
pub type TokenId = U256;

/// Number of position fields carried by every record.
pub const PROTOCOL_COUNT: usize = 5;

// --- Protocol Sources ---

/// The DeFi protocols whose positions feed a token's metadata.
///
/// The declaration order is the positional order expected by
/// `updatePerformanceMetrics` and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProtocolSource {
    /// Liquidity-pool share.
    Uniswap,
    /// Lending-position collateral.
    Aave,
    /// Stable-pool share.
    Curve,
    /// Collateralized-debt net position.
    MakerDao,
    /// Yield-pool balance.
    Pendle,
}

impl ProtocolSource {
    pub const ALL: [ProtocolSource; PROTOCOL_COUNT] = [
        ProtocolSource::Uniswap,
        ProtocolSource::Aave,
        ProtocolSource::Curve,
        ProtocolSource::MakerDao,
        ProtocolSource::Pendle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolSource::Uniswap => "uniswap",
            ProtocolSource::Aave => "aave",
            ProtocolSource::Curve => "curve",
            ProtocolSource::MakerDao => "makerdao",
            ProtocolSource::Pendle => "pendle",
        }
    }

    /// Attribute name used in the token metadata document.
    pub fn trait_type(&self) -> &'static str {
        match self {
            ProtocolSource::Uniswap => "Uniswap Value",
            ProtocolSource::Aave => "Aave Value",
            ProtocolSource::Curve => "Curve Value",
            ProtocolSource::MakerDao => "MakerDAO Value",
            ProtocolSource::Pendle => "Pendle Value",
        }
    }

    /// Position of this protocol inside a record.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ProtocolSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Token Holder ---

/// Owner and social handle of a token, as read right before aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Holder {
    pub owner: Address,
    pub handle: String,
}

// --- Metadata Record ---

pub const REPUTATION_TRAIT: &str = "YAPS Score";

/// One token's aggregated performance snapshot for a single cycle.
///
/// Built once by the aggregator and never mutated; the next cycle replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    token_id: TokenId,
    positions: [U256; PROTOCOL_COUNT],
    reputation: U256,
}

impl MetadataRecord {
    pub fn new(token_id: TokenId, positions: [U256; PROTOCOL_COUNT], reputation: U256) -> Self {
        Self {
            token_id,
            positions,
            reputation,
        }
    }

    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn position(&self, protocol: ProtocolSource) -> U256 {
        self.positions[protocol.index()]
    }

    pub fn reputation(&self) -> U256 {
        self.reputation
    }

    /// Positional arguments of `updatePerformanceMetrics` after the token id:
    /// `[p1..p5, reputation]`.
    pub fn update_args(&self) -> [U256; PROTOCOL_COUNT + 1] {
        let mut args = [U256::ZERO; PROTOCOL_COUNT + 1];
        args[..PROTOCOL_COUNT].copy_from_slice(&self.positions);
        args[PROTOCOL_COUNT] = self.reputation;
        args
    }

    pub fn to_token_metadata(&self) -> TokenMetadata {
        let mut attributes: Vec<MetadataAttribute> = ProtocolSource::ALL
            .iter()
            .map(|p| MetadataAttribute {
                trait_type: p.trait_type(),
                value: self.position(*p).to_string(),
            })
            .collect();
        attributes.push(MetadataAttribute {
            trait_type: REPUTATION_TRAIT,
            value: self.reputation.to_string(),
        });

        TokenMetadata {
            name: format!("DeFi Performance NFT #{}", self.token_id),
            description: "Dynamic DeFi Performance Tracker".to_string(),
            attributes,
        }
    }
}

/// JSON metadata document of a token, mirroring the collection's schema.
#[derive(Debug, Clone, Serialize)]
pub struct TokenMetadata {
    pub name: String,
    pub description: String,
    pub attributes: Vec<MetadataAttribute>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataAttribute {
    pub trait_type: &'static str,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> MetadataRecord {
        MetadataRecord::new(
            U256::from(7u64),
            [
                U256::from(1u64),
                U256::from(2u64),
                U256::from(3u64),
                U256::from(4u64),
                U256::from(5u64),
            ],
            U256::from(99u64),
        )
    }

    #[test]
    fn test_protocol_order_matches_index() {
        for (i, p) in ProtocolSource::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
        }
    }

    #[test]
    fn test_update_args_positional_order() {
        let args = record().update_args();
        let expected: Vec<U256> = [1u64, 2, 3, 4, 5, 99].iter().map(|v| U256::from(*v)).collect();
        assert_eq!(args.to_vec(), expected);
    }

    #[test]
    fn test_position_lookup_by_protocol() {
        let r = record();
        assert_eq!(r.position(ProtocolSource::Curve), U256::from(3u64));
        assert_eq!(r.position(ProtocolSource::Pendle), U256::from(5u64));
    }

    #[test]
    fn test_token_metadata_document() {
        let json = serde_json::to_value(record().to_token_metadata()).unwrap();
        assert_eq!(json["name"], "DeFi Performance NFT #7");
        let attrs = json["attributes"].as_array().unwrap();
        assert_eq!(attrs.len(), 6);
        assert_eq!(attrs[0]["trait_type"], "Uniswap Value");
        assert_eq!(attrs[3]["trait_type"], "MakerDAO Value");
        assert_eq!(attrs[5]["trait_type"], "YAPS Score");
        assert_eq!(attrs[5]["value"], "99");
    }
}
