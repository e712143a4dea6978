//! Position snapshots.
//!
//! Read-only views of a user's collateral and debt, computed by the engine at
//! current prices, plus the exportable ledger snapshot.

use serde::{Deserialize, Serialize};

use crate::core::health::HealthFactor;
use crate::error::{Error, Result};
use crate::utils::address::Address;

/// Debt and collateral value of one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountInformation {
    /// Outstanding DSC debt
    pub total_dsc_minted: u128,
    /// Collateral value in the unit of account
    pub collateral_value_in_usd: u128,
}

/// Deposited balance in one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralBalance {
    /// Collateral asset
    pub asset: Address,
    /// Deposited amount
    pub amount: u128,
    /// Value at the current price
    pub value_in_usd: u128,
}

/// Full view of a user's position at current prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosition {
    /// Position owner
    pub user: Address,
    /// Non-zero collateral balances, in asset order
    pub collateral: Vec<CollateralBalance>,
    /// Outstanding DSC debt
    pub debt: u128,
    /// Total collateral value
    pub collateral_value_in_usd: u128,
    /// Current health factor
    pub health_factor: HealthFactor,
}

impl UserPosition {
    /// True when the position holds neither collateral nor debt
    pub fn is_empty(&self) -> bool {
        self.collateral.is_empty() && self.debt == 0
    }

    /// True when the position is below `min_health_factor`
    pub fn is_liquidatable(&self, min_health_factor: u128) -> bool {
        !self.health_factor.meets(min_health_factor)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw balances of one account (no prices involved)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Position owner
    pub user: Address,
    /// Non-zero (asset, amount) pairs
    pub collateral: Vec<(Address, u128)>,
    /// Outstanding DSC debt
    pub debt: u128,
}

/// Export of every non-empty position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// Approved assets in construction order
    pub assets: Vec<Address>,
    /// Positions sorted by owner
    pub positions: Vec<PositionRecord>,
    /// Sum of all outstanding debt
    pub total_debt: u128,
}

impl LedgerSnapshot {
    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Position of `user`, if it is non-empty
    pub fn position(&self, user: &Address) -> Option<&PositionRecord> {
        self.positions.iter().find(|p| p.user == *user)
    }

    /// Sum of deposits in `asset` across all users
    pub fn total_collateral(&self, asset: &Address) -> u128 {
        self.positions
            .iter()
            .flat_map(|p| p.collateral.iter())
            .filter(|(a, _)| a == asset)
            .fold(0u128, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}
