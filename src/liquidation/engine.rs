//! Liquidation rules.
//!
//! This module holds the pricing and admission rules for liquidations:
//! - Quote: collateral owed for a debt amount, plus the liquidator bonus
//! - Gates: only unhealthy positions, and only if the ratio improves
//! - Candidate ordering (lowest health factor first)
//! - History and statistics of executed liquidations
//!
//! Ledger and token movements are driven by the engine façade.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::core::config::EngineParams;
use crate::core::health::{token_amount_from_usd, HealthFactor};
use crate::core::position::UserPosition;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::constants::MAX_EVENTS;
use crate::utils::math::{percent_of, safe_add};

// ═══════════════════════════════════════════════════════════════════════════════
// QUOTE
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral a liquidator receives for covering debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationQuote {
    /// Collateral asset to seize
    pub asset: Address,
    /// Debt the liquidator repays
    pub debt_to_cover: u128,
    /// Collateral equal in value to the debt
    pub collateral_from_debt: u128,
    /// Bonus collateral on top
    pub bonus: u128,
    /// Total seized from the position
    pub total_collateral: u128,
}

impl LiquidationQuote {
    /// Price a liquidation of `debt_to_cover` against `asset` at `price`.
    ///
    /// Rounds down at each step.
    pub fn compute(
        asset: Address,
        price: u128,
        debt_to_cover: u128,
        params: &EngineParams,
    ) -> Result<Self> {
        if debt_to_cover == 0 {
            return Err(Error::InvalidAmount);
        }
        let collateral_from_debt = token_amount_from_usd(price, debt_to_cover, params)?;
        let bonus = percent_of(
            collateral_from_debt,
            params.liquidation_bonus,
            params.liquidation_precision,
        )?;
        let total_collateral = safe_add(collateral_from_debt, bonus)?;

        Ok(Self {
            asset,
            debt_to_cover,
            collateral_from_debt,
            bonus,
            total_collateral,
        })
    }

    /// True when the position holds enough of the asset to pay this quote
    pub fn is_covered_by(&self, balance: u128) -> bool {
        balance >= self.total_collateral
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GATES
// ═══════════════════════════════════════════════════════════════════════════════

/// Fails with [`Error::HealthFactorOk`] unless the position is below the minimum
pub fn ensure_liquidatable(starting: HealthFactor, params: &EngineParams) -> Result<()> {
    if starting.meets(params.min_health_factor) {
        return Err(Error::HealthFactorOk);
    }
    Ok(())
}

/// Fails with [`Error::HealthFactorNotImproved`] unless `ending > starting`
pub fn ensure_improved(starting: HealthFactor, ending: HealthFactor) -> Result<()> {
    if ending <= starting {
        return Err(Error::HealthFactorNotImproved);
    }
    Ok(())
}

/// Liquidatable positions, lowest health factor first
pub fn prioritize_liquidations(
    positions: Vec<UserPosition>,
    params: &EngineParams,
) -> Vec<UserPosition> {
    let mut candidates: Vec<UserPosition> = positions
        .into_iter()
        .filter(|p| p.is_liquidatable(params.min_health_factor))
        .collect();

    // Ascending: the most under-collateralized position comes first
    candidates.sort_by_key(|p| (p.health_factor, p.user));
    candidates
}

// ═══════════════════════════════════════════════════════════════════════════════
// HISTORY
// ═══════════════════════════════════════════════════════════════════════════════

/// Record of one executed liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationRecord {
    /// Liquidated position
    pub user: Address,
    /// Liquidator
    pub liquidator: Address,
    /// Executed quote
    pub quote: LiquidationQuote,
    /// Health factor before
    pub starting_health_factor: HealthFactor,
    /// Health factor after
    pub ending_health_factor: HealthFactor,
    /// Timestamp
    pub timestamp: u64,
}

/// Liquidation statistics
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LiquidationStats {
    /// Liquidations executed
    pub total_liquidations: u64,
    /// Debt repaid by liquidators
    pub total_debt_liquidated: u128,
    /// Collateral seized per asset, bonus included
    pub collateral_seized: BTreeMap<Address, u128>,
    /// Bonus paid per asset
    pub bonus_paid: BTreeMap<Address, u128>,
    /// Lowest starting health factor seen
    pub lowest_health_factor: Option<HealthFactor>,
}

/// Bounded history of committed liquidations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiquidationHistory {
    records: VecDeque<LiquidationRecord>,
    max_records: usize,
    stats: LiquidationStats,
}

impl Default for LiquidationHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl LiquidationHistory {
    /// Create an empty history
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            max_records: MAX_EVENTS,
            stats: LiquidationStats::default(),
        }
    }

    /// Add a committed liquidation (with pruning)
    pub fn record(&mut self, record: LiquidationRecord) {
        let stats = &mut self.stats;
        stats.total_liquidations += 1;
        stats.total_debt_liquidated = stats
            .total_debt_liquidated
            .saturating_add(record.quote.debt_to_cover);

        let seized = stats.collateral_seized.entry(record.quote.asset).or_insert(0);
        *seized = seized.saturating_add(record.quote.total_collateral);
        let bonus = stats.bonus_paid.entry(record.quote.asset).or_insert(0);
        *bonus = bonus.saturating_add(record.quote.bonus);

        stats.lowest_health_factor = Some(match stats.lowest_health_factor {
            Some(lowest) => lowest.min(record.starting_health_factor),
            None => record.starting_health_factor,
        });

        self.records.push_back(record);
        if self.records.len() > self.max_records {
            self.records.pop_front();
        }
    }

    /// Records for one position
    pub fn records_for(&self, user: &Address) -> Vec<&LiquidationRecord> {
        self.records.iter().filter(|r| r.user == *user).collect()
    }

    /// Get statistics
    pub fn statistics(&self) -> LiquidationStats {
        self.stats.clone()
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::PRECISION;

    const ETH_PRICE: u128 = 2_000 * 100_000_000;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn position(label: &str, hf: HealthFactor) -> UserPosition {
        UserPosition {
            user: Address::from_label(label),
            collateral: Vec::new(),
            debt: 1,
            collateral_value_in_usd: 0,
            health_factor: hf,
        }
    }

    #[test]
    fn test_quote_with_bonus() {
        // $1000 price, $10000 debt: 10 units plus a 1 unit bonus
        let quote = LiquidationQuote::compute(
            weth(),
            ETH_PRICE / 2,
            10_000 * PRECISION,
            &EngineParams::default(),
        )
        .unwrap();

        assert_eq!(quote.collateral_from_debt, 10 * PRECISION);
        assert_eq!(quote.bonus, PRECISION);
        assert_eq!(quote.total_collateral, 11 * PRECISION);
        assert!(!quote.is_covered_by(10 * PRECISION));
        assert!(quote.is_covered_by(11 * PRECISION));
    }

    #[test]
    fn test_quote_zero_debt_rejected() {
        assert_eq!(
            LiquidationQuote::compute(weth(), ETH_PRICE, 0, &EngineParams::default()),
            Err(Error::InvalidAmount)
        );
    }

    #[test]
    fn test_gates() {
        let params = EngineParams::default();
        assert_eq!(
            ensure_liquidatable(HealthFactor::from_raw(PRECISION), &params),
            Err(Error::HealthFactorOk)
        );
        assert!(ensure_liquidatable(HealthFactor::from_raw(PRECISION - 1), &params).is_ok());

        let start = HealthFactor::from_raw(PRECISION / 2);
        assert_eq!(ensure_improved(start, start), Err(Error::HealthFactorNotImproved));
        assert!(ensure_improved(start, HealthFactor::MAX).is_ok());
    }

    #[test]
    fn test_prioritize_liquidations() {
        let params = EngineParams::default();
        let positions = vec![
            position("healthy", HealthFactor::from_raw(2 * PRECISION)),
            position("bad", HealthFactor::from_raw(PRECISION / 2)),
            position("worse", HealthFactor::from_raw(PRECISION / 4)),
            position("free", HealthFactor::MAX),
        ];

        let sorted = prioritize_liquidations(positions, &params);
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted[0].user, Address::from_label("worse"));
        assert_eq!(sorted[1].user, Address::from_label("bad"));
    }

    #[test]
    fn test_history_statistics() {
        let params = EngineParams::default();
        let quote =
            LiquidationQuote::compute(weth(), ETH_PRICE, 1_000 * PRECISION, &params).unwrap();

        let mut history = LiquidationHistory::new();
        for (user, hf) in [("a", PRECISION / 2), ("b", PRECISION / 3)] {
            history.record(LiquidationRecord {
                user: Address::from_label(user),
                liquidator: Address::from_label("keeper"),
                quote,
                starting_health_factor: HealthFactor::from_raw(hf),
                ending_health_factor: HealthFactor::MAX,
                timestamp: 0,
            });
        }

        let stats = history.statistics();
        assert_eq!(stats.total_liquidations, 2);
        assert_eq!(stats.total_debt_liquidated, 2_000 * PRECISION);
        assert_eq!(stats.collateral_seized[&weth()], 2 * quote.total_collateral);
        assert_eq!(stats.lowest_health_factor, Some(HealthFactor::from_raw(PRECISION / 3)));
        assert_eq!(history.records_for(&Address::from_label("a")).len(), 1);

        let restored = LiquidationHistory::from_bytes(&history.to_bytes().unwrap()).unwrap();
        assert_eq!(restored.statistics(), stats);
    }
}
