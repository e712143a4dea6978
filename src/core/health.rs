//! Health factor and price conversion.
//!
//! Pure functions translating feed prices, collateral amounts and debt into
//! unit-of-account values and the health factor. Nothing here touches engine
//! state; the engine feeds in balances and validated prices.
//!
//! A position without debt has health factor [`HealthFactor::MAX`]. This is
//! an explicit convention, not the result of a division, so a debt-free
//! position can never fail the minimum-health gate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::config::EngineParams;
use crate::error::{Error, Result};
use crate::utils::math::{mul_div, mul_div_saturating};

// ═══════════════════════════════════════════════════════════════════════════════
// HEALTH FACTOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point solvency ratio (1.0 = `EngineParams::precision`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HealthFactor(u128);

impl HealthFactor {
    /// Health factor of a debt-free position
    pub const MAX: Self = Self(u128::MAX);

    /// Largest health factor an indebted position can report
    pub const MAX_BOUNDED: Self = Self(u128::MAX - 1);

    /// Create from a raw fixed-point value
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw fixed-point value
    pub fn raw(&self) -> u128 {
        self.0
    }

    /// True for the debt-free convention
    pub fn is_unbounded(&self) -> bool {
        self.0 == u128::MAX
    }

    /// True when at or above `min` (the boundary is healthy)
    pub fn meets(&self, min: u128) -> bool {
        self.0 >= min
    }

    /// Four-decimal rendering against a fixed-point base of `precision`
    pub fn to_decimal_string(&self, precision: u128) -> String {
        if self.is_unbounded() {
            return "∞".to_string();
        }
        if precision == 0 {
            return self.0.to_string();
        }
        let whole = self.0 / precision;
        let frac = mul_div(self.0 % precision, 10_000, precision).unwrap_or_default();
        format!("{}.{:04}", whole, frac)
    }
}

/// Renders against the default `1e18` base; engines with another precision
/// use [`HealthFactor::to_decimal_string`].
impl fmt::Display for HealthFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_decimal_string(crate::utils::constants::PRECISION))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

fn scaled_price(price: u128, params: &EngineParams) -> Result<u128> {
    if price == 0 {
        return Err(Error::InvalidParameter {
            name: "price".into(),
            reason: "must be positive".into(),
        });
    }
    price
        .checked_mul(params.additional_feed_precision)
        .ok_or(Error::Overflow {
            operation: "price * additional_feed_precision".into(),
        })
}

/// Value of `amount` collateral units in the unit of account.
///
/// `price` is the raw feed answer; the result is in the fixed-point base.
pub fn usd_value(price: u128, amount: u128, params: &EngineParams) -> Result<u128> {
    mul_div(scaled_price(price, params)?, amount, params.precision)
}

/// Collateral units worth `usd_amount` at `price` (rounds down).
pub fn token_amount_from_usd(price: u128, usd_amount: u128, params: &EngineParams) -> Result<u128> {
    mul_div(usd_amount, params.precision, scaled_price(price, params)?)
}

/// Health factor for a debt and a collateral value.
///
/// `(collateral_value × threshold / liquidation_precision) × precision / debt`,
/// or [`HealthFactor::MAX`] when `total_dsc_minted` is zero. Results too large
/// for `u128` saturate to [`HealthFactor::MAX_BOUNDED`].
pub fn calculate_health_factor(
    total_dsc_minted: u128,
    collateral_value_in_usd: u128,
    params: &EngineParams,
) -> Result<HealthFactor> {
    if total_dsc_minted == 0 {
        return Ok(HealthFactor::MAX);
    }
    let adjusted = mul_div(
        collateral_value_in_usd,
        params.liquidation_threshold,
        params.liquidation_precision,
    )?;
    let raw = mul_div_saturating(adjusted, params.precision, total_dsc_minted)?;
    Ok(HealthFactor(raw.min(HealthFactor::MAX_BOUNDED.0)))
}

/// Fails with [`Error::BreaksHealthFactor`] when `hf` is below the minimum
pub fn ensure_healthy(hf: HealthFactor, params: &EngineParams) -> Result<()> {
    if !hf.meets(params.min_health_factor) {
        return Err(Error::BreaksHealthFactor(hf));
    }
    Ok(())
}
