//! Engine parameters.
//!
//! The four protocol constants (feed precision adjustment, liquidation
//! threshold, minimum health factor, liquidation bonus) plus the fixed-point
//! base and the oracle timeout. Parameters are fixed when the engine is built;
//! there is no governance path to change them afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::utils::constants::*;

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Immutable engine parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Fixed-point base (1.0)
    pub precision: u128,

    /// Factor lifting a feed answer to the fixed-point base
    pub additional_feed_precision: u128,

    /// Decimals every bound price feed must report
    pub feed_decimals: u8,

    /// Share of collateral value counted toward solvency, in percent
    pub liquidation_threshold: u128,

    /// Divisor for `liquidation_threshold` and `liquidation_bonus`
    pub liquidation_precision: u128,

    /// Health factor below which a position is liquidatable
    pub min_health_factor: u128,

    /// Liquidator bonus in percent of the seized collateral
    pub liquidation_bonus: u128,

    /// Maximum price round age in seconds
    pub oracle_timeout_secs: u64,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            precision: PRECISION,
            additional_feed_precision: ADDITIONAL_FEED_PRECISION,
            feed_decimals: FEED_DECIMALS,
            liquidation_threshold: LIQUIDATION_THRESHOLD,
            liquidation_precision: LIQUIDATION_PRECISION,
            min_health_factor: MIN_HEALTH_FACTOR,
            liquidation_bonus: LIQUIDATION_BONUS,
            oracle_timeout_secs: ORACLE_TIMEOUT_SECS,
        }
    }
}

impl EngineParams {
    /// Override the liquidation threshold
    pub fn with_threshold(mut self, threshold: u128) -> Self {
        self.liquidation_threshold = threshold;
        self
    }

    /// Override the liquidation bonus
    pub fn with_bonus(mut self, bonus: u128) -> Self {
        self.liquidation_bonus = bonus;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 || self.additional_feed_precision == 0 {
            return Err(invalid("precision", "must be non-zero"));
        }
        if self.liquidation_precision == 0 {
            return Err(invalid("liquidation_precision", "must be non-zero"));
        }
        if self.liquidation_threshold == 0
            || self.liquidation_threshold > self.liquidation_precision
        {
            return Err(invalid(
                "liquidation_threshold",
                "must be in (0, liquidation_precision]",
            ));
        }
        if self.liquidation_bonus >= self.liquidation_precision {
            return Err(invalid("liquidation_bonus", "must be below liquidation_precision"));
        }
        if self.min_health_factor == 0 {
            return Err(invalid("min_health_factor", "must be non-zero"));
        }
        if self.oracle_timeout_secs == 0 {
            return Err(invalid("oracle_timeout_secs", "must be non-zero"));
        }
        let feed_unit = 10u128
            .checked_pow(self.feed_decimals as u32)
            .ok_or_else(|| invalid("feed_decimals", "too large"))?;
        if feed_unit.checked_mul(self.additional_feed_precision) != Some(self.precision) {
            return Err(invalid(
                "additional_feed_precision",
                "10^feed_decimals * additional_feed_precision must equal precision",
            ));
        }
        Ok(())
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        let params: Self =
            serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::Config(e.to_string()))?;
            }
        }

        std::fs::write(path, content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply overrides from environment variables
    pub fn from_env(mut self) -> Result<Self> {
        if let Some(v) = env_u128("DSC_LIQUIDATION_THRESHOLD")? {
            self.liquidation_threshold = v;
        }
        if let Some(v) = env_u128("DSC_LIQUIDATION_BONUS")? {
            self.liquidation_bonus = v;
        }
        if let Some(v) = env_u128("DSC_MIN_HEALTH_FACTOR")? {
            self.min_health_factor = v;
        }
        if let Some(v) = env_u128("DSC_ORACLE_TIMEOUT_SECS")? {
            self.oracle_timeout_secs =
                u64::try_from(v).map_err(|_| invalid("DSC_ORACLE_TIMEOUT_SECS", "out of range"))?;
        }
        self.validate()?;
        Ok(self)
    }
}

fn env_u128(key: &str) -> Result<Option<u128>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(key, "not an unsigned integer")),
        Err(_) => Ok(None),
    }
}

fn invalid(name: &str, reason: &str) -> Error {
    Error::InvalidParameter {
        name: name.into(),
        reason: reason.into(),
    }
}
