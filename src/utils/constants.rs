//! Protocol constants.
//!
//! All protocol-wide constants are defined here for easy auditing. The engine
//! reads them through [`EngineParams`](crate::core::config::EngineParams), whose
//! defaults are these values.

// ═══════════════════════════════════════════════════════════════════════════════
// FIXED-POINT CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Fixed-point base of the engine (1.0 = 10^18)
pub const PRECISION: u128 = 1_000_000_000_000_000_000;

/// Decimals of amounts held by the engine (collateral and DSC)
pub const TOKEN_DECIMALS: u32 = 18;

/// Decimals reported by price feeds
pub const FEED_DECIMALS: u8 = 8;

/// Scales an 8-decimal feed answer up to the 18-decimal base
pub const ADDITIONAL_FEED_PRECISION: u128 = 10_000_000_000;

// ═══════════════════════════════════════════════════════════════════════════════
// RISK CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Liquidation threshold in percent: collateral counts at 50% of its value,
/// so positions must stay 200% over-collateralized
pub const LIQUIDATION_THRESHOLD: u128 = 50;

/// Divisor for percentage constants
pub const LIQUIDATION_PRECISION: u128 = 100;

/// Minimum health factor (1.0 in fixed point)
pub const MIN_HEALTH_FACTOR: u128 = PRECISION;

/// Bonus paid to liquidators in percent of the seized collateral
pub const LIQUIDATION_BONUS: u128 = 10;

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum age of a price round before it is considered stale (3 hours)
pub const ORACLE_TIMEOUT_SECS: u64 = 3 * 60 * 60;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Maximum events kept in memory before the oldest are pruned
pub const MAX_EVENTS: usize = 1000;

/// Length of an account or asset address in bytes
pub const ADDRESS_LENGTH: usize = 20;
