//! DSC Command Line Interface.
//!
//! Scenario simulator and calculators for the `dsc` binary. Amounts on the
//! command line and in scenario files are decimal strings; the engine works in
//! 18-decimal base units and prices in 8-decimal feed units.

pub mod output;
pub mod scenario;
pub mod simulator;

pub use output::*;
pub use scenario::*;
pub use simulator::*;

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

use crate::utils::constants::{FEED_DECIMALS, TOKEN_DECIMALS};

// ═══════════════════════════════════════════════════════════════════════════════
// CLI RESULT
// ═══════════════════════════════════════════════════════════════════════════════

/// CLI Error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Scenario or parameter file problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine rejected the setup
    #[error("Engine error: {0}")]
    Engine(#[from] crate::error::Error),
}

/// CLI Result type
pub type CliResult<T> = std::result::Result<T, CliError>;

// ═══════════════════════════════════════════════════════════════════════════════
// AMOUNT PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Parse a non-negative decimal string into base units with `decimals` places
pub fn parse_fixed(input: &str, decimals: u32) -> CliResult<u128> {
    let value = Decimal::from_str(input.trim())
        .map_err(|e| CliError::InvalidArgument(format!("'{}': {}", input, e)))?
        .normalize();

    if value.is_sign_negative() && !value.is_zero() {
        return Err(CliError::InvalidArgument(format!("'{}': must not be negative", input)));
    }
    if value.scale() > decimals {
        return Err(CliError::InvalidArgument(format!(
            "'{}': more than {} decimal places",
            input, decimals
        )));
    }

    let mantissa = value.mantissa().unsigned_abs();
    10u128
        .checked_pow(decimals - value.scale())
        .and_then(|factor| mantissa.checked_mul(factor))
        .ok_or_else(|| CliError::InvalidArgument(format!("'{}': too large", input)))
}

/// Parse a token amount (18 decimals)
pub fn parse_units(input: &str) -> CliResult<u128> {
    parse_fixed(input, TOKEN_DECIMALS)
}

/// Parse a feed price (8 decimals)
pub fn parse_price(input: &str) -> CliResult<i128> {
    let raw = parse_fixed(input, FEED_DECIMALS as u32)?;
    i128::try_from(raw).map_err(|_| CliError::InvalidArgument(format!("'{}': too large", input)))
}

/// Render base units with `decimals` places, trailing zeros trimmed
pub fn format_fixed(amount: u128, decimals: u32) -> String {
    let unit = 10u128.pow(decimals);
    let whole = amount / unit;
    let frac = amount % unit;
    if frac == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", frac, width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Render an 18-decimal token amount
pub fn format_units(amount: u128) -> String {
    format_fixed(amount, TOKEN_DECIMALS)
}
