//! Checked fixed-point arithmetic.
//!
//! Balances and debts are `u128` amounts with 18 decimals. Products of two such
//! amounts overflow `u128`, so every multiply-then-divide goes through a 256-bit
//! intermediate and is narrowed back with an explicit overflow check.

use crate::error::{Error, Result};

#[allow(unsafe_code, missing_docs)]
mod wide {
    uint::construct_uint! {
        /// 256-bit unsigned integer used for intermediate products
        pub struct U256(4);
    }
}

pub use wide::U256;

impl U256 {
    /// Narrow to `u128`, failing instead of truncating
    pub fn checked_to_u128(self, operation: &str) -> Result<u128> {
        if self > U256::from(u128::MAX) {
            return Err(Error::Overflow {
                operation: operation.to_string(),
            });
        }
        Ok(self.low_u128())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SAFE ARITHMETIC OPERATIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Safe addition with overflow check
pub fn safe_add(a: u128, b: u128) -> Result<u128> {
    a.checked_add(b).ok_or(Error::Overflow {
        operation: format!("{} + {}", a, b),
    })
}

/// Computes `(a * b) / c` with a 256-bit intermediate, rounding down
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(Error::InvalidParameter {
            name: "divisor".into(),
            reason: "division by zero".into(),
        });
    }
    let product = U256::from(a) * U256::from(b);
    (product / U256::from(c)).checked_to_u128(&format!("({} * {}) / {}", a, b, c))
}

/// Like [`mul_div`] but saturates at `u128::MAX` instead of failing
pub fn mul_div_saturating(a: u128, b: u128, c: u128) -> Result<u128> {
    match mul_div(a, b, c) {
        Err(Error::Overflow { .. }) => Ok(u128::MAX),
        other => other,
    }
}

/// Percentage of an amount, rounding down (`pct` out of `precision`)
pub fn percent_of(amount: u128, pct: u128, precision: u128) -> Result<u128> {
    mul_div(amount, pct, precision)
}
