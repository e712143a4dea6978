//! Error types for the DSC engine.
//!
//! Every failure path surfaces a distinct error kind. All errors abort the
//! current operation; its state changes are discarded before the error is
//! returned.

use thiserror::Error;

use crate::core::health::HealthFactor;
use crate::utils::address::Address;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the DSC engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Ledger Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Amount is zero
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// Asset is not in the approved collateral set
    #[error("Unsupported collateral asset: {0}")]
    UnsupportedAsset(Address),

    /// External asset or token movement failed
    #[error("Transfer of {amount} {token} from {from} to {to} failed")]
    TransferFailed {
        /// Token that was moved
        token: Address,
        /// Source account
        from: Address,
        /// Destination account
        to: Address,
        /// Amount
        amount: u128,
    },

    /// Requested collateral reduction exceeds the deposited balance
    #[error("Insufficient collateral: required {required}, available {available}")]
    InsufficientCollateral {
        /// Requested amount
        required: u128,
        /// Deposited balance
        available: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Debt Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Requested burn exceeds the outstanding debt
    #[error("Burn of {requested} exceeds outstanding debt {outstanding}")]
    BurnExceedsDebt {
        /// Requested burn
        requested: u128,
        /// Outstanding debt
        outstanding: u128,
    },

    /// The stable token refused to mint
    #[error("Stable token mint of {amount} to {to} failed")]
    MintFailed {
        /// Recipient
        to: Address,
        /// Amount
        amount: u128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Health Factor Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Operation would leave the position under-collateralized
    #[error("Health factor {0} is below the minimum")]
    BreaksHealthFactor(HealthFactor),

    /// Liquidation attempted on a solvent position
    #[error("Health factor is above the minimum, position cannot be liquidated")]
    HealthFactorOk,

    /// Liquidation did not raise the health factor
    #[error("Liquidation did not improve the health factor")]
    HealthFactorNotImproved,

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Price round is stale or incomplete
    #[error("Stale price from feed {feed}: updated at {updated_at}, now {now}")]
    StalePrice {
        /// Feed address
        feed: Address,
        /// Round update time
        updated_at: u64,
        /// Current time
        now: u64,
    },

    /// Feed answered zero or a negative price
    #[error("Invalid price {answer} from feed {feed}")]
    InvalidPrice {
        /// Feed address
        feed: Address,
        /// Raw answer
        answer: i128,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Execution Errors
    // ═══════════════════════════════════════════════════════════════════

    /// A collaborator called back into the engine mid-operation
    #[error("Reentrant call rejected")]
    Reentrancy,

    /// Overflow in calculation
    #[error("Arithmetic overflow in {operation}")]
    Overflow {
        /// Operation that overflowed
        operation: String,
    },

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Configuration Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Collateral assets and price feeds differ in length
    #[error("Collateral assets ({assets}) and price feeds ({feeds}) must have equal length")]
    LengthMismatch {
        /// Number of assets
        assets: usize,
        /// Number of feeds
        feeds: usize,
    },

    /// The same collateral asset was listed twice
    #[error("Duplicate collateral asset: {0}")]
    DuplicateAsset(Address),

    /// Configuration could not be read or written
    #[error("Configuration error: {0}")]
    Config(String),

    // ═══════════════════════════════════════════════════════════════════
    // Serialization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Deserialization failed
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if resubmitting with different inputs or after a state
    /// change (price update, more collateral) can succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::InsufficientCollateral { .. }
                | Error::BurnExceedsDebt { .. }
                | Error::BreaksHealthFactor(_)
                | Error::HealthFactorOk
                | Error::StalePrice { .. }
                | Error::TransferFailed { .. }
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Internal(_) | Error::Overflow { .. }
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Ledger errors: 1xxx
            Error::InvalidAmount => 1001,
            Error::UnsupportedAsset(_) => 1002,
            Error::TransferFailed { .. } => 1003,
            Error::InsufficientCollateral { .. } => 1004,

            // Debt errors: 2xxx
            Error::BurnExceedsDebt { .. } => 2001,
            Error::MintFailed { .. } => 2002,

            // Health factor errors: 3xxx
            Error::BreaksHealthFactor(_) => 3001,
            Error::HealthFactorOk => 3002,
            Error::HealthFactorNotImproved => 3003,

            // Oracle errors: 4xxx
            Error::StalePrice { .. } => 4001,
            Error::InvalidPrice { .. } => 4002,

            // Execution errors: 5xxx
            Error::Reentrancy => 5001,
            Error::Overflow { .. } => 5002,
            Error::InvalidParameter { .. } => 5004,

            // Configuration errors: 6xxx
            Error::LengthMismatch { .. } => 6001,
            Error::DuplicateAsset(_) => 6002,
            Error::Config(_) => 6003,

            // Serialization errors: 7xxx
            Error::Serialization(_) => 7001,
            Error::Deserialization(_) => 7002,

            // Internal errors: 9xxx
            Error::Internal(_) => 9001,
        }
    }
}
