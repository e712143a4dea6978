//! Token collaborators.
//!
//! The engine moves value only through these traits: the collateral assets it
//! takes into custody and the stable token it mints and burns. In-memory
//! implementations back the simulator and the tests.
//!
//! Methods take the calling account explicitly (`from`, `spender`, `minter`)
//! since there is no ambient message sender.

pub mod balances;
pub mod collateral;
pub mod stable_coin;

pub use balances::*;
pub use collateral::*;
pub use stable_coin::*;

use thiserror::Error;

use crate::utils::address::Address;

/// Failures reported by in-memory token implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Amount is zero
    #[error("Amount must be greater than zero")]
    ZeroAmount,

    /// Mint or transfer to the zero address
    #[error("Zero address")]
    ZeroAddress,

    /// Balance too low
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance {
        /// Required amount
        required: u128,
        /// Available balance
        available: u128,
    },

    /// Allowance too low
    #[error("Insufficient allowance: required {required}, available {available}")]
    InsufficientAllowance {
        /// Required amount
        required: u128,
        /// Approved amount
        available: u128,
    },

    /// Caller is not the token owner
    #[error("Caller {0} is not the owner")]
    NotOwner(Address),

    /// Supply or balance overflow
    #[error("Token arithmetic overflow")]
    Overflow,

    /// Transfers disabled on this token
    #[error("Token transfers are paused")]
    Paused,
}

/// A fungible collateral asset
pub trait CollateralToken {
    /// Asset address
    fn address(&self) -> Address;

    /// Move `amount` from `from` (the caller) to `to`
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool;

    /// Move `amount` from `from` to `to` using `spender`'s allowance
    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> bool;

    /// Balance of `owner`
    fn balance_of(&self, owner: &Address) -> u128;
}

/// The stable token the engine mints and burns
pub trait StableToken {
    /// Token address
    fn address(&self) -> Address;

    /// Mint `amount` to `to`; only the authorized minter succeeds
    fn mint(&self, minter: &Address, to: &Address, amount: u128) -> bool;

    /// Destroy `amount` of `burner`'s own balance; fails rather than
    /// returning false
    fn burn(&self, burner: &Address, amount: u128) -> Result<(), TokenError>;

    /// Move `amount` from `from` (the caller) to `to`
    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool;

    /// Move `amount` from `from` to `to` using `spender`'s allowance
    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> bool;

    /// Balance of `owner`
    fn balance_of(&self, owner: &Address) -> u128;
}
