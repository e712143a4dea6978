//! In-memory collateral asset.

use std::cell::{Cell, RefCell};

use crate::token::balances::FungibleLedger;
use crate::token::{CollateralToken, TokenError};
use crate::utils::address::Address;

/// Freely mintable collateral token with a switch to refuse transfers
#[derive(Debug)]
pub struct MockCollateralToken {
    address: Address,
    symbol: String,
    ledger: RefCell<FungibleLedger>,
    paused: Cell<bool>,
}

impl MockCollateralToken {
    /// Create an empty token
    pub fn new(address: Address, symbol: impl Into<String>) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            ledger: RefCell::new(FungibleLedger::new()),
            paused: Cell::new(false),
        }
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Credit `amount` to `to` out of thin air
    pub fn mint(&self, to: &Address, amount: u128) -> Result<(), TokenError> {
        self.ledger.borrow_mut().mint(to, amount)
    }

    /// Set `spender`'s allowance over `owner`'s balance
    pub fn approve(&self, owner: &Address, spender: &Address, amount: u128) {
        self.ledger.borrow_mut().approve(owner, spender, amount);
    }

    /// Remaining allowance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.ledger.borrow().allowance(owner, spender)
    }

    /// Make every transfer return false while set
    pub fn set_paused(&self, paused: bool) {
        self.paused.set(paused);
    }

    /// Total units in existence
    pub fn total_supply(&self) -> u128 {
        self.ledger.borrow().total_supply()
    }

    fn run(&self, op: impl FnOnce(&mut FungibleLedger) -> Result<(), TokenError>) -> bool {
        if self.paused.get() {
            tracing::debug!(
                token = %self.symbol,
                error = %TokenError::Paused,
                "collateral transfer refused"
            );
            return false;
        }
        match op(&mut self.ledger.borrow_mut()) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(token = %self.symbol, error = %e, "collateral transfer refused");
                false
            }
        }
    }
}

impl CollateralToken for MockCollateralToken {
    fn address(&self) -> Address {
        self.address
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool {
        self.run(|ledger| ledger.transfer(from, to, amount))
    }

    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> bool {
        self.run(|ledger| ledger.transfer_from(spender, from, to, amount))
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.ledger.borrow().balance_of(owner)
    }
}
