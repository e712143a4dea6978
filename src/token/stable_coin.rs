//! Decentralized stable coin.
//!
//! An 18-decimal fungible token whose supply is controlled by a single owner.
//! In a deployed system the owner is the engine; only it may mint, and burns
//! come out of the owner's own balance after users hand units back.

use std::cell::RefCell;

use crate::token::balances::FungibleLedger;
use crate::token::{StableToken, TokenError};
use crate::utils::address::Address;

#[derive(Debug)]
struct StableCoinState {
    owner: Address,
    ledger: FungibleLedger,
}

/// Owner-controlled stable token
#[derive(Debug)]
pub struct StableCoin {
    address: Address,
    name: String,
    symbol: String,
    state: RefCell<StableCoinState>,
}

impl StableCoin {
    /// Token name
    pub const NAME: &'static str = "DecentralizedStableCoin";
    /// Token symbol
    pub const SYMBOL: &'static str = "DSC";

    /// Create a token owned by `owner`
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            name: Self::NAME.to_string(),
            symbol: Self::SYMBOL.to_string(),
            state: RefCell::new(StableCoinState {
                owner,
                ledger: FungibleLedger::new(),
            }),
        }
    }

    /// Token name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Current owner
    pub fn owner(&self) -> Address {
        self.state.borrow().owner
    }

    /// Hand supply control to `new_owner`
    pub fn transfer_ownership(
        &self,
        caller: &Address,
        new_owner: Address,
    ) -> Result<(), TokenError> {
        let mut state = self.state.borrow_mut();
        if *caller != state.owner {
            return Err(TokenError::NotOwner(*caller));
        }
        if new_owner.is_zero() {
            return Err(TokenError::ZeroAddress);
        }
        tracing::info!(
            from = %state.owner.short(),
            to = %new_owner.short(),
            "stable coin ownership transferred"
        );
        state.owner = new_owner;
        Ok(())
    }

    /// Owner-only mint with a typed error
    pub fn try_mint(&self, minter: &Address, to: &Address, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.borrow_mut();
        if *minter != state.owner {
            return Err(TokenError::NotOwner(*minter));
        }
        state.ledger.mint(to, amount)
    }

    /// Set `spender`'s allowance over `owner`'s balance
    pub fn approve(&self, owner: &Address, spender: &Address, amount: u128) {
        self.state.borrow_mut().ledger.approve(owner, spender, amount);
    }

    /// Remaining allowance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> u128 {
        self.state.borrow().ledger.allowance(owner, spender)
    }

    /// Total units in circulation
    pub fn total_supply(&self) -> u128 {
        self.state.borrow().ledger.total_supply()
    }

    /// Verify total supply equals the sum of balances
    pub fn verify_supply_invariant(&self) -> bool {
        self.state.borrow().ledger.verify_supply_invariant()
    }
}

impl StableToken for StableCoin {
    fn address(&self) -> Address {
        self.address
    }

    fn mint(&self, minter: &Address, to: &Address, amount: u128) -> bool {
        match self.try_mint(minter, to, amount) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(error = %e, "stable coin mint refused");
                false
            }
        }
    }

    fn burn(&self, burner: &Address, amount: u128) -> Result<(), TokenError> {
        let mut state = self.state.borrow_mut();
        if *burner != state.owner {
            return Err(TokenError::NotOwner(*burner));
        }
        state.ledger.burn(burner, amount)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool {
        self.state.borrow_mut().ledger.transfer(from, to, amount).is_ok()
    }

    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> bool {
        self.state
            .borrow_mut()
            .ledger
            .transfer_from(spender, from, to, amount)
            .is_ok()
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.state.borrow().ledger.balance_of(owner)
    }
}
