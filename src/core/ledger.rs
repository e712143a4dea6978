//! Collateral ledger.
//!
//! Tracks per-user, per-asset deposited balances and the approved collateral
//! set. The ledger only does bookkeeping; moving the underlying assets in and
//! out of custody is scheduled by the engine's settlement.

use crate::core::journal::JournaledMap;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::safe_add;

/// Deposited collateral balances
#[derive(Debug, Clone, Default)]
pub struct CollateralLedger {
    /// Approved assets, in construction order
    assets: Vec<Address>,
    /// (user, asset) → deposited amount
    deposits: JournaledMap<(Address, Address)>,
}

impl CollateralLedger {
    /// Create a ledger accepting the given assets
    pub fn new(assets: Vec<Address>) -> Self {
        Self {
            assets,
            deposits: JournaledMap::new(),
        }
    }

    /// Approved assets in construction order
    pub fn assets(&self) -> &[Address] {
        &self.assets
    }

    /// Check if an asset is approved
    pub fn is_supported(&self, asset: &Address) -> bool {
        self.assets.contains(asset)
    }

    /// Fail with [`Error::UnsupportedAsset`] unless `asset` is approved
    pub fn ensure_supported(&self, asset: &Address) -> Result<()> {
        if !self.is_supported(asset) {
            return Err(Error::UnsupportedAsset(*asset));
        }
        Ok(())
    }

    /// Deposited balance of `user` in `asset`
    pub fn balance_of(&self, user: &Address, asset: &Address) -> u128 {
        self.deposits.get(&(*user, *asset))
    }

    /// Non-zero balances of `user`, in asset order
    pub fn balances_of(&self, user: &Address) -> Vec<(Address, u128)> {
        self.assets
            .iter()
            .map(|asset| (*asset, self.balance_of(user, asset)))
            .filter(|(_, amount)| *amount > 0)
            .collect()
    }

    /// Users holding any collateral
    pub fn depositors(&self) -> Vec<Address> {
        let mut users: Vec<Address> = self.deposits.iter().map(|((user, _), _)| *user).collect();
        users.sort();
        users.dedup();
        users
    }

    /// Increase a balance
    pub fn credit(&mut self, user: &Address, asset: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        self.ensure_supported(asset)?;

        let new_balance = safe_add(self.balance_of(user, asset), amount)?;
        self.deposits.set((*user, *asset), new_balance);
        Ok(new_balance)
    }

    /// Decrease a balance; fails instead of wrapping when it is short
    pub fn debit(&mut self, user: &Address, asset: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        self.ensure_supported(asset)?;

        let available = self.balance_of(user, asset);
        let new_balance = available
            .checked_sub(amount)
            .ok_or(Error::InsufficientCollateral {
                required: amount,
                available,
            })?;
        self.deposits.set((*user, *asset), new_balance);
        Ok(new_balance)
    }

    pub(crate) fn commit(&mut self) {
        self.deposits.commit();
    }

    pub(crate) fn rollback(&mut self) {
        self.deposits.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weth() -> Address {
        Address::from_label("weth")
    }

    fn wbtc() -> Address {
        Address::from_label("wbtc")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn ledger() -> CollateralLedger {
        CollateralLedger::new(vec![weth(), wbtc()])
    }

    #[test]
    fn test_credit_and_debit() {
        let mut ledger = ledger();
        assert_eq!(ledger.credit(&alice(), &weth(), 100).unwrap(), 100);
        assert_eq!(ledger.debit(&alice(), &weth(), 40).unwrap(), 60);
        assert_eq!(ledger.balance_of(&alice(), &weth()), 60);
        assert_eq!(ledger.balance_of(&alice(), &wbtc()), 0);
    }

    #[test]
    fn test_zero_amount_rejected() {
        let mut ledger = ledger();
        assert_eq!(ledger.credit(&alice(), &weth(), 0), Err(Error::InvalidAmount));
        assert_eq!(ledger.debit(&alice(), &weth(), 0), Err(Error::InvalidAmount));
    }

    #[test]
    fn test_unsupported_asset_rejected() {
        let mut ledger = ledger();
        let other = Address::from_label("doge");
        assert_eq!(
            ledger.credit(&alice(), &other, 1),
            Err(Error::UnsupportedAsset(other))
        );
    }

    #[test]
    fn test_debit_does_not_wrap() {
        let mut ledger = ledger();
        ledger.credit(&alice(), &weth(), 10).unwrap();
        assert_eq!(
            ledger.debit(&alice(), &weth(), 11),
            Err(Error::InsufficientCollateral {
                required: 11,
                available: 10
            })
        );
        assert_eq!(ledger.balance_of(&alice(), &weth()), 10);
    }

    #[test]
    fn test_rollback() {
        let mut ledger = ledger();
        ledger.credit(&alice(), &weth(), 10).unwrap();
        ledger.commit();

        ledger.debit(&alice(), &weth(), 10).unwrap();
        ledger.credit(&alice(), &wbtc(), 3).unwrap();
        ledger.rollback();

        assert_eq!(ledger.balances_of(&alice()), vec![(weth(), 10)]);
    }

    #[test]
    fn test_depositors() {
        let mut ledger = ledger();
        let bob = Address::from_label("bob");
        ledger.credit(&alice(), &weth(), 1).unwrap();
        ledger.credit(&alice(), &wbtc(), 1).unwrap();
        ledger.credit(&bob, &weth(), 1).unwrap();

        let depositors = ledger.depositors();
        assert_eq!(depositors.len(), 2);
        assert!(depositors.contains(&alice()));
        assert!(depositors.contains(&bob));
    }
}
