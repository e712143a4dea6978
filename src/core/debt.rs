//! Minted-debt bookkeeping.
//!
//! Per-user DSC debt. Actual token mint and burn are delegated to the stable
//! token through the engine's settlement.

use crate::core::journal::JournaledMap;
use crate::error::{Error, Result};
use crate::utils::address::Address;
use crate::utils::math::safe_add;

/// Outstanding DSC debt per user
#[derive(Debug, Clone, Default)]
pub struct DebtBook {
    debts: JournaledMap<Address>,
}

impl DebtBook {
    /// Create an empty debt book
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding debt of `user`
    pub fn debt_of(&self, user: &Address) -> u128 {
        self.debts.get(user)
    }

    /// Sum of all outstanding debt
    pub fn total_debt(&self) -> u128 {
        self.debts
            .iter()
            .fold(0u128, |acc, (_, debt)| acc.saturating_add(*debt))
    }

    /// Users with outstanding debt
    pub fn debtors(&self) -> Vec<Address> {
        let mut users: Vec<Address> = self.debts.iter().map(|(user, _)| *user).collect();
        users.sort();
        users
    }

    /// Record newly minted debt
    pub fn increase(&mut self, user: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        let new_debt = safe_add(self.debt_of(user), amount)?;
        self.debts.set(*user, new_debt);
        Ok(new_debt)
    }

    /// Record repaid debt; fails instead of wrapping when `amount` exceeds it
    pub fn decrease(&mut self, user: &Address, amount: u128) -> Result<u128> {
        if amount == 0 {
            return Err(Error::InvalidAmount);
        }
        let outstanding = self.debt_of(user);
        let new_debt = outstanding
            .checked_sub(amount)
            .ok_or(Error::BurnExceedsDebt {
                requested: amount,
                outstanding,
            })?;
        self.debts.set(*user, new_debt);
        Ok(new_debt)
    }

    pub(crate) fn commit(&mut self) {
        self.debts.commit();
    }

    pub(crate) fn rollback(&mut self) {
        self.debts.rollback();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increase_and_decrease() {
        let mut book = DebtBook::new();
        let user = Address::from_label("alice");

        assert_eq!(book.increase(&user, 100).unwrap(), 100);
        assert_eq!(book.decrease(&user, 30).unwrap(), 70);
        assert_eq!(book.debt_of(&user), 70);
        assert_eq!(book.total_debt(), 70);
    }

    #[test]
    fn test_decrease_beyond_debt_fails() {
        let mut book = DebtBook::new();
        let user = Address::from_label("alice");
        book.increase(&user, 10).unwrap();

        assert_eq!(
            book.decrease(&user, 11),
            Err(Error::BurnExceedsDebt {
                requested: 11,
                outstanding: 10
            })
        );
        assert_eq!(book.debt_of(&user), 10);
    }

    #[test]
    fn test_full_repayment_removes_debtor() {
        let mut book = DebtBook::new();
        let user = Address::from_label("alice");
        book.increase(&user, 10).unwrap();
        book.decrease(&user, 10).unwrap();
        assert!(book.debtors().is_empty());
    }

    #[test]
    fn test_rollback() {
        let mut book = DebtBook::new();
        let user = Address::from_label("alice");
        book.increase(&user, 10).unwrap();
        book.commit();

        book.increase(&user, 5).unwrap();
        book.rollback();
        assert_eq!(book.debt_of(&user), 10);
    }
}
