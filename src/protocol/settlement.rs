//! External transfer settlement.
//!
//! Bookkeeping for an operation is applied to journaled state first; the
//! asset movements it implies are collected here and executed afterwards in
//! a fixed order: inbound pulls, then the burn, then at most one outbound
//! transfer. When a step fails, every completed step is reversed (burned units
//! re-minted to the engine, pulled funds returned) so the caller can roll the
//! journal back with external balances unchanged.

use std::rc::Rc;

use crate::error::{Error, Result};
use crate::token::{CollateralToken, StableToken};
use crate::utils::address::Address;

/// Funds pulled from a user into engine custody
pub enum Inbound {
    /// Collateral deposit
    Collateral {
        /// Collateral asset
        token: Rc<dyn CollateralToken>,
        /// Owner of the funds
        from: Address,
        /// Amount
        amount: u128,
    },
    /// Stable units handed back for burning
    Stable {
        /// Owner of the units
        from: Address,
        /// Amount
        amount: u128,
    },
}

/// Funds leaving the engine
pub enum Outbound {
    /// Collateral released from custody
    Collateral {
        /// Collateral asset
        token: Rc<dyn CollateralToken>,
        /// Recipient
        to: Address,
        /// Amount
        amount: u128,
    },
    /// Newly minted stable units
    Mint {
        /// Recipient
        to: Address,
        /// Amount
        amount: u128,
    },
}

/// Ordered set of transfers for one operation
pub struct Settlement {
    engine: Address,
    stable: Rc<dyn StableToken>,
    inbound: Vec<Inbound>,
    burn: Option<u128>,
    outbound: Option<Outbound>,
}

impl Settlement {
    /// Empty settlement executed on behalf of `engine`
    pub fn new(engine: Address, stable: Rc<dyn StableToken>) -> Self {
        Self {
            engine,
            stable,
            inbound: Vec::new(),
            burn: None,
            outbound: None,
        }
    }

    /// Pull collateral from `from` into custody
    pub fn pull_collateral(&mut self, token: Rc<dyn CollateralToken>, from: Address, amount: u128) {
        self.inbound.push(Inbound::Collateral { token, from, amount });
    }

    /// Pull stable units from `from` and burn them
    pub fn pull_and_burn(&mut self, from: Address, amount: u128) {
        self.inbound.push(Inbound::Stable { from, amount });
        self.burn = Some(self.burn.unwrap_or(0).saturating_add(amount));
    }

    /// Release collateral to `to`
    pub fn push_collateral(&mut self, token: Rc<dyn CollateralToken>, to: Address, amount: u128) {
        debug_assert!(self.outbound.is_none(), "one outbound step per settlement");
        self.outbound = Some(Outbound::Collateral { token, to, amount });
    }

    /// Mint stable units to `to`
    pub fn mint(&mut self, to: Address, amount: u128) {
        debug_assert!(self.outbound.is_none(), "one outbound step per settlement");
        self.outbound = Some(Outbound::Mint { to, amount });
    }

    /// Number of scheduled steps
    pub fn len(&self) -> usize {
        self.inbound.len() + usize::from(self.burn.is_some()) + usize::from(self.outbound.is_some())
    }

    /// True when nothing is scheduled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Execute every step; on failure, reverse what already happened
    pub fn execute(&self) -> Result<()> {
        for (done, step) in self.inbound.iter().enumerate() {
            if let Err(e) = self.pull(step) {
                self.compensate(&self.inbound[..done], None);
                return Err(e);
            }
        }

        if let Some(amount) = self.burn {
            if let Err(e) = self.stable.burn(&self.engine, amount) {
                tracing::warn!(amount, error = %e, "stable token burn failed");
                self.compensate(&self.inbound, None);
                return Err(Error::TransferFailed {
                    token: self.stable.address(),
                    from: self.engine,
                    to: Address::ZERO,
                    amount,
                });
            }
        }

        if let Some(step) = &self.outbound {
            if let Err(e) = self.push(step) {
                self.compensate(&self.inbound, self.burn);
                return Err(e);
            }
        }

        Ok(())
    }

    fn pull(&self, step: &Inbound) -> Result<()> {
        let (ok, token, from, amount) = match step {
            Inbound::Collateral { token, from, amount } => (
                token.transfer_from(&self.engine, from, &self.engine, *amount),
                token.address(),
                *from,
                *amount,
            ),
            Inbound::Stable { from, amount } => (
                self.stable.transfer_from(&self.engine, from, &self.engine, *amount),
                self.stable.address(),
                *from,
                *amount,
            ),
        };
        if !ok {
            return Err(Error::TransferFailed {
                token,
                from,
                to: self.engine,
                amount,
            });
        }
        Ok(())
    }

    fn push(&self, step: &Outbound) -> Result<()> {
        match step {
            Outbound::Collateral { token, to, amount } => {
                if !token.transfer(&self.engine, to, *amount) {
                    return Err(Error::TransferFailed {
                        token: token.address(),
                        from: self.engine,
                        to: *to,
                        amount: *amount,
                    });
                }
            }
            Outbound::Mint { to, amount } => {
                if !self.stable.mint(&self.engine, to, *amount) {
                    return Err(Error::MintFailed {
                        to: *to,
                        amount: *amount,
                    });
                }
            }
        }
        Ok(())
    }

    fn compensate(&self, pulled: &[Inbound], burned: Option<u128>) {
        if let Some(amount) = burned {
            if !self.stable.mint(&self.engine, &self.engine, amount) {
                tracing::error!(amount, "failed to re-mint burned units during compensation");
            }
        }

        for step in pulled.iter().rev() {
            let returned = match step {
                Inbound::Collateral { token, from, amount } => {
                    token.transfer(&self.engine, from, *amount)
                }
                Inbound::Stable { from, amount } => {
                    self.stable.transfer(&self.engine, from, *amount)
                }
            };
            if !returned {
                tracing::error!("failed to return pulled funds during compensation");
            }
        }
    }
}
