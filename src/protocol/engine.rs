//! DSC engine façade.
//!
//! The engine is the only entry point that changes positions. Every
//! state-changing call:
//!
//! 1. takes the non-reentrant lock,
//! 2. applies its bookkeeping to journaled state and runs the health-factor
//!    gates against it,
//! 3. settles the external transfers the bookkeeping implies,
//! 4. commits and publishes events, or rolls everything back.
//!
//! Invariant checks cover only the users an operation touches.

use std::cell::RefCell;
use std::rc::Rc;

use crate::core::config::EngineParams;
use crate::core::debt::DebtBook;
use crate::core::health::{self, HealthFactor};
use crate::core::ledger::CollateralLedger;
use crate::core::position::{
    AccountInformation, CollateralBalance, LedgerSnapshot, PositionRecord, UserPosition,
};
use crate::error::{Error, Result};
use crate::liquidation::engine::{
    ensure_improved, ensure_liquidatable, prioritize_liquidations, LiquidationHistory,
    LiquidationQuote, LiquidationRecord, LiquidationStats,
};
use crate::oracle::clock::Clock;
use crate::oracle::price_feed::PriceOracle;
use crate::oracle::staleness::checked_price;
use crate::protocol::events::*;
use crate::protocol::guard::ReentrancyGuard;
use crate::protocol::settlement::Settlement;
use crate::token::{CollateralToken, StableToken};
use crate::utils::address::Address;
use crate::utils::math::safe_add;

// ═══════════════════════════════════════════════════════════════════════════════
// STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// An approved collateral asset and its bound feed
#[derive(Clone)]
pub struct CollateralAsset {
    /// Asset token
    pub token: Rc<dyn CollateralToken>,
    /// Price feed for the asset
    pub feed: Rc<dyn PriceOracle>,
}

#[derive(Debug, Default)]
struct EngineState {
    ledger: CollateralLedger,
    debts: DebtBook,
}

impl EngineState {
    fn commit(&mut self) {
        self.ledger.commit();
        self.debts.commit();
    }

    fn rollback(&mut self) {
        self.ledger.rollback();
        self.debts.rollback();
    }
}

/// Side effects collected while an operation runs
struct Plan {
    settlement: Settlement,
    events: Vec<EngineEvent>,
    liquidation: Option<LiquidationRecord>,
    now: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Over-collateralized stable-unit engine
pub struct DscEngine {
    address: Address,
    assets: Vec<CollateralAsset>,
    stable: Rc<dyn StableToken>,
    clock: Rc<dyn Clock>,
    params: EngineParams,
    state: RefCell<EngineState>,
    events: RefCell<EventLog>,
    liquidations: RefCell<LiquidationHistory>,
    guard: ReentrancyGuard,
}

impl DscEngine {
    /// Build an engine over paired collateral tokens and price feeds.
    ///
    /// `tokens[i]` is priced by `feeds[i]`. The asset set and parameters are
    /// fixed for the engine's lifetime.
    pub fn new(
        address: Address,
        tokens: Vec<Rc<dyn CollateralToken>>,
        feeds: Vec<Rc<dyn PriceOracle>>,
        stable: Rc<dyn StableToken>,
        clock: Rc<dyn Clock>,
        params: EngineParams,
    ) -> Result<Self> {
        params.validate()?;

        if tokens.len() != feeds.len() {
            return Err(Error::LengthMismatch {
                assets: tokens.len(),
                feeds: feeds.len(),
            });
        }

        let mut addresses = Vec::with_capacity(tokens.len());
        let mut assets = Vec::with_capacity(tokens.len());
        for (token, feed) in tokens.into_iter().zip(feeds) {
            let asset = token.address();
            if addresses.contains(&asset) {
                return Err(Error::DuplicateAsset(asset));
            }
            if feed.decimals() != params.feed_decimals {
                return Err(Error::InvalidParameter {
                    name: "feed_decimals".into(),
                    reason: format!(
                        "feed {} reports {} decimals, expected {}",
                        feed.address(),
                        feed.decimals(),
                        params.feed_decimals
                    ),
                });
            }
            addresses.push(asset);
            assets.push(CollateralAsset { token, feed });
        }

        tracing::info!(
            engine = %address.short(),
            stable = %stable.address().short(),
            assets = assets.len(),
            "DSC engine initialized"
        );

        Ok(Self {
            address,
            assets,
            stable,
            clock,
            params,
            state: RefCell::new(EngineState {
                ledger: CollateralLedger::new(addresses),
                debts: DebtBook::new(),
            }),
            events: RefCell::new(EventLog::new()),
            liquidations: RefCell::new(LiquidationHistory::new()),
            guard: ReentrancyGuard::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Move `amount` of `asset` from `user` into custody and credit it
    pub fn deposit_collateral(&self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        self.execute("deposit_collateral", |state, plan| {
            self.deposit(state, plan, user, asset, amount)
        })
    }

    /// Deposit collateral and mint against it in one call
    pub fn deposit_collateral_and_mint_dsc(
        &self,
        user: &Address,
        asset: &Address,
        amount_collateral: u128,
        amount_dsc_to_mint: u128,
    ) -> Result<()> {
        self.execute("deposit_collateral_and_mint_dsc", |state, plan| {
            self.deposit(state, plan, user, asset, amount_collateral)?;
            self.mint(state, plan, user, amount_dsc_to_mint)?;
            self.assert_not_broken(state, user)
        })
    }

    /// Withdraw collateral back to `user`
    pub fn redeem_collateral(&self, user: &Address, asset: &Address, amount: u128) -> Result<()> {
        self.execute("redeem_collateral", |state, plan| {
            self.redeem(state, plan, asset, amount, user, user)?;
            self.assert_not_broken(state, user)
        })
    }

    /// Repay debt, then withdraw collateral
    pub fn redeem_collateral_for_dsc(
        &self,
        user: &Address,
        asset: &Address,
        amount_collateral: u128,
        amount_dsc_to_burn: u128,
    ) -> Result<()> {
        self.execute("redeem_collateral_for_dsc", |state, plan| {
            self.burn(state, plan, amount_dsc_to_burn, user, user)?;
            self.redeem(state, plan, asset, amount_collateral, user, user)?;
            self.assert_not_broken(state, user)
        })
    }

    /// Mint stable units against deposited collateral
    pub fn mint_dsc(&self, user: &Address, amount: u128) -> Result<()> {
        self.execute("mint_dsc", |state, plan| {
            self.mint(state, plan, user, amount)?;
            self.assert_not_broken(state, user)
        })
    }

    /// Repay debt with the caller's own units
    pub fn burn_dsc(&self, user: &Address, amount: u128) -> Result<()> {
        self.execute("burn_dsc", |state, plan| {
            self.burn(state, plan, amount, user, user)?;
            self.assert_not_broken(state, user)
        })
    }

    /// Cover `debt_to_cover` of `user`'s debt and seize `asset` plus the bonus.
    ///
    /// Partial liquidation is allowed. The liquidator supplies the stable
    /// units; a position short of the seized amount fails with
    /// [`Error::InsufficientCollateral`] rather than being capped.
    pub fn liquidate(
        &self,
        liquidator: &Address,
        asset: &Address,
        user: &Address,
        debt_to_cover: u128,
    ) -> Result<LiquidationQuote> {
        self.execute("liquidate", |state, plan| {
            if debt_to_cover == 0 {
                return Err(Error::InvalidAmount);
            }
            state.ledger.ensure_supported(asset)?;

            let starting = self.health_factor_of(state, user)?;
            ensure_liquidatable(starting, &self.params)?;

            let price = self.price_of(asset)?;
            let quote = LiquidationQuote::compute(*asset, price, debt_to_cover, &self.params)?;
            self.redeem(state, plan, asset, quote.total_collateral, user, liquidator)?;
            self.burn(state, plan, debt_to_cover, user, liquidator)?;

            let ending = self.health_factor_of(state, user)?;
            ensure_improved(starting, ending)?;
            self.assert_not_broken(state, liquidator)?;

            plan.events.push(EngineEvent::PositionLiquidated(PositionLiquidatedEvent {
                user: *user,
                liquidator: *liquidator,
                asset: *asset,
                debt_covered: debt_to_cover,
                collateral_seized: quote.total_collateral,
                bonus: quote.bonus,
                starting_health_factor: starting,
                ending_health_factor: ending,
                timestamp: plan.now,
            }));
            plan.liquidation = Some(LiquidationRecord {
                user: *user,
                liquidator: *liquidator,
                quote,
                starting_health_factor: starting,
                ending_health_factor: ending,
                timestamp: plan.now,
            });
            Ok(quote)
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Current health factor of `user`
    pub fn health_factor(&self, user: &Address) -> Result<HealthFactor> {
        self.guard.ensure_idle()?;
        self.health_factor_of(&self.state.borrow(), user)
    }

    /// Debt and collateral value of `user`
    pub fn account_information(&self, user: &Address) -> Result<AccountInformation> {
        self.guard.ensure_idle()?;
        let state = self.state.borrow();
        Ok(AccountInformation {
            total_dsc_minted: state.debts.debt_of(user),
            collateral_value_in_usd: self.collateral_value(&state, user)?,
        })
    }

    /// Full position of `user` at current prices
    pub fn position(&self, user: &Address) -> Result<UserPosition> {
        self.guard.ensure_idle()?;
        self.position_of(&self.state.borrow(), user)
    }

    /// Deposited balance of `user` in `asset`
    pub fn collateral_balance(&self, user: &Address, asset: &Address) -> Result<u128> {
        self.guard.ensure_idle()?;
        Ok(self.state.borrow().ledger.balance_of(user, asset))
    }

    /// Outstanding debt of `user`
    pub fn dsc_minted(&self, user: &Address) -> Result<u128> {
        self.guard.ensure_idle()?;
        Ok(self.state.borrow().debts.debt_of(user))
    }

    /// Total collateral value of `user`
    pub fn account_collateral_value(&self, user: &Address) -> Result<u128> {
        self.guard.ensure_idle()?;
        self.collateral_value(&self.state.borrow(), user)
    }

    /// Value of `amount` units of `asset` at the current price
    pub fn usd_value(&self, asset: &Address, amount: u128) -> Result<u128> {
        self.guard.ensure_idle()?;
        health::usd_value(self.price_of(asset)?, amount, &self.params)
    }

    /// Units of `asset` worth `usd_amount` at the current price
    pub fn token_amount_from_usd(&self, asset: &Address, usd_amount: u128) -> Result<u128> {
        self.guard.ensure_idle()?;
        health::token_amount_from_usd(self.price_of(asset)?, usd_amount, &self.params)
    }

    /// Pure health factor for arbitrary inputs
    pub fn calculate_health_factor(
        &self,
        total_dsc_minted: u128,
        collateral_value_in_usd: u128,
    ) -> Result<HealthFactor> {
        health::calculate_health_factor(total_dsc_minted, collateral_value_in_usd, &self.params)
    }

    /// Price a liquidation of `user` without executing it
    pub fn quote_liquidation(
        &self,
        asset: &Address,
        user: &Address,
        debt_to_cover: u128,
    ) -> Result<LiquidationQuote> {
        self.guard.ensure_idle()?;
        let state = self.state.borrow();
        state.ledger.ensure_supported(asset)?;
        ensure_liquidatable(self.health_factor_of(&state, user)?, &self.params)?;
        LiquidationQuote::compute(*asset, self.price_of(asset)?, debt_to_cover, &self.params)
    }

    /// Indebted positions below the minimum health factor, worst first
    pub fn liquidation_candidates(&self) -> Result<Vec<UserPosition>> {
        self.guard.ensure_idle()?;
        let state = self.state.borrow();
        let positions = state
            .debts
            .debtors()
            .iter()
            .map(|user| self.position_of(&state, user))
            .collect::<Result<Vec<_>>>()?;
        Ok(prioritize_liquidations(positions, &self.params))
    }

    /// Aggregate statistics of committed liquidations
    pub fn liquidation_stats(&self) -> LiquidationStats {
        self.liquidations.borrow().statistics()
    }

    /// Committed liquidations of `user`, oldest first
    pub fn liquidation_history(&self, user: &Address) -> Vec<LiquidationRecord> {
        self.liquidations
            .borrow()
            .records_for(user)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Raw balances of every non-empty position
    pub fn snapshot(&self) -> Result<LedgerSnapshot> {
        self.guard.ensure_idle()?;
        let state = self.state.borrow();

        let mut users = state.ledger.depositors();
        users.extend(state.debts.debtors());
        users.sort();
        users.dedup();

        let positions = users
            .into_iter()
            .map(|user| PositionRecord {
                collateral: state.ledger.balances_of(&user),
                debt: state.debts.debt_of(&user),
                user,
            })
            .collect();

        Ok(LedgerSnapshot {
            assets: state.ledger.assets().to_vec(),
            positions,
            total_debt: state.debts.total_debt(),
        })
    }

    /// Take every published event, oldest first
    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.borrow_mut().drain()
    }

    /// Engine address (custodian of collateral, owner of the stable token)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Approved collateral assets in construction order
    pub fn collateral_tokens(&self) -> Vec<Address> {
        self.assets.iter().map(|a| a.token.address()).collect()
    }

    /// Feed bound to `asset`
    pub fn collateral_price_feed(&self, asset: &Address) -> Option<Address> {
        self.asset(asset).map(|a| a.feed.address())
    }

    /// Stable token address
    pub fn stable_token(&self) -> Address {
        self.stable.address()
    }

    /// Engine parameters
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EXECUTION
    // ═══════════════════════════════════════════════════════════════════════════

    fn execute<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut EngineState, &mut Plan) -> Result<T>,
    ) -> Result<T> {
        let _lock = self.guard.enter()?;

        let mut plan = Plan {
            settlement: Settlement::new(self.address, Rc::clone(&self.stable)),
            events: Vec::new(),
            liquidation: None,
            now: self.clock.now(),
        };

        let planned = {
            let mut state = self.state.borrow_mut();
            let planned = body(&mut state, &mut plan);
            if planned.is_err() {
                state.rollback();
            }
            planned
        };
        let value = match planned {
            Ok(value) => value,
            Err(e) => return Err(aborted(operation, e)),
        };

        tracing::debug!(operation, steps = plan.settlement.len(), "settling transfers");
        if let Err(e) = plan.settlement.execute() {
            self.state.borrow_mut().rollback();
            return Err(aborted(operation, e));
        }

        self.state.borrow_mut().commit();
        self.events.borrow_mut().extend(plan.events);
        if let Some(record) = plan.liquidation {
            tracing::info!(
                user = %record.user.short(),
                liquidator = %record.liquidator.short(),
                debt_covered = record.quote.debt_to_cover,
                seized = record.quote.total_collateral,
                starting_hf = %record.starting_health_factor,
                ending_hf = %record.ending_health_factor,
                "position liquidated"
            );
            self.liquidations.borrow_mut().record(record);
        }
        tracing::info!(operation, "operation committed");
        Ok(value)
    }

    fn deposit(
        &self,
        state: &mut EngineState,
        plan: &mut Plan,
        user: &Address,
        asset: &Address,
        amount: u128,
    ) -> Result<()> {
        state.ledger.credit(user, asset, amount)?;
        let token = self.token(asset)?;
        plan.settlement.pull_collateral(token, *user, amount);
        plan.events.push(EngineEvent::CollateralDeposited(CollateralDepositedEvent {
            user: *user,
            asset: *asset,
            amount,
            timestamp: plan.now,
        }));
        Ok(())
    }

    fn redeem(
        &self,
        state: &mut EngineState,
        plan: &mut Plan,
        asset: &Address,
        amount: u128,
        from: &Address,
        to: &Address,
    ) -> Result<()> {
        state.ledger.debit(from, asset, amount)?;
        let token = self.token(asset)?;
        plan.settlement.push_collateral(token, *to, amount);
        plan.events.push(EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from: *from,
            to: *to,
            asset: *asset,
            amount,
            timestamp: plan.now,
        }));
        Ok(())
    }

    fn mint(
        &self,
        state: &mut EngineState,
        plan: &mut Plan,
        user: &Address,
        amount: u128,
    ) -> Result<()> {
        let new_debt = state.debts.increase(user, amount)?;
        plan.settlement.mint(*user, amount);
        plan.events.push(EngineEvent::DscMinted(DscMintedEvent {
            user: *user,
            amount,
            new_debt,
            timestamp: plan.now,
        }));
        Ok(())
    }

    fn burn(
        &self,
        state: &mut EngineState,
        plan: &mut Plan,
        amount: u128,
        on_behalf_of: &Address,
        payer: &Address,
    ) -> Result<()> {
        let remaining_debt = state.debts.decrease(on_behalf_of, amount)?;
        plan.settlement.pull_and_burn(*payer, amount);
        plan.events.push(EngineEvent::DscBurned(DscBurnedEvent {
            on_behalf_of: *on_behalf_of,
            payer: *payer,
            amount,
            remaining_debt,
            timestamp: plan.now,
        }));
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PRICING
    // ═══════════════════════════════════════════════════════════════════════════

    fn asset(&self, asset: &Address) -> Option<&CollateralAsset> {
        self.assets.iter().find(|a| a.token.address() == *asset)
    }

    fn token(&self, asset: &Address) -> Result<Rc<dyn CollateralToken>> {
        self.asset(asset)
            .map(|a| Rc::clone(&a.token))
            .ok_or(Error::UnsupportedAsset(*asset))
    }

    fn price_of(&self, asset: &Address) -> Result<u128> {
        let feed = self
            .asset(asset)
            .map(|a| Rc::clone(&a.feed))
            .ok_or(Error::UnsupportedAsset(*asset))?;
        checked_price(feed.as_ref(), self.clock.now(), self.params.oracle_timeout_secs)
    }

    // Assets with a zero balance are not priced
    fn collateral_value(&self, state: &EngineState, user: &Address) -> Result<u128> {
        state
            .ledger
            .balances_of(user)
            .into_iter()
            .try_fold(0u128, |total, (asset, amount)| {
                let value = health::usd_value(self.price_of(&asset)?, amount, &self.params)?;
                safe_add(total, value)
            })
    }

    fn health_factor_of(&self, state: &EngineState, user: &Address) -> Result<HealthFactor> {
        let debt = state.debts.debt_of(user);
        if debt == 0 {
            return Ok(HealthFactor::MAX);
        }
        let value = self.collateral_value(state, user)?;
        health::calculate_health_factor(debt, value, &self.params)
    }

    fn assert_not_broken(&self, state: &EngineState, user: &Address) -> Result<()> {
        health::ensure_healthy(self.health_factor_of(state, user)?, &self.params)
    }

    fn position_of(&self, state: &EngineState, user: &Address) -> Result<UserPosition> {
        let mut collateral = Vec::new();
        let mut total = 0u128;
        for (asset, amount) in state.ledger.balances_of(user) {
            let value_in_usd = health::usd_value(self.price_of(&asset)?, amount, &self.params)?;
            total = safe_add(total, value_in_usd)?;
            collateral.push(CollateralBalance {
                asset,
                amount,
                value_in_usd,
            });
        }

        let debt = state.debts.debt_of(user);
        Ok(UserPosition {
            user: *user,
            collateral,
            debt,
            collateral_value_in_usd: total,
            health_factor: health::calculate_health_factor(debt, total, &self.params)?,
        })
    }
}

fn aborted(operation: &'static str, e: Error) -> Error {
    if e.is_critical() {
        tracing::error!(operation, code = e.code(), error = %e, "operation aborted");
    } else {
        tracing::warn!(operation, code = e.code(), error = %e, "operation aborted");
    }
    e
}
