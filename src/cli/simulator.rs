//! Scenario simulator.
//!
//! Builds an engine over in-memory collaborators and replays a scenario
//! step by step. A failing step is reported and the run continues, the same
//! way a rejected transaction leaves the chain state untouched.

use serde::Serialize;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::cli::scenario::{Scenario, Step};
use crate::cli::{format_units, parse_price, parse_units, CliError, CliResult};
use crate::liquidation::engine::LiquidationStats;
use crate::oracle::clock::{Clock, FixedClock};
use crate::oracle::price_feed::{MockPriceFeed, PriceOracle};
use crate::protocol::engine::DscEngine;
use crate::token::{CollateralToken, MockCollateralToken, StableCoin, StableToken};
use crate::utils::address::Address;

/// Label of the engine's address
pub const ENGINE_LABEL: &str = "dsc-engine";

/// Label of the stable token's address
pub const STABLE_LABEL: &str = "DSC";

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Step number, starting at 1
    pub index: usize,
    /// Step action
    pub action: &'static str,
    /// Whether the step succeeded
    pub ok: bool,
    /// Summary of what happened
    pub detail: String,
    /// Engine error code on failure
    pub code: Option<u32>,
}

/// Position summary in display units
#[derive(Debug, Clone, Serialize)]
pub struct PositionSummary {
    /// User name
    pub user: String,
    /// Asset symbol → deposited amount
    pub collateral: BTreeMap<String, String>,
    /// Outstanding debt
    pub debt: String,
    /// Collateral value in USD
    pub collateral_value: String,
    /// Health factor
    pub health_factor: String,
    /// DSC wallet balance
    pub dsc_balance: String,
}

/// Full simulation output
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Per-step outcomes
    pub steps: Vec<StepOutcome>,
    /// Final positions, by user name
    pub positions: Vec<PositionSummary>,
    /// Events published during the run
    pub events: usize,
    /// Liquidation statistics
    pub liquidations: LiquidationStats,
}

impl SimulationReport {
    /// Number of failed steps
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATION
// ═══════════════════════════════════════════════════════════════════════════════

/// An engine wired to in-memory tokens, feeds and a manual clock
pub struct Simulation {
    engine: DscEngine,
    dsc: Rc<StableCoin>,
    tokens: BTreeMap<String, Rc<MockCollateralToken>>,
    feeds: BTreeMap<String, Rc<MockPriceFeed>>,
    clock: Rc<FixedClock>,
    users: BTreeMap<String, Address>,
    events: usize,
}

impl Simulation {
    /// Build the engine and fund the users of `scenario`
    pub fn new(scenario: &Scenario) -> CliResult<Self> {
        scenario.validate()?;

        let engine_address = Address::from_label(ENGINE_LABEL);
        let clock = Rc::new(FixedClock::new(scenario.start_time));
        let dsc = Rc::new(StableCoin::new(Address::from_label(STABLE_LABEL), engine_address));

        let mut tokens = BTreeMap::new();
        let mut feeds = BTreeMap::new();
        let mut token_list: Vec<Rc<dyn CollateralToken>> = Vec::new();
        let mut feed_list: Vec<Rc<dyn PriceOracle>> = Vec::new();
        for asset in &scenario.assets {
            let token = Rc::new(MockCollateralToken::new(
                Address::from_label(&asset.symbol),
                asset.symbol.clone(),
            ));
            let feed = Rc::new(MockPriceFeed::new(
                Address::from_label(&format!("{}/USD", asset.symbol)),
                parse_price(&asset.price)?,
                scenario.start_time,
            ));
            token_list.push(token.clone());
            feed_list.push(feed.clone());
            tokens.insert(asset.symbol.clone(), token);
            feeds.insert(asset.symbol.clone(), feed);
        }

        let engine = DscEngine::new(
            engine_address,
            token_list,
            feed_list,
            dsc.clone(),
            clock.clone(),
            scenario.params.clone(),
        )?;

        let mut sim = Self {
            engine,
            dsc,
            tokens,
            feeds,
            clock,
            users: BTreeMap::new(),
            events: 0,
        };

        for user in &scenario.users {
            let address = Address::from_label(&user.name);
            sim.users.insert(user.name.clone(), address);

            for (symbol, amount) in &user.balances {
                let token = sim.token(symbol)?;
                let amount = parse_units(amount)?;
                if amount > 0 {
                    token
                        .mint(&address, amount)
                        .map_err(|e| CliError::Config(format!("funding {}: {}", user.name, e)))?;
                }
            }
            if user.approve_engine {
                for token in sim.tokens.values() {
                    token.approve(&address, &engine_address, u128::MAX);
                }
                sim.dsc.approve(&address, &engine_address, u128::MAX);
            }
        }

        tracing::info!(
            assets = scenario.assets.len(),
            users = scenario.users.len(),
            "simulation ready"
        );
        Ok(sim)
    }

    /// Run every step of `scenario` and report the final state
    pub fn run(scenario: &Scenario) -> CliResult<SimulationReport> {
        let mut sim = Self::new(scenario)?;
        let steps = scenario
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| sim.apply(i + 1, step))
            .collect::<CliResult<Vec<_>>>()?;

        Ok(SimulationReport {
            steps,
            positions: sim.positions(),
            events: sim.events,
            liquidations: sim.engine.liquidation_stats(),
        })
    }

    /// The simulated engine
    pub fn engine(&self) -> &DscEngine {
        &self.engine
    }

    /// Address of a named user
    pub fn user(&self, name: &str) -> CliResult<Address> {
        self.users
            .get(name)
            .copied()
            .ok_or_else(|| CliError::Config(format!("unknown user '{}'", name)))
    }

    /// Execute one step.
    ///
    /// Engine rejections become failed outcomes; malformed steps (unknown
    /// names, unparsable amounts) abort the run.
    pub fn apply(&mut self, index: usize, step: &Step) -> CliResult<StepOutcome> {
        let result = match step {
            Step::Deposit { user, asset, amount } => {
                let (user, asset) = (self.user(user)?, self.asset(asset)?);
                let amount = parse_units(amount)?;
                self.engine
                    .deposit_collateral(&user, &asset, amount)
                    .map(|()| format!("deposited {}", format_units(amount)))
            }
            Step::Mint { user, amount } => {
                let (user, amount) = (self.user(user)?, parse_units(amount)?);
                self.engine
                    .mint_dsc(&user, amount)
                    .map(|()| format!("minted {} DSC", format_units(amount)))
            }
            Step::DepositAndMint { user, asset, collateral, dsc } => {
                let (user, asset) = (self.user(user)?, self.asset(asset)?);
                let (collateral, dsc) = (parse_units(collateral)?, parse_units(dsc)?);
                self.engine
                    .deposit_collateral_and_mint_dsc(&user, &asset, collateral, dsc)
                    .map(|()| {
                        format!(
                            "deposited {} and minted {} DSC",
                            format_units(collateral),
                            format_units(dsc)
                        )
                    })
            }
            Step::Redeem { user, asset, amount } => {
                let (user, asset) = (self.user(user)?, self.asset(asset)?);
                let amount = parse_units(amount)?;
                self.engine
                    .redeem_collateral(&user, &asset, amount)
                    .map(|()| format!("redeemed {}", format_units(amount)))
            }
            Step::RedeemForDsc { user, asset, collateral, dsc } => {
                let (user, asset) = (self.user(user)?, self.asset(asset)?);
                let (collateral, dsc) = (parse_units(collateral)?, parse_units(dsc)?);
                self.engine
                    .redeem_collateral_for_dsc(&user, &asset, collateral, dsc)
                    .map(|()| {
                        format!(
                            "burned {} DSC and redeemed {}",
                            format_units(dsc),
                            format_units(collateral)
                        )
                    })
            }
            Step::Burn { user, amount } => {
                let (user, amount) = (self.user(user)?, parse_units(amount)?);
                self.engine
                    .burn_dsc(&user, amount)
                    .map(|()| format!("burned {} DSC", format_units(amount)))
            }
            Step::Liquidate { liquidator, user, asset, debt } => {
                let (liquidator, user) = (self.user(liquidator)?, self.user(user)?);
                let (asset, debt) = (self.asset(asset)?, parse_units(debt)?);
                self.engine
                    .liquidate(&liquidator, &asset, &user, debt)
                    .map(|quote| {
                        format!(
                            "covered {} DSC, seized {} (bonus {})",
                            format_units(quote.debt_to_cover),
                            format_units(quote.total_collateral),
                            format_units(quote.bonus)
                        )
                    })
            }
            Step::SetPrice { asset, price } => {
                let feed = self.feed(asset)?;
                let round = feed.update_answer(parse_price(price)?, self.clock.now());
                Ok(format!("round {} at {}", round.round_id, price))
            }
            Step::Advance { secs } => {
                self.clock.advance(*secs);
                Ok(format!("clock at {}", self.clock.now()))
            }
            Step::Transfer { from, to, amount } => {
                let (from, to, amount) = (self.user(from)?, self.user(to)?, parse_units(amount)?);
                if self.dsc.transfer(&from, &to, amount) {
                    Ok(format!("transferred {} DSC", format_units(amount)))
                } else {
                    Ok(format!("transfer of {} DSC refused", format_units(amount)))
                }
            }
            Step::Approve { user, token, amount } => {
                let (user, amount) = (self.user(user)?, parse_units(amount)?);
                let spender = self.engine.address();
                if token == STABLE_LABEL {
                    self.dsc.approve(&user, &spender, amount);
                } else {
                    self.token(token)?.approve(&user, &spender, amount);
                }
                Ok(format!("approved {} {}", format_units(amount), token))
            }
        };

        self.events += self.engine.drain_events().len();
        let outcome = match result {
            Ok(detail) => StepOutcome {
                index,
                action: step.action(),
                ok: true,
                detail,
                code: None,
            },
            Err(e) => StepOutcome {
                index,
                action: step.action(),
                ok: false,
                detail: e.to_string(),
                code: Some(e.code()),
            },
        };
        Ok(outcome)
    }

    /// Summaries of every named user, in name order
    pub fn positions(&self) -> Vec<PositionSummary> {
        self.users
            .iter()
            .map(|(name, address)| self.summary(name, address))
            .collect()
    }

    fn summary(&self, name: &str, address: &Address) -> PositionSummary {
        let mut collateral = BTreeMap::new();
        for (symbol, token) in &self.tokens {
            let amount = self
                .engine
                .collateral_balance(address, &token.address())
                .unwrap_or_default();
            if amount > 0 {
                collateral.insert(symbol.clone(), format_units(amount));
            }
        }

        let (collateral_value, health_factor) = match self.engine.position(address) {
            Ok(position) => (
                format_units(position.collateral_value_in_usd),
                position
                    .health_factor
                    .to_decimal_string(self.engine.params().precision),
            ),
            Err(e) => ("n/a".to_string(), format!("n/a ({})", e)),
        };

        PositionSummary {
            user: name.to_string(),
            collateral,
            debt: format_units(self.engine.dsc_minted(address).unwrap_or_default()),
            collateral_value,
            health_factor,
            dsc_balance: format_units(self.dsc.balance_of(address)),
        }
    }

    fn token(&self, symbol: &str) -> CliResult<Rc<MockCollateralToken>> {
        self.tokens
            .get(symbol)
            .cloned()
            .ok_or_else(|| CliError::Config(format!("unknown asset '{}'", symbol)))
    }

    fn asset(&self, symbol: &str) -> CliResult<Address> {
        Ok(self.token(symbol)?.address())
    }

    fn feed(&self, symbol: &str) -> CliResult<Rc<MockPriceFeed>> {
        self.feeds
            .get(symbol)
            .cloned()
            .ok_or_else(|| CliError::Config(format!("unknown asset '{}'", symbol)))
    }
}
