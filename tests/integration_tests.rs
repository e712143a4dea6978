//! Integration tests for the DSC engine.
//!
//! These tests drive the public façade end to end against in-memory tokens,
//! feeds and a manual clock.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use proptest::prelude::*;

use dsc_engine::core::position::LedgerSnapshot;
use dsc_engine::prelude::*;
use dsc_engine::protocol::events::EngineEvent;
use dsc_engine::token::{FungibleLedger, TokenError};

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const START: u64 = 1_704_067_200;
const FEED_UNIT: i128 = 100_000_000;

struct Protocol {
    engine: DscEngine,
    weth: Rc<MockCollateralToken>,
    wbtc: Rc<MockCollateralToken>,
    eth_feed: Rc<MockPriceFeed>,
    btc_feed: Rc<MockPriceFeed>,
    dsc: Rc<StableCoin>,
    clock: Rc<FixedClock>,
}

fn user(name: &str) -> Address {
    Address::from_label(name)
}

fn units(whole: u128) -> u128 {
    whole * PRECISION
}

fn engine_address() -> Address {
    user("dsc-engine")
}

/// WETH at $2000 and WBTC at $30000, each funded to alice, bob and carol
fn setup() -> Protocol {
    setup_with_stable_owner(engine_address())
}

fn setup_with_stable_owner(owner: Address) -> Protocol {
    let weth = Rc::new(MockCollateralToken::new(user("weth"), "WETH"));
    let wbtc = Rc::new(MockCollateralToken::new(user("wbtc"), "WBTC"));
    let eth_feed = Rc::new(MockPriceFeed::new(user("eth-usd"), 2_000 * FEED_UNIT, START));
    let btc_feed = Rc::new(MockPriceFeed::new(user("btc-usd"), 30_000 * FEED_UNIT, START));
    let dsc = Rc::new(StableCoin::new(user("dsc"), owner));
    let clock = Rc::new(FixedClock::new(START));

    for name in ["alice", "bob", "carol"] {
        weth.mint(&user(name), units(100)).unwrap();
        wbtc.mint(&user(name), units(10)).unwrap();
        weth.approve(&user(name), &engine_address(), u128::MAX);
        wbtc.approve(&user(name), &engine_address(), u128::MAX);
        dsc.approve(&user(name), &engine_address(), u128::MAX);
    }

    let engine = DscEngine::new(
        engine_address(),
        vec![
            weth.clone() as Rc<dyn CollateralToken>,
            wbtc.clone() as Rc<dyn CollateralToken>,
        ],
        vec![
            eth_feed.clone() as Rc<dyn PriceOracle>,
            btc_feed.clone() as Rc<dyn PriceOracle>,
        ],
        dsc.clone(),
        clock.clone(),
        EngineParams::default(),
    )
    .unwrap();

    Protocol {
        engine,
        weth,
        wbtc,
        eth_feed,
        btc_feed,
        dsc,
        clock,
    }
}

fn assert_solvent(p: &Protocol, users: &[Address]) {
    for u in users {
        assert!(p.engine.health_factor(u).unwrap().meets(MIN_HEALTH_FACTOR));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPOSIT / MINT LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_position_lifecycle() {
    let p = setup();
    let alice = user("alice");
    let weth = p.weth.address();

    p.engine.deposit_collateral(&alice, &weth, units(10)).unwrap();
    assert_eq!(p.engine.health_factor(&alice).unwrap(), HealthFactor::MAX);
    assert_eq!(p.engine.account_collateral_value(&alice).unwrap(), units(20_000));

    p.engine.mint_dsc(&alice, units(4_000)).unwrap();
    assert_eq!(p.dsc.balance_of(&alice), units(4_000));
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), units(4_000));

    p.engine.burn_dsc(&alice, units(1_000)).unwrap();
    assert_eq!(p.dsc.balance_of(&alice), units(3_000));
    assert_eq!(p.dsc.total_supply(), units(3_000));

    p.engine
        .redeem_collateral_for_dsc(&alice, &weth, units(4), units(3_000))
        .unwrap();
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), 0);
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), units(6));

    p.engine.redeem_collateral(&alice, &weth, units(6)).unwrap();
    assert_eq!(p.weth.balance_of(&alice), units(100));
    assert_eq!(p.weth.balance_of(&engine_address()), 0);
    assert_eq!(p.dsc.total_supply(), 0);
    assert!(p.dsc.verify_supply_invariant());
}

#[test]
fn test_boundary_health_factor_is_accepted() {
    let p = setup();
    let alice = user("alice");

    // $20,000 of collateral at a 50% threshold supports exactly 10,000 DSC
    p.engine
        .deposit_collateral_and_mint_dsc(&alice, &p.weth.address(), units(10), units(10_000))
        .unwrap();
    assert_eq!(p.engine.health_factor(&alice).unwrap().raw(), MIN_HEALTH_FACTOR);

    let err = p.engine.mint_dsc(&alice, 1).unwrap_err();
    assert!(matches!(err, Error::BreaksHealthFactor(_)));
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), units(10_000));
}

#[test]
fn test_multi_asset_collateral_value() {
    let p = setup();
    let alice = user("alice");

    p.engine.deposit_collateral(&alice, &p.weth.address(), units(5)).unwrap();
    p.engine.deposit_collateral(&alice, &p.wbtc.address(), units(1)).unwrap();
    assert_eq!(p.engine.account_collateral_value(&alice).unwrap(), units(40_000));

    p.engine.mint_dsc(&alice, units(20_000)).unwrap();
    assert_eq!(p.engine.health_factor(&alice).unwrap().raw(), MIN_HEALTH_FACTOR);

    let position = p.engine.position(&alice).unwrap();
    assert_eq!(position.collateral.len(), 2);
    assert_eq!(position.debt, units(20_000));
}

#[test]
fn test_mint_without_collateral_fails() {
    let p = setup();
    let bob = user("bob");

    let err = p.engine.mint_dsc(&bob, 1).unwrap_err();
    assert!(matches!(err, Error::BreaksHealthFactor(hf) if hf.raw() == 0));
    assert_eq!(p.dsc.total_supply(), 0);
    assert_eq!(p.engine.dsc_minted(&bob).unwrap(), 0);
}

#[test]
fn test_deposit_validation() {
    let p = setup();
    let alice = user("alice");

    assert_eq!(
        p.engine.deposit_collateral(&alice, &p.weth.address(), 0).unwrap_err(),
        Error::InvalidAmount
    );

    let doge = user("doge");
    assert_eq!(
        p.engine.deposit_collateral(&alice, &doge, units(1)).unwrap_err(),
        Error::UnsupportedAsset(doge)
    );
    assert!(p.engine.drain_events().is_empty());
}

#[test]
fn test_redeem_more_than_deposited() {
    let p = setup();
    let alice = user("alice");
    let weth = p.weth.address();

    p.engine.deposit_collateral(&alice, &weth, units(2)).unwrap();
    let err = p.engine.redeem_collateral(&alice, &weth, units(3)).unwrap_err();
    assert_eq!(
        err,
        Error::InsufficientCollateral {
            required: units(3),
            available: units(2),
        }
    );
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), units(2));
}

#[test]
fn test_burn_exceeding_debt() {
    let p = setup();
    let alice = user("alice");

    p.engine
        .deposit_collateral_and_mint_dsc(&alice, &p.weth.address(), units(10), units(1_000))
        .unwrap();
    let err = p.engine.burn_dsc(&alice, units(1_001)).unwrap_err();
    assert!(matches!(err, Error::BurnExceedsDebt { .. }));
    assert_eq!(p.dsc.balance_of(&alice), units(1_000));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE MOVEMENTS AND ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_price_halving_blocks_redeem() {
    let p = setup();
    let alice = user("alice");
    let weth = p.weth.address();

    p.engine
        .deposit_collateral_and_mint_dsc(&alice, &weth, units(10), units(5_000))
        .unwrap();
    p.eth_feed.update_answer(1_000 * FEED_UNIT, START);

    assert_eq!(p.engine.health_factor(&alice).unwrap().raw(), MIN_HEALTH_FACTOR);
    let err = p.engine.redeem_collateral(&alice, &weth, units(1)).unwrap_err();
    assert!(matches!(err, Error::BreaksHealthFactor(_)));
    assert_eq!(p.weth.balance_of(&alice), units(90));
}

#[test]
fn test_stale_price_blocks_minting() {
    let p = setup();
    let alice = user("alice");

    p.engine.deposit_collateral(&alice, &p.weth.address(), units(10)).unwrap();
    p.clock.advance(EngineParams::default().oracle_timeout_secs + 1);

    let err = p.engine.mint_dsc(&alice, units(1)).unwrap_err();
    assert!(matches!(err, Error::StalePrice { .. }));
    assert_eq!(err.code(), 4001);

    p.eth_feed.update_answer(2_000 * FEED_UNIT, p.clock.now());
    p.engine.mint_dsc(&alice, units(1)).unwrap();
}

#[test]
fn test_negative_price_rejected() {
    let p = setup();
    let alice = user("alice");

    p.engine
        .deposit_collateral_and_mint_dsc(&alice, &p.wbtc.address(), units(1), units(100))
        .unwrap();
    p.btc_feed.update_answer(-1, START);

    assert!(matches!(
        p.engine.health_factor(&alice),
        Err(Error::InvalidPrice { answer: -1, .. })
    ));
}

#[test]
fn test_price_conversions() {
    let p = setup();
    let weth = p.weth.address();

    assert_eq!(p.engine.usd_value(&weth, units(15)).unwrap(), units(30_000));
    assert_eq!(p.engine.token_amount_from_usd(&weth, units(100)).unwrap(), PRECISION / 20);
    assert!(matches!(
        p.engine.usd_value(&user("doge"), units(1)),
        Err(Error::UnsupportedAsset(_))
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION
// ═══════════════════════════════════════════════════════════════════════════════

fn underwater_alice(p: &Protocol) {
    let weth = p.weth.address();
    p.engine
        .deposit_collateral_and_mint_dsc(&user("alice"), &weth, units(10), units(10_000))
        .unwrap();
    p.engine
        .deposit_collateral_and_mint_dsc(&user("bob"), &weth, units(50), units(5_000))
        .unwrap();
    p.eth_feed.update_answer(1_800 * FEED_UNIT, START);
}

#[test]
fn test_partial_liquidation() {
    let p = setup();
    let (alice, bob) = (user("alice"), user("bob"));
    let weth = p.weth.address();
    underwater_alice(&p);
    p.engine.drain_events();

    let starting = p.engine.health_factor(&alice).unwrap();
    assert!(!starting.meets(MIN_HEALTH_FACTOR));
    assert_eq!(p.engine.liquidation_candidates().unwrap()[0].user, alice);

    let bob_weth = p.weth.balance_of(&bob);
    let preview = p.engine.quote_liquidation(&weth, &alice, units(2_000)).unwrap();
    let quote = p.engine.liquidate(&bob, &weth, &alice, units(2_000)).unwrap();
    assert_eq!(quote, preview);
    assert_eq!(quote.bonus, quote.collateral_from_debt / 10);

    let ending = p.engine.health_factor(&alice).unwrap();
    assert!(ending > starting);
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), units(8_000));
    assert_eq!(p.dsc.balance_of(&bob), units(3_000));
    assert_eq!(p.weth.balance_of(&bob), bob_weth + quote.total_collateral);
    assert_eq!(
        p.engine.collateral_balance(&alice, &weth).unwrap(),
        units(10) - quote.total_collateral
    );
    assert_eq!(p.dsc.total_supply(), units(13_000));

    let stats = p.engine.liquidation_stats();
    assert_eq!(stats.total_liquidations, 1);
    assert_eq!(stats.total_debt_liquidated, units(2_000));
    assert_eq!(stats.collateral_seized.get(&weth), Some(&quote.total_collateral));
    assert_eq!(p.engine.liquidation_history(&alice).len(), 1);

    let events = p.engine.drain_events();
    assert!(matches!(
        events.last(),
        Some(EngineEvent::PositionLiquidated(e)) if e.liquidator == bob
    ));
}

#[test]
fn test_liquidating_healthy_position_fails() {
    let p = setup();
    let weth = p.weth.address();
    p.engine
        .deposit_collateral_and_mint_dsc(&user("alice"), &weth, units(10), units(1_000))
        .unwrap();
    p.engine
        .deposit_collateral_and_mint_dsc(&user("bob"), &weth, units(10), units(1_000))
        .unwrap();

    let err = p.engine.liquidate(&user("bob"), &weth, &user("alice"), units(100)).unwrap_err();
    assert_eq!(err, Error::HealthFactorOk);
    assert_eq!(p.dsc.balance_of(&user("bob")), units(1_000));
    assert_eq!(p.engine.liquidation_stats().total_liquidations, 0);
}

#[test]
fn test_liquidator_without_units_rolls_back() {
    let p = setup();
    let (alice, carol) = (user("alice"), user("carol"));
    let weth = p.weth.address();
    underwater_alice(&p);

    let err = p.engine.liquidate(&carol, &weth, &alice, units(1_000)).unwrap_err();
    assert!(matches!(err, Error::TransferFailed { from, .. } if from == carol));
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), units(10_000));
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), units(10));
    assert_eq!(p.weth.balance_of(&carol), units(100));
}

#[test]
fn test_liquidation_exceeding_collateral_fails() {
    let p = setup();
    let weth = p.weth.address();
    underwater_alice(&p);
    p.eth_feed.update_answer(100 * FEED_UNIT, START);

    // 10,000 DSC at $100 needs 110 WETH; alice has 10
    let err = p
        .engine
        .liquidate(&user("bob"), &weth, &user("alice"), units(10_000))
        .unwrap_err();
    assert!(matches!(err, Error::InsufficientCollateral { .. }));
}

#[test]
fn test_liquidation_that_lowers_health_factor_fails() {
    let p = setup();
    let (alice, bob) = (user("alice"), user("bob"));
    let weth = p.weth.address();
    underwater_alice(&p);

    // Below 1.1x debt the seized collateral plus bonus outweighs the repaid debt
    p.eth_feed.update_answer(1_050 * FEED_UNIT, START);
    let starting = p.engine.health_factor(&alice).unwrap();

    let err = p.engine.liquidate(&bob, &weth, &alice, units(1_000)).unwrap_err();
    assert_eq!(err, Error::HealthFactorNotImproved);
    assert_eq!(p.engine.health_factor(&alice).unwrap(), starting);
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), units(10_000));
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), units(10));
    assert_eq!(p.dsc.balance_of(&bob), units(5_000));
    assert_eq!(p.weth.balance_of(&bob), units(50));
    assert_eq!(p.engine.liquidation_stats().total_liquidations, 0);
}

#[test]
fn test_undercollateralized_liquidator_rejected() {
    let p = setup();
    let (alice, bob) = (user("alice"), user("bob"));
    let weth = p.weth.address();
    for u in [&alice, &bob] {
        p.engine
            .deposit_collateral_and_mint_dsc(u, &weth, units(10), units(10_000))
            .unwrap();
    }
    p.eth_feed.update_answer(1_800 * FEED_UNIT, START);
    p.engine.drain_events();

    let err = p.engine.liquidate(&bob, &weth, &alice, units(1_000)).unwrap_err();
    assert_eq!(
        err,
        Error::BreaksHealthFactor(HealthFactor::from_raw(PRECISION * 9 / 10))
    );

    for u in [&alice, &bob] {
        assert_eq!(p.engine.dsc_minted(u).unwrap(), units(10_000));
        assert_eq!(p.engine.collateral_balance(u, &weth).unwrap(), units(10));
        assert_eq!(p.dsc.balance_of(u), units(10_000));
        assert_eq!(p.weth.balance_of(u), units(90));
    }
    assert!(p.engine.drain_events().is_empty());
    assert!(p.engine.liquidation_history(&alice).is_empty());
}

#[test]
fn test_tiny_debt_reports_bounded_health_factor() {
    let p = setup();
    let alice = user("alice");

    p.engine
        .deposit_collateral_and_mint_dsc(&alice, &p.weth.address(), units(100), 1)
        .unwrap();
    let hf = p.engine.health_factor(&alice).unwrap();
    assert_eq!(hf, HealthFactor::MAX_BOUNDED);
    assert!(!hf.is_unbounded());
    assert!(!p.engine.position(&alice).unwrap().is_liquidatable(MIN_HEALTH_FACTOR));
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATOMICITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failed_collateral_transfer_rolls_back() {
    let p = setup();
    let alice = user("alice");
    let weth = p.weth.address();

    p.weth.set_paused(true);
    let err = p
        .engine
        .deposit_collateral_and_mint_dsc(&alice, &weth, units(10), units(1_000))
        .unwrap_err();
    assert!(matches!(err, Error::TransferFailed { .. }));
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), 0);
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), 0);
    assert_eq!(p.dsc.total_supply(), 0);
    assert!(p.engine.drain_events().is_empty());
}

#[test]
fn test_failed_redeem_transfer_keeps_deposit() {
    let p = setup();
    let alice = user("alice");
    let weth = p.weth.address();

    p.engine.deposit_collateral(&alice, &weth, units(5)).unwrap();
    p.weth.set_paused(true);
    assert!(p.engine.redeem_collateral(&alice, &weth, units(5)).is_err());
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), units(5));

    p.weth.set_paused(false);
    p.engine.redeem_collateral(&alice, &weth, units(5)).unwrap();
    assert_eq!(p.weth.balance_of(&alice), units(100));
}

#[test]
fn test_failed_mint_returns_collateral() {
    let p = setup_with_stable_owner(user("someone-else"));
    let alice = user("alice");
    let weth = p.weth.address();

    let err = p
        .engine
        .deposit_collateral_and_mint_dsc(&alice, &weth, units(10), units(1_000))
        .unwrap_err();
    assert_eq!(
        err,
        Error::MintFailed {
            to: alice,
            amount: units(1_000),
        }
    );
    assert_eq!(p.weth.balance_of(&alice), units(100));
    assert_eq!(p.weth.balance_of(&engine_address()), 0);
    assert_eq!(p.engine.collateral_balance(&alice, &weth).unwrap(), 0);
    assert_eq!(p.engine.dsc_minted(&alice).unwrap(), 0);
}

// ═══════════════════════════════════════════════════════════════════════════════
// REENTRANCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral token that calls back into the engine from `transfer_from`
struct CallbackToken {
    address: Address,
    ledger: RefCell<FungibleLedger>,
    engine: RefCell<Weak<DscEngine>>,
    observed: RefCell<Vec<Error>>,
}

impl CallbackToken {
    fn new(address: Address) -> Self {
        Self {
            address,
            ledger: RefCell::new(FungibleLedger::new()),
            engine: RefCell::new(Weak::new()),
            observed: RefCell::new(Vec::new()),
        }
    }
}

impl CollateralToken for CallbackToken {
    fn address(&self) -> Address {
        self.address
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> bool {
        self.ledger.borrow_mut().transfer(from, to, amount).is_ok()
    }

    fn transfer_from(&self, spender: &Address, from: &Address, to: &Address, amount: u128) -> bool {
        if let Some(engine) = self.engine.borrow().upgrade() {
            if let Err(e) = engine.deposit_collateral(from, &self.address, amount) {
                self.observed.borrow_mut().push(e);
            }
            if let Err(e) = engine.health_factor(from) {
                self.observed.borrow_mut().push(e);
            }
        }
        let moved: std::result::Result<(), TokenError> =
            self.ledger.borrow_mut().transfer_from(spender, from, to, amount);
        moved.is_ok()
    }

    fn balance_of(&self, owner: &Address) -> u128 {
        self.ledger.borrow().balance_of(owner)
    }
}

#[test]
fn test_reentrant_callback_rejected() {
    let token = Rc::new(CallbackToken::new(user("evil")));
    let feed = Rc::new(MockPriceFeed::new(user("evil-usd"), FEED_UNIT, START));
    let alice = user("alice");
    {
        let mut ledger = token.ledger.borrow_mut();
        ledger.mint(&alice, units(10)).unwrap();
        ledger.approve(&alice, &engine_address(), u128::MAX);
    }

    let engine = Rc::new(
        DscEngine::new(
            engine_address(),
            vec![token.clone() as Rc<dyn CollateralToken>],
            vec![feed as Rc<dyn PriceOracle>],
            Rc::new(StableCoin::new(user("dsc"), engine_address())),
            Rc::new(FixedClock::new(START)),
            EngineParams::default(),
        )
        .unwrap(),
    );
    *token.engine.borrow_mut() = Rc::downgrade(&engine);

    engine.deposit_collateral(&alice, &token.address(), units(1)).unwrap();

    assert_eq!(*token.observed.borrow(), vec![Error::Reentrancy, Error::Reentrancy]);
    assert_eq!(engine.collateral_balance(&alice, &token.address()).unwrap(), units(1));
    assert_eq!(token.balance_of(&engine_address()), units(1));
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOTS
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_snapshot_round_trip() {
    let p = setup();
    underwater_alice(&p);

    let snapshot = p.engine.snapshot().unwrap();
    assert_eq!(snapshot.positions.len(), 2);
    assert_eq!(snapshot.total_debt, units(15_000));
    assert_eq!(snapshot.total_collateral(&p.weth.address()), units(60));

    let restored = LedgerSnapshot::from_bytes(&snapshot.to_bytes().unwrap()).unwrap();
    assert_eq!(restored, snapshot);
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_committed_positions_stay_solvent(
        collateral in 1u128..100,
        mint in 1u128..200_000,
        price in 100i128..5_000,
    ) {
        let p = setup();
        let alice = user("alice");
        p.eth_feed.update_answer(price * FEED_UNIT, START);

        let result = p.engine.deposit_collateral_and_mint_dsc(
            &alice,
            &p.weth.address(),
            units(collateral),
            units(mint),
        );

        let supported = collateral * price as u128 / 2;
        prop_assert_eq!(result.is_ok(), mint <= supported);
        if result.is_ok() {
            assert_solvent(&p, &[alice]);
        } else {
            prop_assert_eq!(p.engine.dsc_minted(&alice).unwrap(), 0);
            prop_assert_eq!(p.weth.balance_of(&alice), units(100));
        }
        prop_assert_eq!(p.dsc.total_supply(), p.engine.dsc_minted(&alice).unwrap());
    }

    #[test]
    fn prop_usd_round_trip_loses_at_most_one_unit(
        amount in 0u128..1_000_000_000_000_000_000_000_000,
        price in FEED_UNIT..1_000_000 * FEED_UNIT,
    ) {
        let p = setup();
        p.eth_feed.update_answer(price, START);
        let weth = p.weth.address();

        let usd = p.engine.usd_value(&weth, amount).unwrap();
        let back = p.engine.token_amount_from_usd(&weth, usd).unwrap();
        prop_assert!(back <= amount);
        prop_assert!(amount - back <= 1);
    }
}
