//! # DSC Engine
//!
//! An over-collateralized synthetic dollar. Users lock approved collateral
//! tokens, mint the DSC stable unit against them, and stay above a minimum
//! health factor. Undercollateralized positions can be liquidated by anyone
//! who repays part of the debt in exchange for collateral plus a bonus.
//!
//! ## Architecture
//!
//! - **Core**: Parameters, the collateral ledger, the debt book and health factors
//! - **Oracle**: Price feeds with staleness checks
//! - **Token**: Collateral and stable-unit token interfaces with in-memory implementations
//! - **Protocol**: The engine façade, reentrancy guard, settlement and events
//! - **Liquidation**: Liquidation quotes, ordering and history
//! - **CLI**: Scenario simulator behind the `dsc` binary
//!
//! Every state-changing operation is atomic: ledger writes are journaled and
//! rolled back, and token movements are compensated, when any step fails.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsc_engine::prelude::*;
//!
//! engine.deposit_collateral_and_mint_dsc(user, weth, 10 * PRECISION, 10_000 * PRECISION)?;
//! assert!(engine.health_factor(user)?.meets(MIN_HEALTH_FACTOR));
//! ```

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod liquidation;
pub mod oracle;
pub mod protocol;
pub mod token;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        config::EngineParams,
        health::{calculate_health_factor, HealthFactor},
        position::UserPosition,
    };
    pub use crate::error::{Error, Result};
    pub use crate::liquidation::engine::{LiquidationQuote, LiquidationRecord, LiquidationStats};
    pub use crate::oracle::{
        clock::{Clock, FixedClock, SystemClock},
        price_feed::{MockPriceFeed, PriceOracle, RoundData},
    };
    pub use crate::protocol::{
        engine::DscEngine,
        events::{EngineEvent, EventLog},
    };
    pub use crate::token::{CollateralToken, MockCollateralToken, StableCoin, StableToken};
    pub use crate::utils::{
        address::Address,
        constants::{MIN_HEALTH_FACTOR, PRECISION},
    };
}

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
