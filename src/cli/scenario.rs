//! Simulation scenarios.
//!
//! A scenario lists collateral assets with their starting prices, funded
//! users and an ordered list of steps. Users and assets are referred to by
//! name; addresses are derived from the names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::cli::{CliError, CliResult};
use crate::core::config::EngineParams;

/// Default scenario start time (2024-01-01T00:00:00Z)
pub const DEFAULT_START_TIME: u64 = 1_704_067_200;

// ═══════════════════════════════════════════════════════════════════════════════
// SCENARIO
// ═══════════════════════════════════════════════════════════════════════════════

/// A complete simulation input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Engine parameters (defaults when omitted)
    #[serde(default)]
    pub params: EngineParams,

    /// Unix time of the first step
    #[serde(default = "default_start_time")]
    pub start_time: u64,

    /// Collateral assets
    pub assets: Vec<AssetSpec>,

    /// Funded users
    #[serde(default)]
    pub users: Vec<UserSpec>,

    /// Steps, executed in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// A collateral asset with its starting price
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Symbol, e.g. "WETH"
    pub symbol: String,
    /// Starting USD price as a decimal string
    pub price: String,
}

/// A user and the collateral they start with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSpec {
    /// User name
    pub name: String,
    /// Symbol → starting wallet balance as a decimal string
    #[serde(default)]
    pub balances: BTreeMap<String, String>,
    /// Approve the engine for unlimited spending of every token
    #[serde(default = "default_true")]
    pub approve_engine: bool,
}

/// One simulation step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Step {
    /// Deposit collateral
    Deposit {
        /// User name
        user: String,
        /// Asset symbol
        asset: String,
        /// Amount
        amount: String,
    },
    /// Mint DSC
    Mint {
        /// User name
        user: String,
        /// Amount
        amount: String,
    },
    /// Deposit collateral and mint in one call
    DepositAndMint {
        /// User name
        user: String,
        /// Asset symbol
        asset: String,
        /// Collateral amount
        collateral: String,
        /// DSC amount
        dsc: String,
    },
    /// Redeem collateral
    Redeem {
        /// User name
        user: String,
        /// Asset symbol
        asset: String,
        /// Amount
        amount: String,
    },
    /// Burn DSC and redeem collateral in one call
    RedeemForDsc {
        /// User name
        user: String,
        /// Asset symbol
        asset: String,
        /// Collateral amount
        collateral: String,
        /// DSC amount
        dsc: String,
    },
    /// Burn DSC against the user's own debt
    Burn {
        /// User name
        user: String,
        /// Amount
        amount: String,
    },
    /// Liquidate a position
    Liquidate {
        /// Liquidator name
        liquidator: String,
        /// Liquidated user name
        user: String,
        /// Asset symbol to seize
        asset: String,
        /// Debt to cover
        debt: String,
    },
    /// Publish a new price round
    SetPrice {
        /// Asset symbol
        asset: String,
        /// USD price
        price: String,
    },
    /// Move the clock forward
    Advance {
        /// Seconds
        secs: u64,
    },
    /// Transfer DSC between users
    Transfer {
        /// Sender
        from: String,
        /// Recipient
        to: String,
        /// Amount
        amount: String,
    },
    /// Set an allowance for the engine on a token ("DSC" or an asset symbol)
    Approve {
        /// Owner name
        user: String,
        /// Token symbol
        token: String,
        /// Allowance
        amount: String,
    },
}

impl Step {
    /// Short label for reports
    pub fn action(&self) -> &'static str {
        match self {
            Step::Deposit { .. } => "deposit",
            Step::Mint { .. } => "mint",
            Step::DepositAndMint { .. } => "deposit-and-mint",
            Step::Redeem { .. } => "redeem",
            Step::RedeemForDsc { .. } => "redeem-for-dsc",
            Step::Burn { .. } => "burn",
            Step::Liquidate { .. } => "liquidate",
            Step::SetPrice { .. } => "set-price",
            Step::Advance { .. } => "advance",
            Step::Transfer { .. } => "transfer",
            Step::Approve { .. } => "approve",
        }
    }
}

impl Scenario {
    /// Parse from JSON text
    pub fn from_json(json: &str) -> CliResult<Self> {
        let scenario: Self = serde_json::from_str(json)
            .map_err(|e| CliError::Config(format!("invalid scenario: {}", e)))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Check names are unique and non-empty
    pub fn validate(&self) -> CliResult<()> {
        if self.assets.is_empty() {
            return Err(CliError::Config("scenario needs at least one asset".into()));
        }
        let mut symbols: Vec<&str> = self.assets.iter().map(|a| a.symbol.as_str()).collect();
        symbols.sort_unstable();
        if symbols.windows(2).any(|w| w[0] == w[1]) {
            return Err(CliError::Config("duplicate asset symbol".into()));
        }
        if symbols.contains(&"DSC") {
            return Err(CliError::Config("asset symbol DSC is reserved".into()));
        }

        let mut names: Vec<&str> = self.users.iter().map(|u| u.name.as_str()).collect();
        names.sort_unstable();
        if names.windows(2).any(|w| w[0] == w[1]) {
            return Err(CliError::Config("duplicate user name".into()));
        }
        Ok(())
    }
}

fn default_start_time() -> u64 {
    DEFAULT_START_TIME
}

fn default_true() -> bool {
    true
}
