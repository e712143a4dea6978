//! Engine events for off-chain observers.
//!
//! Events are published only after an operation commits; an aborted
//! operation emits nothing. They are never consumed by the engine itself.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::core::health::HealthFactor;
use crate::utils::address::Address;
use crate::utils::constants::MAX_EVENTS;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Collateral entered custody
    CollateralDeposited(CollateralDepositedEvent),
    /// Collateral left custody
    CollateralRedeemed(CollateralRedeemedEvent),
    /// Stable units were minted against a position
    DscMinted(DscMintedEvent),
    /// Debt was repaid and the units burned
    DscBurned(DscBurnedEvent),
    /// A position was partially or fully liquidated
    PositionLiquidated(PositionLiquidatedEvent),
}

impl EngineEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::DscMinted(_) => "DscMinted",
            Self::DscBurned(_) => "DscBurned",
            Self::PositionLiquidated(_) => "PositionLiquidated",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::CollateralDeposited(e) => e.timestamp,
            Self::CollateralRedeemed(e) => e.timestamp,
            Self::DscMinted(e) => e.timestamp,
            Self::DscBurned(e) => e.timestamp,
            Self::PositionLiquidated(e) => e.timestamp,
        }
    }
}

/// Collateral deposited by `user`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    /// Depositor
    pub user: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount deposited
    pub amount: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Collateral removed from `from`'s balance and sent to `to`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    /// Position debited
    pub from: Address,
    /// Recipient (the owner, or a liquidator)
    pub to: Address,
    /// Collateral asset
    pub asset: Address,
    /// Amount redeemed
    pub amount: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Debt raised and units minted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscMintedEvent {
    /// Borrower
    pub user: Address,
    /// Amount minted
    pub amount: u128,
    /// Debt after the mint
    pub new_debt: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// Debt repaid and units burned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DscBurnedEvent {
    /// Position whose debt fell
    pub on_behalf_of: Address,
    /// Account that supplied the units
    pub payer: Address,
    /// Amount burned
    pub amount: u128,
    /// Debt after the burn
    pub remaining_debt: u128,
    /// Timestamp
    pub timestamp: u64,
}

/// A liquidator covered part of a position's debt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionLiquidatedEvent {
    /// Liquidated position
    pub user: Address,
    /// Liquidator
    pub liquidator: Address,
    /// Collateral asset seized
    pub asset: Address,
    /// Debt covered
    pub debt_covered: u128,
    /// Total collateral seized, bonus included
    pub collateral_seized: u128,
    /// Bonus part of the seizure
    pub bonus: u128,
    /// Health factor before
    pub starting_health_factor: HealthFactor,
    /// Health factor after
    pub ending_health_factor: HealthFactor,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Bounded buffer of published events; the oldest are dropped first
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
    capacity: usize,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_capacity(MAX_EVENTS)
    }
}

impl EventLog {
    /// Create a log holding up to [`MAX_EVENTS`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a log holding up to `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: EngineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Append a batch in order
    pub fn extend(&mut self, events: impl IntoIterator<Item = EngineEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// Iterate over buffered events, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter()
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&EngineEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Take every buffered event
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
