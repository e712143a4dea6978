//! Price feed interface and an in-memory feed.
//!
//! A feed reports rounds in the familiar aggregator shape: a signed answer in
//! the feed's native decimals plus round bookkeeping used for staleness checks.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::error::Result;
use crate::utils::address::Address;
use crate::utils::constants::FEED_DECIMALS;

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// A single price round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoundData {
    /// Round identifier
    pub round_id: u64,
    /// Price in the feed's decimals (e.g. 2000_00000000 = $2000)
    pub answer: i128,
    /// Unix time the round started
    pub started_at: u64,
    /// Unix time the answer was last updated (0 = incomplete round)
    pub updated_at: u64,
    /// Round in which the answer was computed
    pub answered_in_round: u64,
}

impl RoundData {
    /// Age of the round in seconds
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.updated_at)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// External price source for one collateral asset
pub trait PriceOracle {
    /// Address identifying the feed
    fn address(&self) -> Address;

    /// Decimals of `answer`
    fn decimals(&self) -> u8;

    /// Most recent round
    fn latest_round_data(&self) -> Result<RoundData>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// MOCK PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// Settable in-memory feed
#[derive(Debug)]
pub struct MockPriceFeed {
    address: Address,
    decimals: u8,
    rounds: RefCell<Vec<RoundData>>,
    max_history: usize,
}

impl MockPriceFeed {
    /// Create a feed with one round answering `answer` at `now`
    pub fn new(address: Address, answer: i128, now: u64) -> Self {
        let feed = Self {
            address,
            decimals: FEED_DECIMALS,
            rounds: RefCell::new(Vec::new()),
            max_history: 100,
        };
        feed.update_answer(answer, now);
        feed
    }

    /// Override the reported decimals
    pub fn with_decimals(mut self, decimals: u8) -> Self {
        self.decimals = decimals;
        self
    }

    /// Publish a new complete round
    pub fn update_answer(&self, answer: i128, now: u64) -> RoundData {
        let mut rounds = self.rounds.borrow_mut();
        let round_id = rounds.last().map(|r| r.round_id + 1).unwrap_or(1);
        let round = RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        };
        rounds.push(round);
        if rounds.len() > self.max_history {
            rounds.remove(0);
        }
        round
    }

    /// Publish an arbitrary round (incomplete or carried-over rounds)
    pub fn update_round_data(&self, round: RoundData) {
        let mut rounds = self.rounds.borrow_mut();
        rounds.push(round);
        if rounds.len() > self.max_history {
            rounds.remove(0);
        }
    }

    /// Rounds published so far, oldest first
    pub fn history(&self) -> Vec<RoundData> {
        self.rounds.borrow().clone()
    }
}

impl PriceOracle for MockPriceFeed {
    fn address(&self) -> Address {
        self.address
    }

    fn decimals(&self) -> u8 {
        self.decimals
    }

    fn latest_round_data(&self) -> Result<RoundData> {
        Ok(self.rounds.borrow().last().copied().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_answer_advances_round() {
        let feed = MockPriceFeed::new(Address::from_label("eth-usd"), 2_000_0000_0000, 100);
        let first = feed.latest_round_data().unwrap();
        assert_eq!(first.round_id, 1);
        assert_eq!(first.answered_in_round, 1);

        feed.update_answer(1_000_0000_0000, 200);
        let second = feed.latest_round_data().unwrap();
        assert_eq!(second.round_id, 2);
        assert_eq!(second.answer, 1_000_0000_0000);
        assert_eq!(second.age(260), 60);
        assert_eq!(feed.history().len(), 2);
    }

    #[test]
    fn test_decimals() {
        let feed = MockPriceFeed::new(Address::from_label("eth-usd"), 1, 0);
        assert_eq!(feed.decimals(), FEED_DECIMALS);
        assert_eq!(feed.with_decimals(6).decimals(), 6);
    }
}
