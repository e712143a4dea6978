//! Stale-round checks on feed reads.
//!
//! A round is rejected when it is incomplete (`updated_at == 0`), carried over
//! from an earlier round (`answered_in_round < round_id`) or older than the
//! timeout. Non-positive answers are rejected as invalid prices.

use crate::error::{Error, Result};
use crate::oracle::price_feed::{PriceOracle, RoundData};

/// Latest round of `feed`, rejected if stale
pub fn stale_checked_round(
    feed: &dyn PriceOracle,
    now: u64,
    timeout_secs: u64,
) -> Result<RoundData> {
    let round = feed.latest_round_data()?;

    let stale = round.updated_at == 0
        || round.answered_in_round < round.round_id
        || round.age(now) > timeout_secs;

    if stale {
        tracing::warn!(
            feed = %feed.address().short(),
            round_id = round.round_id,
            updated_at = round.updated_at,
            now,
            "rejecting stale price round"
        );
        return Err(Error::StalePrice {
            feed: feed.address(),
            updated_at: round.updated_at,
            now,
        });
    }

    Ok(round)
}

/// Validated positive price from `feed`, in the feed's decimals
pub fn checked_price(feed: &dyn PriceOracle, now: u64, timeout_secs: u64) -> Result<u128> {
    let round = stale_checked_round(feed, now, timeout_secs)?;
    if round.answer <= 0 {
        return Err(Error::InvalidPrice {
            feed: feed.address(),
            answer: round.answer,
        });
    }
    Ok(round.answer as u128)
}
