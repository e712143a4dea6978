//! Price oracle integration.
//!
//! The engine reads prices through the [`PriceOracle`] trait and never trusts
//! a round blindly: every read goes through the staleness check in
//! [`staleness`], using time from a [`Clock`].

pub mod clock;
pub mod price_feed;
pub mod staleness;

pub use clock::*;
pub use price_feed::*;
pub use staleness::*;
