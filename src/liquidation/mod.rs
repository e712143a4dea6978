//! Liquidation module.
//!
//! Quotes, admission gates, candidate ordering and history for liquidating
//! under-collateralized positions.

pub mod engine;

pub use engine::*;
