//! Core modules for the DSC engine.
//!
//! This module contains the fundamental building blocks:
//! - Engine parameters
//! - Collateral ledger and debt book (journaled for rollback)
//! - Health factor and price conversion
//! - Position snapshots

pub mod config;
pub mod debt;
pub mod health;
pub mod journal;
pub mod ledger;
pub mod position;

pub use config::*;
pub use debt::*;
pub use health::*;
pub use journal::*;
pub use ledger::*;
pub use position::*;
