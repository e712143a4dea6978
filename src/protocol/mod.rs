//! Protocol module - the engine façade and its execution machinery.
//!
//! The engine applies bookkeeping to journaled state under a non-reentrant
//! lock, settles external transfers, then commits and publishes events.

pub mod engine;
pub mod events;
pub mod guard;
pub mod settlement;

pub use engine::*;
pub use events::*;
pub use guard::*;
pub use settlement::*;
