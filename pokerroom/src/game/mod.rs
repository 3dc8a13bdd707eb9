//! Poker game core: deck, hand evaluator, per-table engine, and hand
//! history.
//!
//! The engine (`engine::TableEngine`) owns all table state and is the
//! only mutator. It is synchronous; the table actor in [`crate::table`]
//! serializes access and owns the timers.

pub mod constants;
pub mod engine;
pub mod entities;
pub mod errors;
pub mod evaluator;
pub mod history;
pub mod variant;

pub use engine::{PotLayer, TableEngine, TableState, build_pot_layers};
pub use errors::{GameError, IllegalActionReason};
pub use variant::Variant;
