//! Table actors: the serial queue around each table's engine.

pub mod actor;
pub mod config;
pub mod messages;

pub use actor::TableActor;
pub use config::TableConfig;
pub use messages::{TableHandle, TableMessage};
