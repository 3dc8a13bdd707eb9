//! Transport sessions: wire messages and the coordinator that maps
//! sessions to seats.

pub mod coordinator;
pub mod messages;

pub use coordinator::{SessionCoordinator, SessionId};
pub use messages::{ClientEvent, Reply, ServerEvent};
