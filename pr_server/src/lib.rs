//! WebSocket front end for the pokerroom core: router, configuration,
//! and logging bootstrap. The binary in `main.rs` wires these to the
//! dev adapters; integration tests drive the router directly.

pub mod api;
pub mod config;
pub mod logging;
