//! Anti-cheat checks layered in front of the game engine.

pub mod validator;

pub use validator::{ActionValidator, ActivityKind, Severity, SuspiciousActivity};
