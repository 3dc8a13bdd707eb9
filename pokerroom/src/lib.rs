//! # Pokerroom
//!
//! The authoritative core of a multi-variant online poker room.
//!
//! Players connect over a bidirectional socket, take seats, and submit
//! betting actions; the server drives each hand from deal to showdown,
//! evaluates hands, distributes pots (side pots included), and
//! broadcasts a sanitized per-viewer view of state. All game logic is
//! server-side; nobody sees an opponent's hole cards before showdown.
//!
//! ## Architecture
//!
//! - [`game`]: deck, hand evaluator, the per-table engine, and hand
//!   history. Synchronous, single-owner state.
//! - [`security`]: the anti-cheat validator gating every action (rate,
//!   timing, turn, legality, amounts).
//! - [`table`]: one tokio actor per table — the serial queue that
//!   orders mutations and broadcasts, and owns the turn/grace/next-hand
//!   timers.
//! - [`lobby`]: table registry with auto-provisioned system tables per
//!   (variant, stake).
//! - [`session`]: wire protocol and the coordinator mapping transport
//!   sessions to seats.
//! - [`auth`] / [`wallet`]: narrow seams to the external identity and
//!   money services.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pokerroom::{auth::StaticIdentities, lobby::LobbyConfig,
//!     session::SessionCoordinator, wallet::InMemoryWallet};
//!
//! # async fn run() {
//! let identity = Arc::new(StaticIdentities::new());
//! let wallet = Arc::new(InMemoryWallet::new(10_000));
//! let coordinator =
//!     SessionCoordinator::start(LobbyConfig::default(), identity, wallet).await;
//! # let _ = coordinator;
//! # }
//! ```

pub mod auth;
pub mod game;
pub mod lobby;
pub mod security;
pub mod session;
pub mod table;
pub mod wallet;

pub use game::{
    GameError, IllegalActionReason, TableEngine, Variant,
    entities::{self, Action, ActionKind, Blinds, BettingType, Card, Chips, PlayerId, Stage},
};
pub use lobby::{Lobby, LobbyConfig, StakeDef};
pub use session::{ClientEvent, Reply, ServerEvent, SessionCoordinator};
