//! Structured error codes surfaced to clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why a raise (or other action) was rejected.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum IllegalActionReason {
    CheckWhenMustCall,
    BelowMinRaise,
    AbovePotLimit,
    InsufficientStack,
    MaxRaisesReached,
}

impl fmt::Display for IllegalActionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::CheckWhenMustCall => "check when a call is due",
            Self::BelowMinRaise => "raise below the minimum",
            Self::AbovePotLimit => "raise above the pot limit",
            Self::InsufficientStack => "bet exceeds stack",
            Self::MaxRaisesReached => "raise cap reached this round",
        };
        write!(f, "{repr}")
    }
}

/// Errors the engine and its surrounding services report to callers.
/// Validation failures leave state untouched; `DeckExhausted` is an
/// implementation bug and fatal to the hand.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unauthorized")]
    Unauthorized,
    #[error("table not found")]
    TableNotFound,
    #[error("table is full")]
    TableFull,
    #[error("seat is taken")]
    SeatTaken,
    #[error("already seated at this table")]
    AlreadySeated,
    #[error("not your turn")]
    NotYourTurn,
    #[error("illegal action: {0}")]
    ActionIllegal(IllegalActionReason),
    #[error("not in the hand")]
    NotInHand,
    #[error("too many actions, slow down")]
    RateLimited,
    #[error("actions arriving faster than a human plays")]
    TimingViolation,
    #[error("deck exhausted")]
    DeckExhausted,
    #[error("hand aborted after an internal inconsistency; bets refunded")]
    HandAborted,
    #[error("buy-in must cover at least the big blind")]
    BuyInTooSmall,
    #[error("need 2+ connected players")]
    NotEnoughPlayers,
    #[error("hand already in progress")]
    HandInProgress,
    #[error("wallet rejected the buy-in: {0}")]
    WalletRejected(String),
}
