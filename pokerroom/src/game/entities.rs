use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, thread_rng};
use serde::{Deserialize, Deserializer, Serialize};
use std::{borrow::Borrow, fmt, time::Instant};

use super::{errors::GameError, variant::Variant};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
            Self::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card values run 2..=14 with the ace high at 14. Lo evaluation in
/// hi-lo variants counts the ace as 1 separately.
pub type Value = u8;

pub const ACE: Value = 14;

/// A card is a value paired with a suit. Card identity is exactly this
/// pair; there is no per-card id.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            13 => "K",
            12 => "Q",
            11 => "J",
            10 => "T",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// An ordered deck for one variant. Cards are drawn from the top; the
/// shuffle is Fisher–Yates over the OS-seeded CSPRNG, so outcomes are
/// not predictable from prior hands.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: Vec<Card>,
    next: usize,
}

impl Deck {
    /// Build the variant's rank set, take the product with the four
    /// suits, and shuffle.
    #[must_use]
    pub fn for_variant(variant: Variant) -> Self {
        let mut cards = Vec::with_capacity(variant.deck_size());
        for value in variant.rank_floor()..=ACE {
            for suit in Suit::ALL {
                cards.push(Card(value, suit));
            }
        }
        cards.shuffle(&mut thread_rng());
        Self { cards, next: 0 }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.cards.len() - self.next
    }

    /// Remove and return the top `n` cards.
    pub fn draw(&mut self, n: usize) -> Result<Vec<Card>, GameError> {
        if n > self.remaining() {
            return Err(GameError::DeckExhausted);
        }
        let drawn = self.cards[self.next..self.next + n].to_vec();
        self.next += n;
        Ok(drawn)
    }
}

/// Whole chips. Blinds, bets, and stacks are integral; fractional
/// chips never appear anywhere in the engine.
pub type Chips = u32;

/// Seat position at a table.
pub type SeatIndex = usize;

/// Table ids are strings minted by the lobby, e.g. `sys-texas-1/2-0`.
pub type TableId = String;

/// A verified player identity, as handed out by the identity resolver.
/// Whitespace is collapsed so ids are safe to embed in log lines.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(s: &str) -> Self {
        let id: String = s
            .chars()
            .map(|c| if c.is_ascii_whitespace() { '_' } else { c })
            .collect();
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for PlayerId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Blinds {
    pub small: Chips,
    pub big: Chips,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ante: Option<Chips>,
}

impl Blinds {
    #[must_use]
    pub const fn new(small: Chips, big: Chips) -> Self {
        Self {
            small,
            big,
            ante: None,
        }
    }
}

impl fmt::Display for Blinds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}/{}", self.small, self.big)?;
        if let Some(ante) = self.ante {
            write!(f, " a{ante}")?;
        }
        Ok(())
    }
}

/// Betting structure of a table.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BettingType {
    NoLimit,
    PotLimit,
}

impl fmt::Display for BettingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::NoLimit => "no-limit",
            Self::PotLimit => "pot-limit",
        };
        write!(f, "{repr}")
    }
}

/// Hand lifecycle. Stages only ever move forward within a hand:
/// waiting → preflop → flop → turn → river → showdown → waiting.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Waiting,
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Stage {
    /// True while seats may act.
    #[must_use]
    pub fn is_betting(self) -> bool {
        matches!(self, Self::Preflop | Self::Flop | Self::Turn | Self::River)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
        };
        write!(f, "{repr}")
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Fold,
    Check,
    Call,
    Raise,
    #[serde(rename = "allin")]
    AllIn,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Fold => "folds",
            Self::Check => "checks",
            Self::Call => "calls",
            Self::Raise => "raises",
            Self::AllIn => "all-ins",
        };
        write!(f, "{repr}")
    }
}

/// A betting action as submitted by a client. For raises, `amount` is
/// the target total contribution for the street, not the increment.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Action {
    pub player: PlayerId,
    pub table: TableId,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Chips>,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.kind, self.amount) {
            (ActionKind::Raise, Some(amount)) => write!(f, "{} raises to ${amount}", self.player),
            (kind, _) => write!(f, "{} {kind}", self.player),
        }
    }
}

/// The most recent applied action, kept on the table for broadcast.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LastAction {
    pub player: PlayerId,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Chips>,
}

/// A seat as the server sees it, hole cards included.
#[derive(Clone, Debug)]
pub struct Seat {
    pub player: PlayerId,
    pub display_name: String,
    pub stack: Chips,
    pub cards: Vec<Card>,
    pub folded: bool,
    pub all_in: bool,
    pub has_acted: bool,
    pub connected: bool,
    /// Contributed this street.
    pub round_bet: Chips,
    /// Contributed this hand.
    pub hand_bet: Chips,
    pub seat_index: SeatIndex,
    pub last_action_at: Option<Instant>,
}

impl Seat {
    #[must_use]
    pub fn new(
        player: PlayerId,
        display_name: String,
        stack: Chips,
        seat_index: SeatIndex,
    ) -> Self {
        Self {
            player,
            display_name,
            stack,
            cards: Vec::with_capacity(5),
            folded: false,
            all_in: false,
            has_acted: false,
            connected: true,
            round_bet: 0,
            hand_bet: 0,
            seat_index,
            last_action_at: None,
        }
    }

    /// Still eligible to win a pot.
    #[must_use]
    pub fn in_hand(&self) -> bool {
        !self.folded
    }

    /// Still has actions to make this street.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }

    /// Move chips from the stack into the pot, clamped at the stack.
    /// Returns the amount actually contributed.
    pub fn contribute(&mut self, amount: Chips) -> Chips {
        let paid = amount.min(self.stack);
        self.stack -= paid;
        self.round_bet += paid;
        self.hand_bet += paid;
        if self.stack == 0 && self.hand_bet > 0 {
            self.all_in = true;
        }
        paid
    }

    /// Post a dead ante: counts toward the hand total (and the pot)
    /// but not toward the street's call amount.
    pub fn post_ante(&mut self, amount: Chips) -> Chips {
        let paid = amount.min(self.stack);
        self.stack -= paid;
        self.hand_bet += paid;
        if self.stack == 0 && self.hand_bet > 0 {
            self.all_in = true;
        }
        paid
    }

    pub fn reset_for_hand(&mut self) {
        self.cards.clear();
        self.folded = false;
        self.all_in = false;
        self.has_acted = false;
        self.round_bet = 0;
        self.hand_bet = 0;
        self.last_action_at = None;
    }
}

/// One pot award at showdown.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Winner {
    pub player: PlayerId,
    pub amount: Chips,
    /// Human description of the winning hand, e.g. "flush, ace high".
    /// Empty when the pot was won uncontested and no hand was shown.
    pub description: String,
}

/// A seat as one viewer is allowed to see it. `cards` is `None` for
/// every seat except the viewer's own, until showdown reveals the
/// unfolded seats to everyone.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SeatView {
    pub player: PlayerId,
    pub display_name: String,
    pub stack: Chips,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cards: Option<Vec<Card>>,
    pub folded: bool,
    pub all_in: bool,
    pub connected: bool,
    pub round_bet: Chips,
    pub hand_bet: Chips,
    pub seat_index: SeatIndex,
}

/// Everything one viewer may know about a table. Produced by
/// `TableState::project_for`; the session coordinator never edits it.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableView {
    pub id: TableId,
    pub variant: Variant,
    pub betting: BettingType,
    pub blinds: Blinds,
    pub stake: String,
    pub stage: Stage,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub high_bet: Chips,
    pub hand_number: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_seat: Option<SeatIndex>,
    pub dealer_seat: SeatIndex,
    pub max_seats: usize,
    pub seats: Vec<SeatView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub winners: Vec<Winner>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action: Option<LastAction>,
}

/// One row in the lobby's table list.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TableSummary {
    pub id: TableId,
    pub variant: Variant,
    pub betting: BettingType,
    pub stake: String,
    pub blinds: Blinds,
    pub seats_taken: usize,
    pub max_seats: usize,
    pub stage: Stage,
    pub system: bool,
}
