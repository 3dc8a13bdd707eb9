//! Poker variants and their table rules.
//!
//! A variant fixes the deck composition, the number of hole cards, the
//! seat cap, and the evaluation rules (Omaha-style two-from-hand,
//! hi-lo split, short-deck category ordering).

use serde::{Deserialize, Serialize};
use std::fmt;

use super::entities::Value;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Texas,
    ShortDeck,
    Royal,
    Manila,
    Pineapple,
    FastFold,
    Omaha,
    OmahaHiLo,
    Courchevel,
}

impl Variant {
    pub const ALL: [Variant; 9] = [
        Variant::Texas,
        Variant::ShortDeck,
        Variant::Royal,
        Variant::Manila,
        Variant::Pineapple,
        Variant::FastFold,
        Variant::Omaha,
        Variant::OmahaHiLo,
        Variant::Courchevel,
    ];

    /// Lowest card value present in this variant's deck.
    #[must_use]
    pub fn rank_floor(self) -> Value {
        match self {
            Self::ShortDeck => 6,
            Self::Royal => 10,
            Self::Manila => 7,
            _ => 2,
        }
    }

    #[must_use]
    pub fn deck_size(self) -> usize {
        (15 - self.rank_floor() as usize) * 4
    }

    /// Hole cards dealt to each seat.
    #[must_use]
    pub fn hole_cards(self) -> usize {
        match self {
            Self::Pineapple => 3,
            Self::Omaha | Self::OmahaHiLo => 4,
            Self::Courchevel => 5,
            _ => 2,
        }
    }

    #[must_use]
    pub fn max_seats(self) -> usize {
        match self {
            Self::Texas | Self::ShortDeck => super::constants::MAX_SEATS,
            _ => super::constants::COMPACT_MAX_SEATS,
        }
    }

    /// Omaha-family hands must use exactly two hole cards and three
    /// board cards.
    #[must_use]
    pub fn must_use_two(self) -> bool {
        matches!(self, Self::Omaha | Self::OmahaHiLo | Self::Courchevel)
    }

    /// Pot splits between the best high hand and a qualifying low.
    #[must_use]
    pub fn is_hi_lo(self) -> bool {
        matches!(self, Self::OmahaHiLo)
    }

    /// With 36 cards, flushes are rarer than full houses, so the two
    /// categories swap places.
    #[must_use]
    pub fn flush_beats_full_house(self) -> bool {
        matches!(self, Self::ShortDeck)
    }

    /// Courchevel turns the first community card face up before the
    /// preflop betting round.
    #[must_use]
    pub fn preflop_board_cards(self) -> usize {
        match self {
            Self::Courchevel => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Texas => "texas",
            Self::ShortDeck => "short_deck",
            Self::Royal => "royal",
            Self::Manila => "manila",
            Self::Pineapple => "pineapple",
            Self::FastFold => "fast_fold",
            Self::Omaha => "omaha",
            Self::OmahaHiLo => "omaha_hi_lo",
            Self::Courchevel => "courchevel",
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_sizes_match_rank_sets() {
        assert_eq!(Variant::Texas.deck_size(), 52);
        assert_eq!(Variant::ShortDeck.deck_size(), 36);
        assert_eq!(Variant::Royal.deck_size(), 20);
        assert_eq!(Variant::Manila.deck_size(), 32);
    }

    #[test]
    fn hole_card_counts() {
        assert_eq!(Variant::Texas.hole_cards(), 2);
        assert_eq!(Variant::Pineapple.hole_cards(), 3);
        assert_eq!(Variant::Omaha.hole_cards(), 4);
        assert_eq!(Variant::OmahaHiLo.hole_cards(), 4);
        assert_eq!(Variant::Courchevel.hole_cards(), 5);
    }

    #[test]
    fn seat_caps() {
        assert_eq!(Variant::Texas.max_seats(), 9);
        assert_eq!(Variant::ShortDeck.max_seats(), 9);
        assert_eq!(Variant::Omaha.max_seats(), 6);
        assert_eq!(Variant::Royal.max_seats(), 6);
    }

    #[test]
    fn wire_labels_round_trip() {
        for variant in Variant::ALL {
            let json = serde_json::to_string(&variant).unwrap();
            let back: Variant = serde_json::from_str(&json).unwrap();
            assert_eq!(variant, back);
        }
        assert_eq!(
            serde_json::to_string(&Variant::OmahaHiLo).unwrap(),
            "\"omaha_hi_lo\""
        );
    }
}
