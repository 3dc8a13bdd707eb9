//! Five-card hand evaluation and winner selection.
//!
//! Scores are monotone in category and, within a category, in a kicker
//! vector, so comparing two hands reduces to comparing `(strength,
//! tiebreak)` pairs. The category ladder is variant-aware: short deck
//! ranks a flush above a full house, everything else keeps the
//! standard order.
//!
//! Omaha-family variants must use exactly two hole cards and three
//! board cards; the evaluator enumerates `C(hole,2) × C(board,3)`.
//! Everyone else gets the best five of the hole/board union. The
//! combinatorics stay tiny (`C(9,5)` = 126, `C(4,2)·C(5,3)` = 60), so
//! plain enumeration is the whole algorithm.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::entities::{ACE, Card, SeatIndex, Value};
use super::variant::Variant;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Rank {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl Rank {
    /// Position on the category ladder for the given variant. Short
    /// deck swaps flush and full house; all other categories keep the
    /// standard order everywhere.
    #[must_use]
    pub fn strength(self, variant: Variant) -> u8 {
        let swap = variant.flush_beats_full_house();
        match self {
            Self::HighCard => 0,
            Self::OnePair => 1,
            Self::TwoPair => 2,
            Self::ThreeOfAKind => 3,
            Self::Straight => 4,
            Self::Flush if swap => 6,
            Self::Flush => 5,
            Self::FullHouse if swap => 5,
            Self::FullHouse => 6,
            Self::FourOfAKind => 7,
            Self::StraightFlush => 8,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::HighCard => "high card",
            Self::OnePair => "pair",
            Self::TwoPair => "two pair",
            Self::ThreeOfAKind => "three of a kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
        };
        write!(f, "{repr}")
    }
}

/// A scored five-card hand. Ordering is total: category strength
/// first, then the kicker vector.
#[derive(Clone, Debug, Deserialize, Eq, Serialize)]
pub struct HandScore {
    pub rank: Rank,
    strength: u8,
    /// Kicker vector, most significant value first.
    pub tiebreak: Vec<Value>,
    pub best_five: Vec<Card>,
}

impl PartialEq for HandScore {
    fn eq(&self, other: &Self) -> bool {
        self.strength == other.strength && self.tiebreak == other.tiebreak
    }
}

impl Ord for HandScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.strength
            .cmp(&other.strength)
            .then_with(|| self.tiebreak.cmp(&other.tiebreak))
    }
}

impl PartialOrd for HandScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl HandScore {
    /// Human description for showdown broadcasts and hand history.
    #[must_use]
    pub fn describe(&self) -> String {
        let t = &self.tiebreak;
        match self.rank {
            Rank::StraightFlush if t[0] == ACE => "royal flush".to_string(),
            Rank::StraightFlush => format!("straight flush, {} high", value_name(t[0])),
            Rank::FourOfAKind => format!("four of a kind, {}s", value_name(t[0])),
            Rank::FullHouse => format!(
                "full house, {}s full of {}s",
                value_name(t[0]),
                value_name(t[1])
            ),
            Rank::Flush => format!("flush, {} high", value_name(t[0])),
            Rank::Straight => format!("straight, {} high", value_name(t[0])),
            Rank::ThreeOfAKind => format!("three of a kind, {}s", value_name(t[0])),
            Rank::TwoPair => format!(
                "two pair, {}s and {}s",
                value_name(t[0]),
                value_name(t[1])
            ),
            Rank::OnePair => format!("pair of {}s", value_name(t[0])),
            Rank::HighCard => format!("high card {}", value_name(t[0])),
        }
    }
}

/// A qualifying low hand in hi-lo variants: five distinct values, all
/// eight or below, ace counting as one. Smaller compares as better, so
/// the best low is the minimum.
#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct LowScore {
    /// Low values, highest first, ace stored as 1.
    pub values: [Value; 5],
}

impl LowScore {
    #[must_use]
    pub fn describe(&self) -> String {
        let names: Vec<String> = self
            .values
            .iter()
            .map(|&v| low_value_name(v).to_string())
            .collect();
        format!("low {}", names.join("-"))
    }
}

fn value_name(v: Value) -> &'static str {
    match v {
        14 => "ace",
        13 => "king",
        12 => "queen",
        11 => "jack",
        10 => "ten",
        9 => "nine",
        8 => "eight",
        7 => "seven",
        6 => "six",
        5 => "five",
        4 => "four",
        3 => "three",
        _ => "two",
    }
}

fn low_value_name(v: Value) -> &'static str {
    match v {
        1 => "A",
        2 => "2",
        3 => "3",
        4 => "4",
        5 => "5",
        6 => "6",
        7 => "7",
        _ => "8",
    }
}

/// Detect a straight in five distinct descending values. The ace plays
/// high as usual, and plays low against the variant's four lowest
/// consecutive ranks (full deck: A-2-3-4-5 with high card 5; short
/// deck: A-6-7-8-9 with high card 9).
fn straight_high(desc: &[Value], variant: Variant) -> Option<Value> {
    if desc.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    if desc.windows(2).all(|w| w[0] == w[1] + 1) {
        return Some(desc[0]);
    }
    let floor = variant.rank_floor();
    let wheel: [Value; 4] = [floor + 3, floor + 2, floor + 1, floor];
    if desc[0] == ACE && desc[1..] == wheel {
        return Some(floor + 3);
    }
    None
}

/// Score exactly five cards.
#[must_use]
pub fn evaluate_five(cards: &[Card], variant: Variant) -> HandScore {
    debug_assert_eq!(cards.len(), 5);

    let mut desc: Vec<Value> = cards.iter().map(|c| c.0).collect();
    desc.sort_unstable_by(|a, b| b.cmp(a));

    let flush = cards.iter().all(|c| c.1 == cards[0].1);
    let straight = straight_high(&desc, variant);

    // Group values by multiplicity: (count, value), biggest group
    // first, ties broken by value.
    let mut groups: Vec<(u8, Value)> = Vec::with_capacity(5);
    for &v in &desc {
        match groups.iter_mut().find(|(_, gv)| *gv == v) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, v)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let (rank, tiebreak) = match (flush, straight, groups.as_slice()) {
        (true, Some(high), _) => (Rank::StraightFlush, vec![high]),
        (_, _, [(4, quad), (1, kicker)]) => (Rank::FourOfAKind, vec![*quad, *kicker]),
        (_, _, [(3, trips), (2, pair)]) => (Rank::FullHouse, vec![*trips, *pair]),
        (true, None, _) => (Rank::Flush, desc.clone()),
        (false, Some(high), _) => (Rank::Straight, vec![high]),
        (_, _, [(3, trips), (1, k1), (1, k2)]) => (Rank::ThreeOfAKind, vec![*trips, *k1, *k2]),
        (_, _, [(2, hi), (2, lo), (1, kicker)]) => (Rank::TwoPair, vec![*hi, *lo, *kicker]),
        (_, _, [(2, pair), (1, k1), (1, k2), (1, k3)]) => {
            (Rank::OnePair, vec![*pair, *k1, *k2, *k3])
        }
        _ => (Rank::HighCard, desc.clone()),
    };

    let mut best_five = cards.to_vec();
    best_five.sort_unstable_by(|a, b| b.0.cmp(&a.0));

    HandScore {
        rank,
        strength: rank.strength(variant),
        tiebreak,
        best_five,
    }
}

/// Best five-card hand for one seat. Omaha-family variants take
/// exactly two hole cards and three board cards; everyone else takes
/// the best five of the union.
#[must_use]
pub fn best_hand(hole: &[Card], board: &[Card], variant: Variant) -> HandScore {
    let mut best: Option<HandScore> = None;
    for five in five_card_candidates(hole, board, variant) {
        let score = evaluate_five(&five, variant);
        if best.as_ref().is_none_or(|b| score > *b) {
            best = Some(score);
        }
    }
    best.expect("at least five cards to evaluate")
}

/// Best qualifying low for one seat, if any.
#[must_use]
pub fn best_low(hole: &[Card], board: &[Card], variant: Variant) -> Option<LowScore> {
    let mut best: Option<LowScore> = None;
    for five in five_card_candidates(hole, board, variant) {
        if let Some(low) = low_of_five(&five) {
            if best.as_ref().is_none_or(|b| low < *b) {
                best = Some(low);
            }
        }
    }
    best
}

fn low_of_five(cards: &[Card]) -> Option<LowScore> {
    let mut values: Vec<Value> = cards
        .iter()
        .map(|c| if c.0 == ACE { 1 } else { c.0 })
        .collect();
    values.sort_unstable_by(|a, b| b.cmp(a));
    if values[0] > 8 || values.windows(2).any(|w| w[0] == w[1]) {
        return None;
    }
    Some(LowScore {
        values: [values[0], values[1], values[2], values[3], values[4]],
    })
}

/// Enumerate every candidate five-card hand for the variant's rules.
fn five_card_candidates(hole: &[Card], board: &[Card], variant: Variant) -> Vec<Vec<Card>> {
    if variant.must_use_two() {
        debug_assert!(board.len() >= 3);
        let mut candidates = Vec::with_capacity(60);
        for h in pairs(hole.len()) {
            for b in triples(board.len()) {
                candidates.push(vec![
                    hole[h.0],
                    hole[h.1],
                    board[b.0],
                    board[b.1],
                    board[b.2],
                ]);
            }
        }
        candidates
    } else {
        let union: Vec<Card> = hole.iter().chain(board.iter()).copied().collect();
        debug_assert!(union.len() >= 5);
        let n = union.len();
        let mut candidates = Vec::with_capacity(126);
        for a in 0..n {
            for b in a + 1..n {
                for c in b + 1..n {
                    for d in c + 1..n {
                        for e in d + 1..n {
                            candidates.push(vec![
                                union[a], union[b], union[c], union[d], union[e],
                            ]);
                        }
                    }
                }
            }
        }
        candidates
    }
}

fn pairs(n: usize) -> Vec<(usize, usize)> {
    let mut out = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in i + 1..n {
            out.push((i, j));
        }
    }
    out
}

fn triples(n: usize) -> Vec<(usize, usize, usize)> {
    let mut out = Vec::with_capacity(n * (n - 1) * (n - 2) / 6);
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                out.push((i, j, k));
            }
        }
    }
    out
}

/// Seats whose high hand is maximal, with the winning score. Ties
/// return every tied seat.
#[must_use]
pub fn determine_winners(
    contenders: &[(SeatIndex, Vec<Card>)],
    board: &[Card],
    variant: Variant,
) -> (Vec<SeatIndex>, Option<HandScore>) {
    let mut winners: Vec<SeatIndex> = Vec::new();
    let mut best: Option<HandScore> = None;
    for (seat, hole) in contenders {
        let score = best_hand(hole, board, variant);
        match best.as_ref() {
            None => {
                best = Some(score);
                winners.push(*seat);
            }
            Some(current) => match score.cmp(current) {
                Ordering::Greater => {
                    best = Some(score);
                    winners.clear();
                    winners.push(*seat);
                }
                Ordering::Equal => winners.push(*seat),
                Ordering::Less => {}
            },
        }
    }
    (winners, best)
}

/// Seats whose qualifying low is best, or `None` when nobody
/// qualifies.
#[must_use]
pub fn determine_low_winners(
    contenders: &[(SeatIndex, Vec<Card>)],
    board: &[Card],
    variant: Variant,
) -> Option<(Vec<SeatIndex>, LowScore)> {
    let mut winners: Vec<SeatIndex> = Vec::new();
    let mut best: Option<LowScore> = None;
    for (seat, hole) in contenders {
        let Some(low) = best_low(hole, board, variant) else {
            continue;
        };
        match best.as_ref() {
            None => {
                best = Some(low);
                winners.push(*seat);
            }
            Some(current) => match low.cmp(current) {
                Ordering::Less => {
                    best = Some(low);
                    winners.clear();
                    winners.push(*seat);
                }
                Ordering::Equal => winners.push(*seat),
                Ordering::Greater => {}
            },
        }
    }
    best.map(|b| (winners, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Clubs, Diamonds, Hearts, Spades};

    fn score(cards: [Card; 5], variant: Variant) -> HandScore {
        evaluate_five(&cards, variant)
    }

    #[test]
    fn category_ladder_standard() {
        let high_card = score(
            [
                Card(14, Spades),
                Card(10, Hearts),
                Card(8, Clubs),
                Card(5, Diamonds),
                Card(3, Spades),
            ],
            Variant::Texas,
        );
        let pair = score(
            [
                Card(2, Spades),
                Card(2, Hearts),
                Card(8, Clubs),
                Card(5, Diamonds),
                Card(3, Spades),
            ],
            Variant::Texas,
        );
        assert!(pair > high_card);
        assert_eq!(pair.rank, Rank::OnePair);
    }

    #[test]
    fn wheel_has_high_card_five() {
        let wheel = score(
            [
                Card(14, Spades),
                Card(2, Hearts),
                Card(3, Clubs),
                Card(4, Diamonds),
                Card(5, Spades),
            ],
            Variant::Texas,
        );
        assert_eq!(wheel.rank, Rank::Straight);
        assert_eq!(wheel.tiebreak, vec![5]);

        let six_high = score(
            [
                Card(2, Spades),
                Card(3, Hearts),
                Card(4, Clubs),
                Card(5, Diamonds),
                Card(6, Spades),
            ],
            Variant::Texas,
        );
        assert!(six_high > wheel);
    }

    #[test]
    fn royal_flush_description() {
        let royal = score(
            [
                Card(14, Spades),
                Card(13, Spades),
                Card(12, Spades),
                Card(11, Spades),
                Card(10, Spades),
            ],
            Variant::Texas,
        );
        assert_eq!(royal.rank, Rank::StraightFlush);
        assert_eq!(royal.describe(), "royal flush");
    }

    #[test]
    fn short_deck_ace_low_straight() {
        // A-6-7-8-9 plays as a nine-high straight with 36 cards.
        let hand = score(
            [
                Card(14, Spades),
                Card(6, Hearts),
                Card(7, Clubs),
                Card(8, Diamonds),
                Card(9, Spades),
            ],
            Variant::ShortDeck,
        );
        assert_eq!(hand.rank, Rank::Straight);
        assert_eq!(hand.tiebreak, vec![9]);

        // The same five cards are no straight in a full deck.
        let full = score(
            [
                Card(14, Spades),
                Card(6, Hearts),
                Card(7, Clubs),
                Card(8, Diamonds),
                Card(9, Spades),
            ],
            Variant::Texas,
        );
        assert_eq!(full.rank, Rank::HighCard);
    }

    #[test]
    fn short_deck_flush_beats_full_house() {
        let flush = score(
            [
                Card(6, Spades),
                Card(7, Spades),
                Card(8, Spades),
                Card(9, Spades),
                Card(13, Spades),
            ],
            Variant::ShortDeck,
        );
        let full_house = score(
            [
                Card(13, Hearts),
                Card(13, Diamonds),
                Card(13, Clubs),
                Card(9, Hearts),
                Card(9, Diamonds),
            ],
            Variant::ShortDeck,
        );
        assert!(flush > full_house);

        // Standard order everywhere else.
        let flush_full = score(
            [
                Card(6, Spades),
                Card(7, Spades),
                Card(8, Spades),
                Card(9, Spades),
                Card(13, Spades),
            ],
            Variant::Texas,
        );
        let house_full = score(
            [
                Card(13, Hearts),
                Card(13, Diamonds),
                Card(13, Clubs),
                Card(9, Hearts),
                Card(9, Diamonds),
            ],
            Variant::Texas,
        );
        assert!(house_full > flush_full);
    }

    #[test]
    fn short_deck_flush_wins_whole_board() {
        // Spec scenario: hole 6♠7♠ on 8♠9♠T♠ K♥K♦ is a straight
        // flush via the board run; a plain flush example needs a gap.
        let hole = [Card(6, Spades), Card(7, Spades)];
        let board = [
            Card(8, Spades),
            Card(9, Spades),
            Card(10, Spades),
            Card(13, Hearts),
            Card(13, Diamonds),
        ];
        let hand = best_hand(&hole, &board, Variant::ShortDeck);
        assert!(hand.rank == Rank::StraightFlush || hand.rank == Rank::Flush);

        let opponent_hole = [Card(13, Clubs), Card(8, Hearts)];
        let opponent = best_hand(&opponent_hole, &board, Variant::ShortDeck);
        assert_eq!(opponent.rank, Rank::FullHouse);
        assert!(hand > opponent);
    }

    #[test]
    fn omaha_must_use_exactly_two_hole_cards() {
        // One spade in hand: the board's royal cannot be claimed.
        let hole = [
            Card(14, Spades),
            Card(14, Hearts),
            Card(2, Clubs),
            Card(2, Diamonds),
        ];
        let board = [
            Card(14, Clubs),
            Card(13, Spades),
            Card(12, Spades),
            Card(11, Spades),
            Card(10, Spades),
        ];
        let hand = best_hand(&hole, &board, Variant::Omaha);
        assert_eq!(hand.rank, Rank::ThreeOfAKind);
        assert_eq!(hand.tiebreak[0], 14);
    }

    #[test]
    fn texas_uses_any_five_of_seven() {
        // Same cards as the Omaha case: Texas may play the board.
        let hole = [Card(14, Hearts), Card(2, Clubs)];
        let board = [
            Card(14, Clubs),
            Card(13, Spades),
            Card(12, Spades),
            Card(11, Spades),
            Card(10, Spades),
        ];
        let hand = best_hand(&hole, &board, Variant::Texas);
        assert_eq!(hand.rank, Rank::Straight);
        assert_eq!(hand.tiebreak, vec![14]);
    }

    #[test]
    fn low_requires_five_distinct_under_nine() {
        let qualifier = low_of_five(&[
            Card(14, Spades),
            Card(2, Hearts),
            Card(4, Clubs),
            Card(6, Diamonds),
            Card(8, Spades),
        ])
        .unwrap();
        assert_eq!(qualifier.values, [8, 6, 4, 2, 1]);

        assert!(
            low_of_five(&[
                Card(14, Spades),
                Card(2, Hearts),
                Card(4, Clubs),
                Card(6, Diamonds),
                Card(9, Spades),
            ])
            .is_none()
        );
        assert!(
            low_of_five(&[
                Card(2, Spades),
                Card(2, Hearts),
                Card(4, Clubs),
                Card(6, Diamonds),
                Card(8, Spades),
            ])
            .is_none()
        );
    }

    #[test]
    fn lower_low_wins() {
        // 8-6-4-2-A loses to 6-5-4-3-2.
        let worse = LowScore {
            values: [8, 6, 4, 2, 1],
        };
        let better = LowScore {
            values: [6, 5, 4, 3, 2],
        };
        assert!(better < worse);
    }

    #[test]
    fn winners_split_on_exact_tie() {
        let board = [
            Card(14, Clubs),
            Card(13, Spades),
            Card(12, Spades),
            Card(11, Spades),
            Card(4, Hearts),
        ];
        let contenders = vec![
            (0usize, vec![Card(10, Hearts), Card(2, Clubs)]),
            (1usize, vec![Card(10, Diamonds), Card(3, Clubs)]),
            (2usize, vec![Card(4, Clubs), Card(4, Diamonds)]),
        ];
        let (winners, best) = determine_winners(&contenders, &board, Variant::Texas);
        assert_eq!(winners, vec![0, 1]);
        assert_eq!(best.unwrap().rank, Rank::Straight);
    }

    #[test]
    fn low_winner_absent_without_qualifier() {
        let board = [
            Card(14, Clubs),
            Card(13, Spades),
            Card(12, Spades),
            Card(11, Spades),
            Card(10, Hearts),
        ];
        let contenders = vec![(
            0usize,
            vec![
                Card(9, Hearts),
                Card(9, Clubs),
                Card(13, Hearts),
                Card(2, Clubs),
            ],
        )];
        assert!(determine_low_winners(&contenders, &board, Variant::OmahaHiLo).is_none());
    }
}
