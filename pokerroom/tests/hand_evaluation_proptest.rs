//! Property-based tests for the hand evaluator.
//!
//! The evaluator's contract: scoring is a pure total order over
//! five-card hands, insensitive to card order, and `best_hand` is the
//! maximum over every candidate combination the variant allows.

use pokerroom::Variant;
use pokerroom::game::entities::{Card, Suit};
use pokerroom::game::evaluator::{best_hand, determine_winners, evaluate_five};
use proptest::prelude::*;

fn full_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(52);
    for value in 2..=14u8 {
        for suit in [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades] {
            cards.push(Card(value, suit));
        }
    }
    cards
}

/// `n` distinct cards in random order.
fn cards_strategy(n: usize) -> impl Strategy<Value = Vec<Card>> {
    proptest::sample::subsequence(full_deck(), n).prop_shuffle()
}

proptest! {
    /// Scoring ignores the order cards arrive in.
    #[test]
    fn score_is_permutation_invariant(cards in cards_strategy(5)) {
        let score = evaluate_five(&cards, Variant::Texas);
        let mut rotated = cards.clone();
        rotated.rotate_left(2);
        prop_assert_eq!(score, evaluate_five(&rotated, Variant::Texas));
    }

    /// A hand never beats itself and comparison is symmetric.
    #[test]
    fn comparison_is_consistent(a in cards_strategy(5), b in cards_strategy(5)) {
        let sa = evaluate_five(&a, Variant::Texas);
        let sb = evaluate_five(&b, Variant::Texas);
        prop_assert_eq!(sa.cmp(&sb), sb.cmp(&sa).reverse());
        prop_assert_eq!(sa.cmp(&sa), std::cmp::Ordering::Equal);
    }

    /// The best seven-card hand is at least as good as every five-card
    /// subset.
    #[test]
    fn best_hand_dominates_every_subset(cards in cards_strategy(7)) {
        let hole = &cards[..2];
        let board = &cards[2..];
        let best = best_hand(hole, board, Variant::Texas);

        for a in 0..7 {
            for b in a + 1..7 {
                for c in b + 1..7 {
                    for d in c + 1..7 {
                        for e in d + 1..7 {
                            let five =
                                vec![cards[a], cards[b], cards[c], cards[d], cards[e]];
                            prop_assert!(best >= evaluate_five(&five, Variant::Texas));
                        }
                    }
                }
            }
        }
    }

    /// Omaha never scores better than the unconstrained best five of
    /// the same nine cards: the two-from-hand rule only removes
    /// combinations.
    #[test]
    fn omaha_constraint_only_restricts(cards in cards_strategy(9)) {
        let hole = &cards[..4];
        let board = &cards[4..];
        let omaha = best_hand(hole, board, Variant::Omaha);

        // The Omaha score can never exceed the best five of the full
        // nine, since two-from-hand only removes combinations.
        let mut best_of_nine = None::<pokerroom::game::evaluator::HandScore>;
        for a in 0..9 {
            for b in a + 1..9 {
                for c in b + 1..9 {
                    for d in c + 1..9 {
                        for e in d + 1..9 {
                            let five = vec![cards[a], cards[b], cards[c], cards[d], cards[e]];
                            let score = evaluate_five(&five, Variant::Texas);
                            if best_of_nine.as_ref().is_none_or(|s| score > *s) {
                                best_of_nine = Some(score);
                            }
                        }
                    }
                }
            }
        }
        prop_assert!(omaha <= best_of_nine.unwrap());
    }

    /// Winner selection returns a non-empty subset of contenders, and
    /// the set does not depend on contender order.
    #[test]
    fn winners_are_order_independent(cards in cards_strategy(11)) {
        let board = cards[..5].to_vec();
        let contenders: Vec<(usize, Vec<Card>)> = vec![
            (0, cards[5..7].to_vec()),
            (1, cards[7..9].to_vec()),
            (2, cards[9..11].to_vec()),
        ];
        let (winners, best) = determine_winners(&contenders, &board, Variant::Texas);
        prop_assert!(!winners.is_empty());
        prop_assert!(best.is_some());
        prop_assert!(winners.iter().all(|w| *w < 3));

        let reversed: Vec<(usize, Vec<Card>)> =
            contenders.iter().rev().cloned().collect();
        let (mut winners_rev, _) = determine_winners(&reversed, &board, Variant::Texas);
        let mut winners_sorted = winners.clone();
        winners_sorted.sort_unstable();
        winners_rev.sort_unstable();
        prop_assert_eq!(winners_sorted, winners_rev);
    }
}

#[test]
fn known_ladder_spot_checks() {
    let quads = evaluate_five(
        &[
            Card(9, Suit::Clubs),
            Card(9, Suit::Diamonds),
            Card(9, Suit::Hearts),
            Card(9, Suit::Spades),
            Card(2, Suit::Clubs),
        ],
        Variant::Texas,
    );
    let boat = evaluate_five(
        &[
            Card(14, Suit::Clubs),
            Card(14, Suit::Diamonds),
            Card(14, Suit::Hearts),
            Card(13, Suit::Spades),
            Card(13, Suit::Clubs),
        ],
        Variant::Texas,
    );
    assert!(quads > boat);
    assert_eq!(quads.describe(), "four of a kind, nines");
    assert_eq!(boat.describe(), "full house, aces full of kings");
}
