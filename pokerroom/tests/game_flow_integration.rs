//! Full-hand flows through the public engine API.

use std::time::Instant;

use pokerroom::game::entities::{ActionKind, Blinds, BettingType, Chips, Stage};
use pokerroom::{TableEngine, Variant};
use proptest::prelude::*;

fn engine(variant: Variant, betting: BettingType, blinds: (Chips, Chips)) -> TableEngine {
    TableEngine::create(
        format!("it-{variant}"),
        variant,
        betting,
        Blinds::new(blinds.0, blinds.1),
        format!("{}/{}", blinds.0, blinds.1),
        true,
    )
}

fn act(e: &mut TableEngine, player: &str, kind: ActionKind, amount: Option<Chips>) {
    e.apply_action(&player.into(), kind, amount, Instant::now())
        .unwrap_or_else(|err| panic!("{player} {kind:?}: {err}"));
}

#[test]
fn three_way_hand_to_contested_showdown() {
    let mut e = engine(Variant::Texas, BettingType::NoLimit, (1, 2));
    e.add_seat("a".into(), "A".into(), 200, Some(0)).unwrap();
    e.add_seat("b".into(), "B".into(), 200, Some(1)).unwrap();
    e.add_seat("c".into(), "C".into(), 200, Some(2)).unwrap();

    // Dealer a; sb b, bb c; a opens preflop.
    assert_eq!(e.state().stage, Stage::Preflop);
    act(&mut e, "a", ActionKind::Raise, Some(6));
    act(&mut e, "b", ActionKind::Call, None);
    act(&mut e, "c", ActionKind::Call, None);

    assert_eq!(e.state().stage, Stage::Flop);
    assert_eq!(e.state().pot, 18);
    assert_eq!(e.state().board.len(), 3);

    // First to act post-flop sits left of the dealer.
    act(&mut e, "b", ActionKind::Check, None);
    act(&mut e, "c", ActionKind::Check, None);
    act(&mut e, "a", ActionKind::Check, None);
    assert_eq!(e.state().stage, Stage::Turn);
    assert_eq!(e.state().board.len(), 4);

    act(&mut e, "b", ActionKind::Raise, Some(5));
    act(&mut e, "c", ActionKind::Fold, None);
    act(&mut e, "a", ActionKind::Call, None);
    assert_eq!(e.state().stage, Stage::River);
    assert_eq!(e.state().board.len(), 5);
    assert_eq!(e.state().pot, 28);

    act(&mut e, "b", ActionKind::Check, None);
    act(&mut e, "a", ActionKind::Check, None);

    assert_eq!(e.state().stage, Stage::Showdown);
    assert!(e.state().cards_revealed);
    assert!(!e.state().winners.is_empty());

    let awarded: Chips = e.state().winners.iter().map(|w| w.amount).sum();
    assert_eq!(awarded, 28);
    let stacks: Chips = e.state().seats.iter().map(|s| s.stack).sum();
    assert_eq!(stacks, 600);
    // The folder cannot be among the winners.
    assert!(e.state().winners.iter().all(|w| w.player != "c".into()));
}

#[test]
fn hi_lo_split_conserves_chips() {
    let mut e = engine(Variant::OmahaHiLo, BettingType::PotLimit, (1, 2));
    e.add_seat("a".into(), "A".into(), 300, Some(0)).unwrap();
    e.add_seat("b".into(), "B".into(), 300, Some(1)).unwrap();

    act(&mut e, "a", ActionKind::AllIn, None);
    act(&mut e, "b", ActionKind::AllIn, None);

    assert_eq!(e.state().stage, Stage::Showdown);
    assert_eq!(e.state().board.len(), 5);
    let awarded: Chips = e.state().winners.iter().map(|w| w.amount).sum();
    assert_eq!(awarded, 600);
    let stacks: Chips = e.state().seats.iter().map(|s| s.stack).sum();
    assert_eq!(stacks, 600);
}

#[test]
fn every_variant_plays_a_full_hand() {
    for variant in Variant::ALL {
        let betting = if variant.must_use_two() {
            BettingType::PotLimit
        } else {
            BettingType::NoLimit
        };
        let mut e = engine(variant, betting, (1, 2));
        e.add_seat("a".into(), "A".into(), 100, Some(0)).unwrap();
        e.add_seat("b".into(), "B".into(), 100, Some(1)).unwrap();

        act(&mut e, "a", ActionKind::AllIn, None);
        act(&mut e, "b", ActionKind::AllIn, None);

        assert_eq!(e.state().stage, Stage::Showdown, "variant {variant}");
        assert_eq!(e.state().board.len(), 5, "variant {variant}");
        let stacks: Chips = e.state().seats.iter().map(|s| s.stack).sum();
        assert_eq!(stacks, 200, "variant {variant}");
        assert!(
            e.state()
                .seats
                .iter()
                .all(|s| s.cards.len() == variant.hole_cards()),
            "variant {variant}"
        );
    }
}

#[test]
fn stage_never_regresses_within_a_hand() {
    let mut e = engine(Variant::Texas, BettingType::NoLimit, (1, 2));
    e.add_seat("a".into(), "A".into(), 200, Some(0)).unwrap();
    e.add_seat("b".into(), "B".into(), 200, Some(1)).unwrap();

    let mut last_stage = e.state().stage;
    let script = [
        ("a", ActionKind::Call, None),
        ("b", ActionKind::Check, None),
        ("b", ActionKind::Check, None),
        ("a", ActionKind::Check, None),
        ("b", ActionKind::Check, None),
        ("a", ActionKind::Check, None),
        ("b", ActionKind::Check, None),
        ("a", ActionKind::Check, None),
    ];
    for (player, kind, amount) in script {
        act(&mut e, player, kind, amount);
        assert!(e.state().stage >= last_stage);
        last_stage = e.state().stage;
    }
    assert_eq!(e.state().stage, Stage::Showdown);
}

/// Random legal-or-rejected action sequences never break conservation:
/// at every point, stacks plus the pot equal the money that sat down.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn chips_are_conserved_under_random_play(
        commands in prop::collection::vec((0u8..5, 1u32..400), 1..60)
    ) {
        let mut e = engine(Variant::Texas, BettingType::NoLimit, (1, 2));
        e.add_seat("a".into(), "A".into(), 200, Some(0)).unwrap();
        e.add_seat("b".into(), "B".into(), 200, Some(1)).unwrap();
        e.add_seat("c".into(), "C".into(), 200, Some(2)).unwrap();

        for (op, amount) in commands {
            if !e.state().stage.is_betting() {
                break;
            }
            let Some(active) = e.state().active else { break };
            let player = e.state().seats[active].player.clone();
            let (kind, amount) = match op {
                0 => (ActionKind::Fold, None),
                1 => (ActionKind::Check, None),
                2 => (ActionKind::Call, None),
                3 => (ActionKind::AllIn, None),
                _ => (ActionKind::Raise, Some(amount)),
            };
            // Illegal submissions bounce off without mutating.
            let _ = e.apply_action(&player, kind, amount, Instant::now());

            let stacks: Chips = e.state().seats.iter().map(|s| s.stack).sum();
            let in_flight = if e.state().stage == Stage::Showdown {
                0
            } else {
                e.state().pot
            };
            prop_assert_eq!(stacks + in_flight, 600);

            let contributed: Chips =
                e.state().seats.iter().map(|s| s.hand_bet).sum();
            prop_assert_eq!(e.state().pot, contributed);
        }
    }
}
