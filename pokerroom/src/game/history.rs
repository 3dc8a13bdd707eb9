//! Per-table hand history.
//!
//! An append-only ring of the most recent hands. The engine notifies
//! the history at hand start, on every applied action, and at hand
//! end; nothing here is persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::constants::HAND_HISTORY_CAPACITY;
use super::entities::{ActionKind, Card, Chips, PlayerId, SeatIndex, Winner};

/// One action as it went into the pot.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecordedAction {
    pub player: PlayerId,
    pub kind: ActionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Chips>,
    pub timestamp: DateTime<Utc>,
}

/// Starting state of one seat when the hand was dealt.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StartingSeat {
    pub player: PlayerId,
    pub seat_index: SeatIndex,
    /// Stack before blinds were posted.
    pub stack: Chips,
    pub cards: Vec<Card>,
}

/// A finished (or in-flight) hand.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct HandRecord {
    pub hand_number: u64,
    pub seats: Vec<StartingSeat>,
    pub actions: Vec<RecordedAction>,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub winners: Vec<Winner>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Bounded ring of recent hands for one table.
#[derive(Clone, Debug, Default)]
pub struct HandHistory {
    hands: VecDeque<HandRecord>,
    current: Option<HandRecord>,
}

impl HandHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a record for a freshly dealt hand. An unfinished previous
    /// record (aborted hand) is dropped.
    pub fn begin(&mut self, hand_number: u64, seats: Vec<StartingSeat>) {
        self.current = Some(HandRecord {
            hand_number,
            seats,
            actions: Vec::new(),
            board: Vec::new(),
            pot: 0,
            winners: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        });
    }

    pub fn record_action(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
    ) {
        if let Some(current) = self.current.as_mut() {
            current.actions.push(RecordedAction {
                player: player.clone(),
                kind,
                amount,
                timestamp: Utc::now(),
            });
        }
    }

    /// Close the current record and push it into the ring.
    pub fn finish(&mut self, board: &[Card], pot: Chips, winners: &[Winner]) {
        let Some(mut current) = self.current.take() else {
            return;
        };
        current.board = board.to_vec();
        current.pot = pot;
        current.winners = winners.to_vec();
        current.finished_at = Some(Utc::now());
        if self.hands.len() == HAND_HISTORY_CAPACITY {
            self.hands.pop_front();
        }
        self.hands.push_back(current);
    }

    /// Drop the in-flight record without retaining it (aborted hand).
    pub fn discard(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn recent(&self) -> impl Iterator<Item = &HandRecord> {
        self.hands.iter().rev()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(player: &str, idx: SeatIndex, stack: Chips) -> StartingSeat {
        StartingSeat {
            player: player.into(),
            seat_index: idx,
            stack,
            cards: Vec::new(),
        }
    }

    #[test]
    fn ring_caps_at_capacity() {
        let mut history = HandHistory::new();
        for n in 0..(HAND_HISTORY_CAPACITY as u64 + 20) {
            history.begin(n, vec![seat("a", 0, 100)]);
            history.finish(&[], 0, &[]);
        }
        assert_eq!(history.len(), HAND_HISTORY_CAPACITY);
        // Oldest hands were dropped.
        let oldest = history.hands.front().unwrap().hand_number;
        assert_eq!(oldest, 20);
    }

    #[test]
    fn actions_attach_to_current_hand() {
        let mut history = HandHistory::new();
        history.begin(1, vec![seat("a", 0, 100), seat("b", 1, 100)]);
        history.record_action(&"a".into(), ActionKind::Call, None);
        history.record_action(&"b".into(), ActionKind::Check, None);
        history.finish(&[], 4, &[]);

        let hand = history.recent().next().unwrap();
        assert_eq!(hand.actions.len(), 2);
        assert_eq!(hand.pot, 4);
        assert!(hand.finished_at.is_some());
    }

    #[test]
    fn discard_drops_in_flight_record() {
        let mut history = HandHistory::new();
        history.begin(1, vec![seat("a", 0, 100)]);
        history.discard();
        history.finish(&[], 0, &[]);
        assert!(history.is_empty());
    }
}
