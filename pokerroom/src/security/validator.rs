//! Action validation and automation heuristics.
//!
//! One validator sits in front of each table's engine. Every incoming
//! action passes five checks, in order: the rolling rate budget, the
//! inter-action timing floor, the turn, the action kind's legality,
//! and the amounts. The first two live here; the rest are delegated
//! to the engine's own `check_action`, which sees the table state.
//!
//! The validator is stateful only in its per-player rate and timing
//! buckets and the bounded log of suspicious activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::game::constants::{
    ACTION_RATE_LIMIT, ACTION_RATE_WINDOW, ACTIVITY_LOG_CAPACITY, MIN_ACTION_INTERVAL,
    SUSPECT_ACTION_INTERVAL,
};
use crate::game::engine::TableEngine;
use crate::game::entities::{Action, PlayerId, TableId};
use crate::game::errors::GameError;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// More than the allowed actions inside the rolling window.
    RateExceeded,
    /// Inter-action delta under the hard floor.
    SubhumanTiming,
    /// Legal but suspiciously quick (between the floor and 200 ms).
    FastAction,
}

/// One flagged event, retained in a bounded log for the admin surface
/// to drain.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SuspiciousActivity {
    pub player: PlayerId,
    pub table: TableId,
    pub kind: ActivityKind,
    pub severity: Severity,
    pub at: DateTime<Utc>,
}

/// Per-table action validator.
pub struct ActionValidator {
    table: TableId,
    /// Action instants per player inside the rolling window.
    windows: HashMap<PlayerId, VecDeque<Instant>>,
    /// Most recent action instant per player, for the timing floor.
    last_action: HashMap<PlayerId, Instant>,
    log: VecDeque<SuspiciousActivity>,
}

impl ActionValidator {
    #[must_use]
    pub fn new(table: TableId) -> Self {
        Self {
            table,
            windows: HashMap::new(),
            last_action: HashMap::new(),
            log: VecDeque::new(),
        }
    }

    /// Run all five checks against an incoming action. On success the
    /// action may be applied; on failure nothing was mutated and the
    /// error goes back to the caller.
    pub fn validate(
        &mut self,
        engine: &TableEngine,
        action: &Action,
        now: Instant,
    ) -> Result<(), GameError> {
        self.check_rate(&action.player, now)?;
        self.check_timing(&action.player, now)?;
        engine.check_action(&action.player, action.kind, action.amount)
    }

    fn check_rate(&mut self, player: &PlayerId, now: Instant) -> Result<(), GameError> {
        let window = self.windows.entry(player.clone()).or_default();
        while window
            .front()
            .is_some_and(|&t| now.duration_since(t) > ACTION_RATE_WINDOW)
        {
            window.pop_front();
        }
        // Attempts count against the budget whether or not they land.
        window.push_back(now);
        if window.len() > ACTION_RATE_LIMIT {
            log::warn!("table {}: {player} exceeded the action rate budget", self.table);
            self.flag(player, ActivityKind::RateExceeded, Severity::Medium);
            return Err(GameError::RateLimited);
        }
        Ok(())
    }

    fn check_timing(&mut self, player: &PlayerId, now: Instant) -> Result<(), GameError> {
        let previous = self.last_action.insert(player.clone(), now);
        let Some(previous) = previous else {
            return Ok(());
        };
        let delta = now.duration_since(previous);
        if delta < MIN_ACTION_INTERVAL {
            log::warn!(
                "table {}: {player} acted after {}ms, rejecting",
                self.table,
                delta.as_millis()
            );
            self.flag(player, ActivityKind::SubhumanTiming, Severity::High);
            return Err(GameError::TimingViolation);
        }
        if delta < SUSPECT_ACTION_INTERVAL {
            self.flag(player, ActivityKind::FastAction, Severity::Low);
        }
        Ok(())
    }

    fn flag(&mut self, player: &PlayerId, kind: ActivityKind, severity: Severity) {
        if self.log.len() == ACTIVITY_LOG_CAPACITY {
            self.log.pop_front();
        }
        self.log.push_back(SuspiciousActivity {
            player: player.clone(),
            table: self.table.clone(),
            kind,
            severity,
            at: Utc::now(),
        });
    }

    /// Flagged events, most recent first.
    pub fn recent_activity(&self) -> impl Iterator<Item = &SuspiciousActivity> {
        self.log.iter().rev()
    }

    /// Forget a player's buckets once their seat is gone.
    pub fn forget(&mut self, player: &PlayerId) {
        self.windows.remove(player);
        self.last_action.remove(player);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::engine::TableEngine;
    use crate::game::entities::{ActionKind, Blinds, BettingType, Chips};
    use crate::game::variant::Variant;
    use std::time::Duration;

    fn engine_with_two_seats() -> TableEngine {
        let mut e = TableEngine::create(
            "t".to_string(),
            Variant::Texas,
            BettingType::NoLimit,
            Blinds::new(1, 2),
            "1/2".to_string(),
            true,
        );
        e.add_seat("a".into(), "A".into(), 200, Some(0)).unwrap();
        e.add_seat("b".into(), "B".into(), 200, Some(1)).unwrap();
        e
    }

    fn action(player: &str, kind: ActionKind, amount: Option<Chips>) -> Action {
        Action {
            player: player.into(),
            table: "t".to_string(),
            kind,
            amount,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn sixth_action_in_a_second_is_rate_limited() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());
        let base = Instant::now();

        // Five spaced attempts inside one second pass the rate check.
        for i in 0..5 {
            let at = base + Duration::from_millis(150 * i);
            let result = validator.validate(&engine, &action("a", ActionKind::Call, None), at);
            assert_ne!(result, Err(GameError::RateLimited));
        }
        let at = base + Duration::from_millis(800);
        assert_eq!(
            validator.validate(&engine, &action("a", ActionKind::Call, None), at),
            Err(GameError::RateLimited)
        );
        assert!(
            validator
                .recent_activity()
                .any(|a| a.kind == ActivityKind::RateExceeded && a.severity == Severity::Medium)
        );
    }

    #[test]
    fn window_slides() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());
        let base = Instant::now();

        for i in 0..5 {
            let _ = validator.validate(
                &engine,
                &action("a", ActionKind::Call, None),
                base + Duration::from_millis(150 * i),
            );
        }
        // A second later the window has drained.
        let result = validator.validate(
            &engine,
            &action("a", ActionKind::Call, None),
            base + Duration::from_secs(2),
        );
        assert_ne!(result, Err(GameError::RateLimited));
    }

    #[test]
    fn subhuman_timing_is_rejected() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());
        let base = Instant::now();

        let _ = validator.validate(&engine, &action("a", ActionKind::Call, None), base);
        assert_eq!(
            validator.validate(
                &engine,
                &action("a", ActionKind::Call, None),
                base + Duration::from_millis(50),
            ),
            Err(GameError::TimingViolation)
        );
    }

    #[test]
    fn borderline_timing_is_flagged_but_allowed() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());
        let base = Instant::now();

        let _ = validator.validate(&engine, &action("a", ActionKind::Call, None), base);
        let result = validator.validate(
            &engine,
            &action("a", ActionKind::Call, None),
            base + Duration::from_millis(150),
        );
        assert_ne!(result, Err(GameError::TimingViolation));
        assert!(
            validator
                .recent_activity()
                .any(|a| a.kind == ActivityKind::FastAction && a.severity == Severity::Low)
        );
    }

    #[test]
    fn turn_and_legality_delegate_to_engine() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());

        // Seat b acts while a holds the action.
        assert_eq!(
            validator.validate(&engine, &action("b", ActionKind::Call, None), Instant::now()),
            Err(GameError::NotYourTurn)
        );
    }

    #[test]
    fn rate_buckets_are_per_player() {
        let engine = engine_with_two_seats();
        let mut validator = ActionValidator::new("t".to_string());
        let base = Instant::now();

        for i in 0..6 {
            let _ = validator.validate(
                &engine,
                &action("a", ActionKind::Call, None),
                base + Duration::from_millis(120 * i),
            );
        }
        // Player a is over budget; b is untouched.
        let result = validator.validate(
            &engine,
            &action("b", ActionKind::Fold, None),
            base + Duration::from_millis(900),
        );
        assert_ne!(result, Err(GameError::RateLimited));
    }
}
