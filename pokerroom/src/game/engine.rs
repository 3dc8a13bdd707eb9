//! Per-table game engine.
//!
//! The engine owns a table's state and is the only component that
//! mutates it. Callers drive it through a handful of operations (seat
//! changes, hand start, actions, timeouts); everything else — blind
//! posting, street sequencing, runouts, showdown, side pots — happens
//! inside. The engine is synchronous and single-threaded; the table
//! actor serializes access to it.

use std::collections::HashSet;
use std::time::Instant;

use log::{error, info, warn};

use super::constants::{MAX_RAISES_PER_ROUND, TURN_TIMEOUT};
use super::entities::{
    ActionKind, Blinds, BettingType, Card, Chips, Deck, LastAction, PlayerId, Seat, SeatIndex,
    SeatView, Stage, TableId, TableSummary, TableView, Winner,
};
use super::errors::{GameError, IllegalActionReason};
use super::evaluator::{determine_low_winners, determine_winners};
use super::history::{HandHistory, StartingSeat};
use super::variant::Variant;

/// Full server-side table state. Seats are kept sorted by seat index;
/// `dealer` and `active` are positions in that vector, not seat
/// indices.
#[derive(Debug)]
pub struct TableState {
    pub id: TableId,
    pub variant: Variant,
    pub betting: BettingType,
    pub blinds: Blinds,
    pub stake: String,
    pub system: bool,
    pub stage: Stage,
    pub board: Vec<Card>,
    pub seats: Vec<Seat>,
    pub max_seats: usize,
    pub dealer: usize,
    pub active: Option<usize>,
    pub pot: Chips,
    pub high_bet: Chips,
    pub raises_this_round: u8,
    /// Size of the last legal raise increment; drives the min-raise.
    pub last_raise: Chips,
    pub hand_number: u64,
    pub winners: Vec<Winner>,
    pub last_action: Option<LastAction>,
    pub last_action_at: Instant,
    /// Whether showdown reveals unfolded hole cards to everyone.
    /// Stays false when the pot was won uncontested.
    pub cards_revealed: bool,
}

impl TableState {
    /// Project the state for one viewer. Pure in state and viewer: the
    /// viewer sees their own hole cards, and everyone's unfolded cards
    /// once a contested showdown revealed them. Spectators pass `None`.
    #[must_use]
    pub fn project_for(&self, viewer: Option<&PlayerId>) -> TableView {
        let reveal_all = self.stage == Stage::Showdown && self.cards_revealed;
        let seats = self
            .seats
            .iter()
            .map(|seat| {
                let own = viewer.is_some_and(|v| *v == seat.player);
                let cards = if !seat.cards.is_empty() && (own || (reveal_all && seat.in_hand())) {
                    Some(seat.cards.clone())
                } else {
                    None
                };
                SeatView {
                    player: seat.player.clone(),
                    display_name: seat.display_name.clone(),
                    stack: seat.stack,
                    cards,
                    folded: seat.folded,
                    all_in: seat.all_in,
                    connected: seat.connected,
                    round_bet: seat.round_bet,
                    hand_bet: seat.hand_bet,
                    seat_index: seat.seat_index,
                }
            })
            .collect();

        TableView {
            id: self.id.clone(),
            variant: self.variant,
            betting: self.betting,
            blinds: self.blinds,
            stake: self.stake.clone(),
            stage: self.stage,
            board: self.board.clone(),
            pot: self.pot,
            high_bet: self.high_bet,
            hand_number: self.hand_number,
            active_seat: self.active.map(|i| self.seats[i].seat_index),
            dealer_seat: self.seats.get(self.dealer).map_or(0, |s| s.seat_index),
            max_seats: self.max_seats,
            seats,
            winners: self.winners.clone(),
            last_action: self.last_action.clone(),
        }
    }

    #[must_use]
    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id.clone(),
            variant: self.variant,
            betting: self.betting,
            stake: self.stake.clone(),
            blinds: self.blinds,
            seats_taken: self.seats.len(),
            max_seats: self.max_seats,
            stage: self.stage,
            system: self.system,
        }
    }

    #[must_use]
    pub fn connected_count(&self) -> usize {
        self.seats.iter().filter(|s| s.connected).count()
    }

    fn in_hand_positions(&self) -> Vec<usize> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_hand())
            .map(|(i, _)| i)
            .collect()
    }

    fn actor_positions(&self) -> Vec<usize> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.can_act())
            .map(|(i, _)| i)
            .collect()
    }

    /// Next seat clockwise from `from` (exclusive) that still owes an
    /// action this street.
    fn next_to_act_from(&self, from: usize) -> Option<usize> {
        let n = self.seats.len();
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|&i| {
                let seat = &self.seats[i];
                seat.can_act() && (!seat.has_acted || seat.round_bet < self.high_bet)
            })
    }

    /// Position of a seat in clockwise order starting left of the
    /// dealer; used to place odd chips deterministically.
    fn clockwise_rank(&self, idx: usize) -> usize {
        let n = self.seats.len();
        (idx + n - (self.dealer + 1) % n) % n
    }
}

/// One layer of the pot, with the seats (positions) eligible to win it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PotLayer {
    pub amount: Chips,
    pub eligible: Vec<usize>,
}

/// Partition the pot by ascending all-in contribution level. Each
/// distinct level of a non-folded seat closes one layer; folded money
/// lands in the layers it reaches but never creates eligibility.
/// Folded contributions above the highest live level are folded into
/// the top layer.
#[must_use]
pub fn build_pot_layers(seats: &[Seat]) -> Vec<PotLayer> {
    let mut levels: Vec<Chips> = seats
        .iter()
        .filter(|s| s.in_hand() && s.hand_bet > 0)
        .map(|s| s.hand_bet)
        .collect();
    levels.sort_unstable();
    levels.dedup();

    let total: Chips = seats.iter().map(|s| s.hand_bet).sum();
    let mut layers = Vec::with_capacity(levels.len());
    let mut prev = 0;
    let mut distributed = 0;
    for &level in &levels {
        let amount: Chips = seats
            .iter()
            .map(|s| s.hand_bet.min(level) - s.hand_bet.min(prev))
            .sum();
        let eligible = seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.in_hand() && s.hand_bet >= level)
            .map(|(i, _)| i)
            .collect();
        layers.push(PotLayer { amount, eligible });
        distributed += amount;
        prev = level;
    }
    if let Some(last) = layers.last_mut() {
        last.amount += total - distributed;
    }
    layers
}

/// The state machine around one table.
#[derive(Debug)]
pub struct TableEngine {
    state: TableState,
    deck: Deck,
    history: HandHistory,
    /// Cash-outs owed to players whose seats were purged inside an
    /// engine operation. The caller drains these into the wallet.
    pending_payouts: Vec<(PlayerId, Chips)>,
}

impl TableEngine {
    #[must_use]
    pub fn create(
        id: TableId,
        variant: Variant,
        betting: BettingType,
        blinds: Blinds,
        stake: String,
        system: bool,
    ) -> Self {
        Self {
            state: TableState {
                id,
                variant,
                betting,
                blinds,
                stake,
                system,
                stage: Stage::Waiting,
                board: Vec::with_capacity(5),
                seats: Vec::with_capacity(variant.max_seats()),
                max_seats: variant.max_seats(),
                dealer: 0,
                active: None,
                pot: 0,
                high_bet: 0,
                raises_this_round: 0,
                last_raise: 0,
                hand_number: 0,
                winners: Vec::new(),
                last_action: None,
                last_action_at: Instant::now(),
                cards_revealed: false,
            },
            deck: Deck::for_variant(variant),
            history: HandHistory::new(),
            pending_payouts: Vec::new(),
        }
    }

    #[must_use]
    pub fn state(&self) -> &TableState {
        &self.state
    }

    #[must_use]
    pub fn history(&self) -> &HandHistory {
        &self.history
    }

    /// Seat a player. A disconnected player re-attaches to their old
    /// seat, keeping stack and cards; anyone else gets the requested
    /// seat if free, otherwise the lowest free one. Seating mid-hand
    /// is allowed but the seat sits out until the next deal. When the
    /// table is waiting and this brings it to two connected seats, a
    /// hand starts immediately.
    pub fn add_seat(
        &mut self,
        player: PlayerId,
        display_name: String,
        buy_in: Chips,
        preferred: Option<SeatIndex>,
    ) -> Result<SeatIndex, GameError> {
        if let Some(existing) = self.state.seats.iter_mut().find(|s| s.player == player) {
            if existing.connected {
                return Err(GameError::AlreadySeated);
            }
            existing.connected = true;
            info!("table {}: {} re-attached to seat {}", self.state.id, player, existing.seat_index);
            return Ok(existing.seat_index);
        }

        if buy_in < self.state.blinds.big {
            return Err(GameError::BuyInTooSmall);
        }
        if self.state.seats.len() >= self.state.max_seats {
            return Err(GameError::TableFull);
        }

        let taken: HashSet<SeatIndex> = self.state.seats.iter().map(|s| s.seat_index).collect();
        let seat_index = match preferred {
            Some(i) if i < self.state.max_seats && !taken.contains(&i) => i,
            _ => (0..self.state.max_seats)
                .find(|i| !taken.contains(i))
                .ok_or(GameError::TableFull)?,
        };

        let mut seat = Seat::new(player.clone(), display_name, buy_in, seat_index);
        if self.state.stage != Stage::Waiting {
            // Not dealt in; sits out until the next hand.
            seat.folded = true;
            seat.has_acted = true;
        }

        let pos = self
            .state
            .seats
            .iter()
            .position(|s| s.seat_index > seat_index)
            .unwrap_or(self.state.seats.len());
        self.state.seats.insert(pos, seat);
        if self.state.stage != Stage::Waiting {
            if pos <= self.state.dealer {
                self.state.dealer += 1;
            }
            if let Some(active) = self.state.active
                && pos <= active
            {
                self.state.active = Some(active + 1);
            }
        }
        info!("table {}: {} took seat {seat_index}", self.state.id, player);

        if self.state.stage == Stage::Waiting && self.state.connected_count() >= 2 {
            if let Err(e) = self.start_hand() {
                warn!("table {}: auto-start failed: {e}", self.state.id);
            }
        }
        Ok(seat_index)
    }

    /// Remove a player. Between hands the seat goes away and the stack
    /// is returned for cash-out. Mid-hand the seat folds, disconnects,
    /// and is retained so its bets stay in the pot; the remaining
    /// stack is cashed out immediately.
    pub fn remove_seat(&mut self, player: &PlayerId) -> Result<Chips, GameError> {
        let idx = self
            .state
            .seats
            .iter()
            .position(|s| s.player == *player)
            .ok_or(GameError::NotInHand)?;

        if !self.state.stage.is_betting() {
            let seat = self.state.seats.remove(idx);
            if idx < self.state.dealer {
                self.state.dealer -= 1;
            }
            if self.state.dealer >= self.state.seats.len() {
                self.state.dealer = 0;
            }
            info!("table {}: {} left with ${}", self.state.id, player, seat.stack);
            return Ok(seat.stack);
        }

        let seat = &mut self.state.seats[idx];
        let was_in_hand = seat.in_hand();
        let cash_out = seat.stack;
        seat.stack = 0;
        seat.folded = true;
        seat.has_acted = true;
        seat.all_in = false;
        seat.connected = false;
        info!("table {}: {} abandoned seat mid-hand, cashing out ${cash_out}", self.state.id, player);

        if was_in_hand {
            self.resolve_after_departure(idx)?;
        }
        Ok(cash_out)
    }

    /// Session dropped; the seat stays, the turn timer will act for it
    /// until the grace period removes it.
    pub fn mark_disconnected(&mut self, player: &PlayerId) {
        if let Some(seat) = self.state.seats.iter_mut().find(|s| s.player == *player) {
            seat.connected = false;
        }
    }

    /// Move to a free seat between hands.
    pub fn change_seat(&mut self, player: &PlayerId, new_seat: SeatIndex) -> Result<(), GameError> {
        if self.state.stage.is_betting() {
            return Err(GameError::HandInProgress);
        }
        if new_seat >= self.state.max_seats
            || self.state.seats.iter().any(|s| s.seat_index == new_seat)
        {
            return Err(GameError::SeatTaken);
        }
        let dealer_player = self
            .state
            .seats
            .get(self.state.dealer)
            .map(|s| s.player.clone());
        let seat = self
            .state
            .seats
            .iter_mut()
            .find(|s| s.player == *player)
            .ok_or(GameError::NotInHand)?;
        seat.seat_index = new_seat;
        self.state.seats.sort_by_key(|s| s.seat_index);
        if let Some(dealer_player) = dealer_player {
            self.state.dealer = self
                .state
                .seats
                .iter()
                .position(|s| s.player == dealer_player)
                .unwrap_or(0);
        }
        Ok(())
    }

    /// Drop seats that lost their connection or their chips, returning
    /// the cash-outs the caller owes the wallet.
    pub fn purge_departed(&mut self) -> Vec<(PlayerId, Chips)> {
        if self.state.stage.is_betting() {
            return Vec::new();
        }
        let mut cash_outs = Vec::new();
        self.state.seats.retain(|seat| {
            if seat.connected && seat.stack > 0 {
                true
            } else {
                if seat.stack > 0 {
                    cash_outs.push((seat.player.clone(), seat.stack));
                }
                false
            }
        });
        if self.state.dealer >= self.state.seats.len() {
            self.state.dealer = 0;
        }
        cash_outs
    }

    /// Cash-outs accumulated by purges inside `start_hand`; the table
    /// actor drains them into the wallet after every operation.
    pub fn take_payouts(&mut self) -> Vec<(PlayerId, Chips)> {
        std::mem::take(&mut self.pending_payouts)
    }

    /// Deal a fresh hand: purge dead seats, rotate the button, shuffle,
    /// deal hole cards, post blinds, and hand the action to the seat
    /// left of the big blind.
    pub fn start_hand(&mut self) -> Result<(), GameError> {
        if self.state.stage.is_betting() {
            return Err(GameError::HandInProgress);
        }
        let purged = self.purge_departed();
        self.pending_payouts.extend(purged);
        let n = self.state.seats.len();
        if n < 2 {
            self.state.stage = Stage::Waiting;
            self.state.active = None;
            return Err(GameError::NotEnoughPlayers);
        }

        for seat in &mut self.state.seats {
            seat.reset_for_hand();
        }
        self.state.board.clear();
        self.state.pot = 0;
        self.state.winners.clear();
        self.state.last_action = None;
        self.state.cards_revealed = false;
        self.state.high_bet = 0;
        self.state.raises_this_round = 0;
        self.state.last_raise = 0;
        self.deck = Deck::for_variant(self.state.variant);
        self.state.hand_number += 1;
        self.state.dealer = if self.state.hand_number == 1 {
            0
        } else {
            (self.state.dealer + 1) % n
        };

        if let Err(e) = self.deal_in() {
            self.abort_hand();
            return Err(e);
        }

        // Heads-up, the dealer posts the small blind.
        let dealer = self.state.dealer;
        let (sb, bb) = if n == 2 {
            (dealer, (dealer + 1) % n)
        } else {
            ((dealer + 1) % n, (dealer + 2) % n)
        };
        if let Some(ante) = self.state.blinds.ante {
            for seat in &mut self.state.seats {
                self.state.pot += seat.post_ante(ante);
            }
        }
        let small = self.state.blinds.small;
        let big = self.state.blinds.big;
        self.state.pot += self.state.seats[sb].contribute(small);
        self.state.pot += self.state.seats[bb].contribute(big);
        self.state.high_bet = big;
        self.state.last_raise = big;
        self.state.stage = Stage::Preflop;
        self.state.active = self.state.next_to_act_from(bb);
        self.state.last_action_at = Instant::now();

        let starting = self
            .state
            .seats
            .iter()
            .map(|s| StartingSeat {
                player: s.player.clone(),
                seat_index: s.seat_index,
                stack: s.stack + s.hand_bet,
                cards: s.cards.clone(),
            })
            .collect();
        self.history.begin(self.state.hand_number, starting);
        info!(
            "table {}: hand #{} dealt, {} seats, button at seat {}",
            self.state.id,
            self.state.hand_number,
            n,
            self.state.seats[dealer].seat_index
        );

        // Blinds can put everyone all-in; nothing to bet then.
        if self.state.active.is_none() || self.state.actor_positions().is_empty() {
            self.run_out_board()?;
        }
        self.verify_pot()
    }

    fn deal_in(&mut self) -> Result<(), GameError> {
        let per_seat = self.state.variant.hole_cards();
        for i in 0..self.state.seats.len() {
            self.state.seats[i].cards = self.deck.draw(per_seat)?;
        }
        // Courchevel exposes the first board card before any betting.
        let preflop_board = self.state.variant.preflop_board_cards();
        if preflop_board > 0 {
            let cards = self.deck.draw(preflop_board)?;
            self.state.board.extend(cards);
        }
        Ok(())
    }

    /// Validate an action without applying it. The anti-cheat
    /// validator calls this for its legality and amount checks.
    pub fn check_action(
        &self,
        player: &PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
    ) -> Result<(), GameError> {
        let idx = self
            .state
            .seats
            .iter()
            .position(|s| s.player == *player)
            .ok_or(GameError::NotInHand)?;
        self.check_action_at(idx, kind, amount)
    }

    fn check_action_at(
        &self,
        idx: usize,
        kind: ActionKind,
        amount: Option<Chips>,
    ) -> Result<(), GameError> {
        if !self.state.stage.is_betting() {
            return Err(GameError::NotInHand);
        }
        if self.state.active != Some(idx) {
            return Err(GameError::NotYourTurn);
        }
        let seat = &self.state.seats[idx];
        if !seat.can_act() {
            return Err(GameError::NotInHand);
        }
        let to_call = self.state.high_bet - seat.round_bet;
        match kind {
            ActionKind::Fold | ActionKind::AllIn => Ok(()),
            ActionKind::Check => {
                if to_call > 0 {
                    Err(GameError::ActionIllegal(
                        IllegalActionReason::CheckWhenMustCall,
                    ))
                } else {
                    Ok(())
                }
            }
            ActionKind::Call => Ok(()),
            ActionKind::Raise => {
                if self.state.raises_this_round >= MAX_RAISES_PER_ROUND {
                    return Err(GameError::ActionIllegal(
                        IllegalActionReason::MaxRaisesReached,
                    ));
                }
                // A seat that already acted only sees the action again
                // when an all-in under-raise failed to re-open it; no
                // raise target is legal then.
                let target = amount.filter(|_| !seat.has_acted).ok_or(
                    GameError::ActionIllegal(IllegalActionReason::BelowMinRaise),
                )?;
                if target <= self.state.high_bet
                    || target - self.state.high_bet < self.state.last_raise
                {
                    return Err(GameError::ActionIllegal(IllegalActionReason::BelowMinRaise));
                }
                if self.state.betting == BettingType::PotLimit
                    && target > self.state.pot + self.state.high_bet + to_call
                {
                    return Err(GameError::ActionIllegal(IllegalActionReason::AbovePotLimit));
                }
                if target - seat.round_bet > seat.stack {
                    return Err(GameError::ActionIllegal(
                        IllegalActionReason::InsufficientStack,
                    ));
                }
                Ok(())
            }
        }
    }

    /// Validate and apply one action from the active seat, then move
    /// the hand forward (next actor, street, runout, or showdown).
    pub fn apply_action(
        &mut self,
        player: &PlayerId,
        kind: ActionKind,
        amount: Option<Chips>,
        now: Instant,
    ) -> Result<(), GameError> {
        let idx = self
            .state
            .seats
            .iter()
            .position(|s| s.player == *player)
            .ok_or(GameError::NotInHand)?;
        self.check_action_at(idx, kind, amount)?;
        self.apply_at(idx, kind, amount, now)
    }

    fn apply_at(
        &mut self,
        idx: usize,
        kind: ActionKind,
        amount: Option<Chips>,
        now: Instant,
    ) -> Result<(), GameError> {
        let high_bet = self.state.high_bet;
        let recorded_amount;
        {
            let seat = &mut self.state.seats[idx];
            match kind {
                ActionKind::Fold => {
                    seat.folded = true;
                    seat.has_acted = true;
                    recorded_amount = None;
                }
                ActionKind::Check => {
                    seat.has_acted = true;
                    recorded_amount = None;
                }
                ActionKind::Call => {
                    let to_call = high_bet - seat.round_bet;
                    let paid = seat.contribute(to_call);
                    seat.has_acted = true;
                    self.state.pot += paid;
                    recorded_amount = Some(paid);
                }
                ActionKind::Raise => {
                    let target = amount.expect("checked");
                    let contribution = target - seat.round_bet;
                    let paid = seat.contribute(contribution);
                    seat.has_acted = true;
                    self.state.pot += paid;
                    self.state.last_raise = target - high_bet;
                    self.state.high_bet = target;
                    self.state.raises_this_round += 1;
                    recorded_amount = Some(target);
                    self.reopen_action(idx);
                }
                ActionKind::AllIn => {
                    let stack = seat.stack;
                    let paid = seat.contribute(stack);
                    seat.has_acted = true;
                    self.state.pot += paid;
                    let new_total = self.state.seats[idx].round_bet;
                    recorded_amount = Some(paid);
                    if new_total > high_bet {
                        let increment = new_total - high_bet;
                        // An all-in below the min-raise moves the bet
                        // but does not re-open action for seats that
                        // already acted.
                        if increment >= self.state.last_raise {
                            if self.state.raises_this_round < MAX_RAISES_PER_ROUND {
                                self.state.raises_this_round += 1;
                            }
                            self.reopen_action(idx);
                        }
                        self.state.last_raise = increment;
                        self.state.high_bet = new_total;
                    }
                }
            }
        }

        let seat = &mut self.state.seats[idx];
        seat.last_action_at = Some(now);
        let player = seat.player.clone();
        self.state.last_action = Some(LastAction {
            player: player.clone(),
            kind,
            amount: recorded_amount,
        });
        self.state.last_action_at = now;
        self.history.record_action(&player, kind, recorded_amount);

        self.advance_after_action(idx)?;
        self.verify_pot()
    }

    fn reopen_action(&mut self, raiser: usize) {
        for (i, seat) in self.state.seats.iter_mut().enumerate() {
            if i != raiser && seat.can_act() {
                seat.has_acted = false;
            }
        }
    }

    /// Apply the server action for a seat that ran out its 30 seconds:
    /// check when free, fold when facing a bet. Returns whether an
    /// action was applied.
    pub fn apply_timeout(&mut self, now: Instant) -> Result<bool, GameError> {
        if !self.state.stage.is_betting() {
            return Ok(false);
        }
        let Some(idx) = self.state.active else {
            return Ok(false);
        };
        if now.duration_since(self.state.last_action_at) < TURN_TIMEOUT {
            return Ok(false);
        }
        let seat = &self.state.seats[idx];
        let kind = if seat.round_bet == self.state.high_bet {
            ActionKind::Check
        } else {
            ActionKind::Fold
        };
        info!(
            "table {}: {} timed out, server applies {kind:?}",
            self.state.id, seat.player
        );
        self.apply_at(idx, kind, None, now)?;
        Ok(true)
    }

    /// A seat folded out of band (mid-hand leave or grace expiry);
    /// settle whatever that does to the round.
    fn resolve_after_departure(&mut self, idx: usize) -> Result<(), GameError> {
        if self.state.in_hand_positions().len() == 1 {
            return self.finish_hand(false);
        }
        let actors = self.state.actor_positions();
        let complete = actors.iter().all(|&i| {
            let seat = &self.state.seats[i];
            seat.has_acted && seat.round_bet == self.state.high_bet
        });
        if complete {
            if actors.len() <= 1 {
                return self.run_out_board();
            }
            return self.advance_stage();
        }
        if self.state.active == Some(idx) {
            match self.state.next_to_act_from(idx) {
                Some(next) => {
                    self.state.active = Some(next);
                    self.state.last_action_at = Instant::now();
                }
                None => return self.run_out_board(),
            }
        }
        Ok(())
    }

    fn advance_after_action(&mut self, current: usize) -> Result<(), GameError> {
        // Down to one live seat: the pot is theirs, no cards shown.
        if self.state.in_hand_positions().len() == 1 {
            return self.finish_hand(false);
        }

        let actors = self.state.actor_positions();
        let complete = actors.iter().all(|&i| {
            let seat = &self.state.seats[i];
            seat.has_acted && seat.round_bet == self.state.high_bet
        });
        if complete {
            if actors.len() <= 1 {
                // Betting is over for the hand; deal what's left.
                return self.run_out_board();
            }
            return self.advance_stage();
        }

        match self.state.next_to_act_from(current) {
            Some(next) => {
                self.state.active = Some(next);
                Ok(())
            }
            None => self.run_out_board(),
        }
    }

    fn advance_stage(&mut self) -> Result<(), GameError> {
        for seat in &mut self.state.seats {
            seat.round_bet = 0;
            if seat.can_act() {
                seat.has_acted = false;
            }
        }
        self.state.high_bet = 0;
        self.state.raises_this_round = 0;
        self.state.last_raise = 0;

        let next_stage = match self.state.stage {
            Stage::Preflop => {
                let missing = 3 - self.state.board.len();
                let cards = self.deck.draw(missing)?;
                self.state.board.extend(cards);
                Stage::Flop
            }
            Stage::Flop => {
                self.state.board.extend(self.deck.draw(1)?);
                Stage::Turn
            }
            Stage::Turn => {
                self.state.board.extend(self.deck.draw(1)?);
                Stage::River
            }
            Stage::River => return self.finish_hand(true),
            _ => return Ok(()),
        };
        self.state.stage = next_stage;
        self.state.active = self.state.next_to_act_from(self.state.dealer);
        self.state.last_action_at = Instant::now();
        if self.state.active.is_none() {
            return self.run_out_board();
        }
        Ok(())
    }

    fn run_out_board(&mut self) -> Result<(), GameError> {
        let missing = 5 - self.state.board.len();
        if missing > 0 {
            let cards = self.deck.draw(missing)?;
            self.state.board.extend(cards);
        }
        self.finish_hand(true)
    }

    /// Showdown: build pot layers, evaluate each, credit the winners,
    /// and close the hand record.
    fn finish_hand(&mut self, contested: bool) -> Result<(), GameError> {
        self.state.stage = Stage::Showdown;
        self.state.active = None;
        self.state.cards_revealed = contested;

        let mut winners_out: Vec<Winner> = Vec::new();
        if contested {
            let layers = build_pot_layers(&self.state.seats);
            for layer in layers {
                let contenders: Vec<(SeatIndex, Vec<Card>)> = layer
                    .eligible
                    .iter()
                    .map(|&i| (i, self.state.seats[i].cards.clone()))
                    .collect();

                let low = if self.state.variant.is_hi_lo() {
                    determine_low_winners(&contenders, &self.state.board, self.state.variant)
                } else {
                    None
                };
                match low {
                    Some((low_winners, low_score)) => {
                        // Low takes half; the odd chip stays with the
                        // high side.
                        let low_amount = layer.amount / 2;
                        let high_amount = layer.amount - low_amount;
                        let (high_winners, best) =
                            determine_winners(&contenders, &self.state.board, self.state.variant);
                        let description = best.map_or_else(String::new, |s| s.describe());
                        self.award(&high_winners, high_amount, &description, &mut winners_out);
                        self.award(
                            &low_winners,
                            low_amount,
                            &low_score.describe(),
                            &mut winners_out,
                        );
                    }
                    None => {
                        let (high_winners, best) =
                            determine_winners(&contenders, &self.state.board, self.state.variant);
                        let description = best.map_or_else(String::new, |s| s.describe());
                        self.award(&high_winners, layer.amount, &description, &mut winners_out);
                    }
                }
            }
        } else {
            let idx = self.state.in_hand_positions()[0];
            let seat = &mut self.state.seats[idx];
            seat.stack += self.state.pot;
            winners_out.push(Winner {
                player: seat.player.clone(),
                amount: self.state.pot,
                description: String::new(),
            });
        }

        self.history
            .finish(&self.state.board, self.state.pot, &winners_out);
        for winner in &winners_out {
            info!(
                "table {}: hand #{} — {} wins ${}{}",
                self.state.id,
                self.state.hand_number,
                winner.player,
                winner.amount,
                if winner.description.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", winner.description)
                }
            );
        }
        self.state.winners = winners_out;
        Ok(())
    }

    /// Split `amount` between the winning positions; the remainder
    /// goes to the first winner clockwise from the dealer, so tests
    /// are deterministic.
    fn award(
        &mut self,
        positions: &[usize],
        amount: Chips,
        description: &str,
        winners_out: &mut Vec<Winner>,
    ) {
        if positions.is_empty() || amount == 0 {
            return;
        }
        let mut ordered: Vec<usize> = positions.to_vec();
        ordered.sort_by_key(|&i| self.state.clockwise_rank(i));
        let share = amount / ordered.len() as Chips;
        let remainder = amount % ordered.len() as Chips;
        for (pos, &i) in ordered.iter().enumerate() {
            let mut won = share;
            if pos == 0 {
                won += remainder;
            }
            if won == 0 {
                continue;
            }
            let seat = &mut self.state.seats[i];
            seat.stack += won;
            match winners_out.iter_mut().find(|w| w.player == seat.player) {
                Some(existing) => {
                    existing.amount += won;
                    if existing.description.is_empty() {
                        existing.description = description.to_string();
                    }
                }
                None => winners_out.push(Winner {
                    player: seat.player.clone(),
                    amount: won,
                    description: description.to_string(),
                }),
            }
        }
    }

    /// The pot must equal the sum of per-seat contributions at every
    /// commit point. A mismatch is an engine bug: the hand aborts,
    /// every contribution is refunded, and the table resets.
    fn verify_pot(&mut self) -> Result<(), GameError> {
        let contributed: Chips = self.state.seats.iter().map(|s| s.hand_bet).sum();
        if self.state.stage != Stage::Showdown && self.state.pot != contributed {
            error!(
                "table {}: pot ${} != contributions ${contributed}, aborting hand",
                self.state.id, self.state.pot
            );
            self.abort_hand();
            return Err(GameError::HandAborted);
        }
        Ok(())
    }

    fn abort_hand(&mut self) {
        for seat in &mut self.state.seats {
            seat.stack += seat.hand_bet;
            seat.reset_for_hand();
        }
        self.state.board.clear();
        self.state.pot = 0;
        self.state.high_bet = 0;
        self.state.raises_this_round = 0;
        self.state.last_raise = 0;
        self.state.winners.clear();
        self.state.last_action = None;
        self.state.active = None;
        self.state.stage = Stage::Waiting;
        self.history.discard();
    }
}
