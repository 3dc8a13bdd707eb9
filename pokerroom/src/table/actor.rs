//! Table actor: one task per table, serializing every mutation.
//!
//! The actor owns the engine, the anti-cheat validator, and the
//! table's timers. Its inbox is the table's serial queue: actions are
//! applied in arrival order and broadcasts go out in commit order.
//! Wallet calls happen here, outside the engine, so the engine's
//! critical section never suspends.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{Duration, interval, sleep},
};
use uuid::Uuid;

use super::config::TableConfig;
use super::messages::{TableHandle, TableMessage};
use crate::game::constants::{DISCONNECT_GRACE, NEXT_HAND_DELAY, WALLET_CREDIT_RETRIES};
use crate::game::engine::TableEngine;
use crate::game::entities::{Chips, PlayerId, Stage, TableId, TableSummary};
use crate::game::errors::GameError;
use crate::security::ActionValidator;
use crate::session::messages::ServerEvent;
use crate::wallet::{HandMeta, WalletAdapter};

struct Subscriber {
    viewer: Option<PlayerId>,
    sender: mpsc::Sender<ServerEvent>,
}

struct Timer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Timer {
    fn cancel(self) {
        self.handle.abort();
    }
}

pub struct TableActor {
    engine: TableEngine,
    validator: ActionValidator,
    inbox: mpsc::Receiver<TableMessage>,
    self_tx: mpsc::Sender<TableMessage>,
    wallet: Arc<dyn WalletAdapter>,
    subscribers: HashMap<Uuid, Subscriber>,
    /// Seat-count/stage changes go to the lobby channel through here.
    lobby_tx: mpsc::Sender<TableSummary>,
    last_summary: Option<TableSummary>,
    grace_timers: HashMap<PlayerId, Timer>,
    next_hand_timer: Option<Timer>,
    generation: u64,
    /// Highest hand number already reported to rake accounting.
    last_rake_hand: u64,
}

impl TableActor {
    /// Build the actor and spawn its task. The returned handle is the
    /// only way to reach the table.
    pub fn spawn(
        id: TableId,
        config: &TableConfig,
        wallet: Arc<dyn WalletAdapter>,
        lobby_tx: mpsc::Sender<TableSummary>,
    ) -> TableHandle {
        let (sender, inbox) = mpsc::channel(128);
        let engine = TableEngine::create(
            id.clone(),
            config.variant,
            config.betting,
            config.blinds,
            config.stake_label.clone(),
            config.system,
        );
        let actor = Self {
            engine,
            validator: ActionValidator::new(id.clone()),
            inbox,
            self_tx: sender.clone(),
            wallet,
            subscribers: HashMap::new(),
            lobby_tx,
            last_summary: None,
            grace_timers: HashMap::new(),
            next_hand_timer: None,
            generation: 0,
            last_rake_hand: 0,
        };
        tokio::spawn(actor.run());
        TableHandle::new(id, sender)
    }

    async fn run(mut self) {
        info!("table {}: actor starting", self.engine.state().id);
        let mut tick = interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                message = self.inbox.recv() => {
                    match message {
                        Some(message) => self.handle_message(message).await,
                        None => break,
                    }
                }
                _ = tick.tick() => self.tick().await,
            }
        }
        info!("table {}: actor stopped", self.engine.state().id);
    }

    async fn handle_message(&mut self, message: TableMessage) {
        match message {
            TableMessage::Join {
                player,
                display_name,
                buy_in,
                preferred_seat,
                respond,
            } => {
                let result = self
                    .handle_join(player, display_name, buy_in, preferred_seat)
                    .await;
                let _ = respond.send(result);
            }

            TableMessage::Leave { player, respond } => {
                let result = self.handle_leave(player).await;
                let _ = respond.send(result);
            }

            TableMessage::Act { action, respond } => {
                let now = Instant::now();
                let result = self
                    .validator
                    .validate(&self.engine, &action, now)
                    .and_then(|()| {
                        self.engine
                            .apply_action(&action.player, action.kind, action.amount, now)
                    });
                match &result {
                    Ok(()) => self.after_mutation().await,
                    Err(GameError::HandAborted) => {
                        self.broadcast_abort().await;
                        self.after_mutation().await;
                    }
                    Err(_) => {}
                }
                let _ = respond.send(result);
            }

            TableMessage::ChangeSeat {
                player,
                new_seat,
                respond,
            } => {
                let result = self.engine.change_seat(&player, new_seat);
                if result.is_ok() {
                    self.after_mutation().await;
                }
                let _ = respond.send(result);
            }

            TableMessage::StartHand { respond } => {
                self.cash_out_departed().await;
                let result = self.engine.start_hand();
                if result.is_ok() {
                    self.after_mutation().await;
                }
                let _ = respond.send(result);
            }

            TableMessage::GetView { viewer, respond } => {
                let _ = respond.send(self.engine.state().project_for(viewer.as_ref()));
            }

            TableMessage::GetSummary { respond } => {
                let _ = respond.send(self.engine.state().summary());
            }

            TableMessage::Subscribe {
                session,
                viewer,
                sender,
            } => {
                // Push the current state right away so a subscriber
                // never waits for the next mutation.
                let event = self.event_for(viewer.as_ref());
                let _ = sender.try_send(event);
                self.subscribers.insert(session, Subscriber { viewer, sender });
                debug!(
                    "table {}: session {session} subscribed ({} total)",
                    self.engine.state().id,
                    self.subscribers.len()
                );
            }

            TableMessage::Unsubscribe { session } => {
                self.subscribers.remove(&session);
            }

            TableMessage::SessionClosed { player } => {
                let seated = self
                    .engine
                    .state()
                    .seats
                    .iter()
                    .any(|s| s.player == player);
                if seated {
                    self.engine.mark_disconnected(&player);
                    self.start_grace_timer(player);
                    self.after_mutation().await;
                }
            }

            TableMessage::GraceExpired { player, generation } => {
                self.handle_grace_expired(player, generation).await;
            }

            TableMessage::NextHandDue { generation } => {
                self.handle_next_hand_due(generation).await;
            }
        }
    }

    async fn handle_join(
        &mut self,
        player: PlayerId,
        display_name: String,
        buy_in: Chips,
        preferred_seat: Option<usize>,
    ) -> Result<usize, GameError> {
        // Re-attaching to an existing seat spends nothing.
        let reattaching = self
            .engine
            .state()
            .seats
            .iter()
            .any(|s| s.player == player);
        if !reattaching {
            self.wallet
                .reserve(&player, buy_in)
                .await
                .map_err(|e| GameError::WalletRejected(e.to_string()))?;
        }

        match self.engine.add_seat(player.clone(), display_name, buy_in, preferred_seat) {
            Ok(seat) => {
                self.cancel_grace_timer(&player);
                self.after_mutation().await;
                Ok(seat)
            }
            Err(e) => {
                if !reattaching {
                    // Roll the reservation back; the seat never happened.
                    self.credit_with_retries(&player, buy_in).await;
                }
                Err(e)
            }
        }
    }

    async fn handle_leave(&mut self, player: PlayerId) -> Result<(), GameError> {
        let cash_out = self.engine.remove_seat(&player)?;
        self.cancel_grace_timer(&player);
        self.validator.forget(&player);
        if cash_out > 0 {
            self.credit_with_retries(&player, cash_out).await;
        }
        self.after_mutation().await;
        Ok(())
    }

    async fn handle_grace_expired(&mut self, player: PlayerId, generation: u64) {
        let current = self.grace_timers.get(&player).map(|t| t.generation);
        if current != Some(generation) {
            return;
        }
        self.grace_timers.remove(&player);

        let still_disconnected = self
            .engine
            .state()
            .seats
            .iter()
            .any(|s| s.player == player && !s.connected);
        if !still_disconnected {
            return;
        }
        info!(
            "table {}: grace expired for {player}, freeing the seat",
            self.engine.state().id
        );
        match self.engine.remove_seat(&player) {
            Ok(cash_out) => {
                self.validator.forget(&player);
                if cash_out > 0 {
                    self.credit_with_retries(&player, cash_out).await;
                }
                self.after_mutation().await;
            }
            Err(e) => debug!(
                "table {}: grace removal of {player} found nothing: {e}",
                self.engine.state().id
            ),
        }
    }

    async fn handle_next_hand_due(&mut self, generation: u64) {
        let pending = self.next_hand_timer.as_ref().map(|t| t.generation);
        if pending != Some(generation) {
            return;
        }
        self.next_hand_timer = None;
        if self.engine.state().stage != Stage::Showdown {
            return;
        }
        self.cash_out_departed().await;
        match self.engine.start_hand() {
            Ok(()) => self.after_mutation().await,
            Err(GameError::NotEnoughPlayers) => {
                // Back to waiting until someone sits down.
                self.after_mutation().await;
            }
            Err(e) => error!(
                "table {}: scheduled hand failed to start: {e}",
                self.engine.state().id
            ),
        }
    }

    async fn tick(&mut self) {
        match self.engine.apply_timeout(Instant::now()) {
            Ok(true) => self.after_mutation().await,
            Ok(false) => {}
            Err(e) => {
                error!("table {}: timeout handling: {e}", self.engine.state().id);
                self.broadcast_abort().await;
                self.after_mutation().await;
            }
        }
    }

    /// Credit cash-outs for seats the engine is about to purge.
    async fn cash_out_departed(&mut self) {
        for (player, chips) in self.engine.purge_departed() {
            self.validator.forget(&player);
            self.cancel_grace_timer(&player);
            self.credit_with_retries(&player, chips).await;
        }
    }

    /// Hand contributions to the rake accounting, once per finished
    /// hand.
    async fn report_rake(&mut self) {
        let state = self.engine.state();
        if state.stage != Stage::Showdown || state.hand_number <= self.last_rake_hand {
            return;
        }
        self.last_rake_hand = state.hand_number;
        let shares: Vec<(PlayerId, Chips)> = state
            .seats
            .iter()
            .filter(|s| s.hand_bet > 0)
            .map(|s| (s.player.clone(), s.hand_bet))
            .collect();
        if shares.is_empty() {
            return;
        }
        let meta = HandMeta {
            table: state.id.clone(),
            hand_number: state.hand_number,
            pot: state.pot,
        };
        if let Err(e) = self.wallet.rake_contribution(&meta, &shares).await {
            warn!("table {}: rake attribution failed: {e}", state.id);
        }
    }

    async fn credit_with_retries(&self, player: &PlayerId, amount: Chips) {
        for attempt in 1..=WALLET_CREDIT_RETRIES {
            match self.wallet.credit(player, amount).await {
                Ok(()) => return,
                Err(e) if attempt < WALLET_CREDIT_RETRIES => {
                    warn!(
                        "table {}: credit of ${amount} to {player} failed (attempt {attempt}): {e}",
                        self.engine.state().id
                    );
                }
                Err(e) => {
                    error!(
                        "table {}: RECONCILE: ${amount} owed to {player} after {attempt} attempts: {e}",
                        self.engine.state().id
                    );
                }
            }
        }
    }

    fn event_for(&self, viewer: Option<&PlayerId>) -> ServerEvent {
        let seated = viewer.is_some_and(|p| {
            self.engine.state().seats.iter().any(|s| s.player == *p)
        });
        if seated {
            ServerEvent::GameState(self.engine.state().project_for(viewer))
        } else {
            ServerEvent::SpectatorState(self.engine.state().project_for(None))
        }
    }

    /// Broadcast in commit order, refresh the lobby row, and keep the
    /// next-hand timer consistent with the stage.
    async fn after_mutation(&mut self) {
        // Settle anyone the engine purged during this operation, and
        // report the hand to rake accounting if one just finished.
        for (player, chips) in self.engine.take_payouts() {
            self.validator.forget(&player);
            self.cancel_grace_timer(&player);
            self.credit_with_retries(&player, chips).await;
        }
        self.report_rake().await;

        let state = self.engine.state();
        let spectator = ServerEvent::SpectatorState(state.project_for(None));
        let mut events: Vec<(Uuid, ServerEvent)> = Vec::with_capacity(self.subscribers.len());
        for (session, subscriber) in &self.subscribers {
            let seated = subscriber
                .viewer
                .as_ref()
                .is_some_and(|p| state.seats.iter().any(|s| s.player == *p));
            let event = if seated {
                ServerEvent::GameState(state.project_for(subscriber.viewer.as_ref()))
            } else {
                spectator.clone()
            };
            events.push((*session, event));
        }
        for (session, event) in events {
            let subscriber = &self.subscribers[&session];
            match subscriber.sender.try_send(event) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        "table {}: session {session} is lagging, dropping update",
                        self.engine.state().id
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.subscribers.remove(&session);
                }
            }
        }

        let summary = self.engine.state().summary();
        if self.last_summary.as_ref() != Some(&summary) {
            let _ = self.lobby_tx.try_send(summary.clone());
            self.last_summary = Some(summary);
        }

        self.sync_next_hand_timer();
    }

    async fn broadcast_abort(&mut self) {
        let state = self.engine.state();
        let event = ServerEvent::TableError {
            table_id: state.id.clone(),
            message: GameError::HandAborted.to_string(),
        };
        self.subscribers
            .retain(|_, subscriber| subscriber.sender.try_send(event.clone()).is_ok());
    }

    /// Exactly one next-hand timer may exist, and only while the table
    /// sits in showdown with two connected seats.
    fn sync_next_hand_timer(&mut self) {
        let state = self.engine.state();
        let wanted = state.stage == Stage::Showdown && state.connected_count() >= 2;
        match (wanted, self.next_hand_timer.is_some()) {
            (true, false) => {
                self.generation += 1;
                let generation = self.generation;
                let tx = self.self_tx.clone();
                let handle = tokio::spawn(async move {
                    sleep(NEXT_HAND_DELAY).await;
                    let _ = tx.send(TableMessage::NextHandDue { generation }).await;
                });
                self.next_hand_timer = Some(Timer { generation, handle });
            }
            (false, true) => {
                if let Some(timer) = self.next_hand_timer.take() {
                    timer.cancel();
                }
            }
            _ => {}
        }
    }

    fn start_grace_timer(&mut self, player: PlayerId) {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.self_tx.clone();
        let expired_player = player.clone();
        let handle = tokio::spawn(async move {
            sleep(DISCONNECT_GRACE).await;
            let _ = tx
                .send(TableMessage::GraceExpired {
                    player: expired_player,
                    generation,
                })
                .await;
        });
        if let Some(previous) = self.grace_timers.insert(player, Timer { generation, handle }) {
            previous.cancel();
        }
    }

    fn cancel_grace_timer(&mut self, player: &PlayerId) {
        if let Some(timer) = self.grace_timers.remove(player) {
            timer.cancel();
        }
    }
}
