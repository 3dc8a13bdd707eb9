//! Session coordinator.
//!
//! Maps transport sessions to player identities and tables, dispatches
//! client events, and drives everything a client can observe: state
//! pushes after every table mutation, the lobby's table-list channel,
//! and the disconnect grace window. One coordinator serves the whole
//! process; per-table ordering comes from the table actors.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::auth::{Identity, IdentityResolver};
use crate::game::entities::{Action, Blinds, Chips, TableId, TableSummary};
use crate::game::errors::GameError;
use crate::lobby::{Lobby, LobbyConfig};
use crate::session::messages::{ClientEvent, Reply, ServerEvent};
use crate::table::TableHandle;
use crate::wallet::WalletAdapter;

pub type SessionId = Uuid;

struct SessionEntry {
    identity: Option<Identity>,
    push: mpsc::Sender<ServerEvent>,
    /// Tables this session joined or watches, for cleanup on close.
    tables: HashSet<TableId>,
    lobby_subscribed: bool,
}

pub struct SessionCoordinator {
    lobby: Arc<Lobby>,
    identity: Arc<dyn IdentityResolver>,
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionCoordinator {
    /// Bring up the lobby and the table-list fanout task.
    pub async fn start(
        lobby_config: LobbyConfig,
        identity: Arc<dyn IdentityResolver>,
        wallet: Arc<dyn WalletAdapter>,
    ) -> Arc<Self> {
        let (lobby_tx, lobby_rx) = mpsc::channel(256);
        let lobby = Lobby::start(lobby_config, wallet, lobby_tx).await;
        let coordinator = Arc::new(Self {
            lobby,
            identity,
            sessions: RwLock::new(HashMap::new()),
        });
        tokio::spawn(Self::fan_out_table_list(coordinator.clone(), lobby_rx));
        coordinator
    }

    #[must_use]
    pub fn lobby(&self) -> &Arc<Lobby> {
        &self.lobby
    }

    /// Keep a summary cache current from actor updates and push the
    /// full list to every lobby subscriber on each change.
    async fn fan_out_table_list(
        coordinator: Arc<Self>,
        mut lobby_rx: mpsc::Receiver<TableSummary>,
    ) {
        let mut cache: HashMap<TableId, TableSummary> = coordinator
            .lobby
            .summaries()
            .await
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();
        while let Some(summary) = lobby_rx.recv().await {
            cache.insert(summary.id.clone(), summary);
            let mut list: Vec<TableSummary> = cache.values().cloned().collect();
            list.sort_by(|a, b| a.id.cmp(&b.id));

            let sessions = coordinator.sessions.read().await;
            for entry in sessions.values().filter(|e| e.lobby_subscribed) {
                let _ = entry.push.try_send(ServerEvent::TableList(list.clone()));
            }
        }
    }

    /// Open a session. A valid credential binds the session to the
    /// resolved identity; anything else leaves it a spectator (an
    /// invalid token additionally gets an `authError` push).
    pub async fn connect(
        &self,
        token: Option<&str>,
        push: mpsc::Sender<ServerEvent>,
    ) -> (SessionId, Option<Identity>) {
        let mut identity = None;
        if let Some(token) = token {
            match self.identity.resolve(token).await {
                Ok(resolved) => identity = Some(resolved),
                Err(e) => {
                    let _ = push.try_send(ServerEvent::AuthError {
                        message: e.to_string(),
                    });
                }
            }
        }
        let session = Uuid::new_v4();
        self.sessions.write().await.insert(
            session,
            SessionEntry {
                identity: identity.clone(),
                push,
                tables: HashSet::new(),
                lobby_subscribed: false,
            },
        );
        match &identity {
            Some(identity) => info!("session {session}: connected as {}", identity.id),
            None => info!("session {session}: connected as spectator"),
        }
        (session, identity)
    }

    /// The transport closed. Unsubscribe everywhere and let each table
    /// the player was seated at start its grace window.
    pub async fn disconnect(&self, session: SessionId) {
        let Some(entry) = self.sessions.write().await.remove(&session) else {
            return;
        };
        for table_id in &entry.tables {
            if let Some(handle) = self.lobby.get(table_id).await {
                let _ = handle.unsubscribe(session).await;
                if let Some(identity) = &entry.identity {
                    let _ = handle.session_closed(identity.id.clone()).await;
                }
            }
        }
        debug!("session {session}: closed");
    }

    async fn entry_identity(&self, session: SessionId) -> Option<Identity> {
        self.sessions
            .read()
            .await
            .get(&session)
            .and_then(|e| e.identity.clone())
    }

    async fn entry_push(&self, session: SessionId) -> Option<mpsc::Sender<ServerEvent>> {
        self.sessions
            .read()
            .await
            .get(&session)
            .map(|e| e.push.clone())
    }

    async fn track_table(&self, session: SessionId, table_id: &TableId, joined: bool) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(&session) {
            if joined {
                entry.tables.insert(table_id.clone());
            } else {
                entry.tables.remove(table_id);
            }
        }
    }

    async fn table(&self, table_id: &str) -> Result<TableHandle, GameError> {
        self.lobby
            .get(table_id)
            .await
            .ok_or(GameError::TableNotFound)
    }

    /// Dispatch one client event and produce its reply. All state
    /// pushes happen out-of-band through the session's push channel.
    pub async fn handle(&self, session: SessionId, event: ClientEvent) -> Reply {
        match event {
            ClientEvent::JoinTable {
                table_id,
                buy_in,
                seat_index,
            } => self.handle_join(session, table_id, buy_in, seat_index).await,

            ClientEvent::LeaveTable { table_id } => {
                let Some(identity) = self.entry_identity(session).await else {
                    return Reply::err(GameError::NotAuthenticated);
                };
                let handle = match self.table(&table_id).await {
                    Ok(handle) => handle,
                    Err(e) => return Reply::err(e),
                };
                match handle.leave(identity.id).await {
                    Ok(()) => {
                        let _ = handle.unsubscribe(session).await;
                        self.track_table(session, &table_id, false).await;
                        Reply::ok()
                    }
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::StartHand { table_id } => {
                if self.entry_identity(session).await.is_none() {
                    return Reply::err(GameError::NotAuthenticated);
                }
                match self.table(&table_id).await {
                    Ok(handle) => match handle.start_hand().await {
                        Ok(()) => Reply::ok(),
                        Err(e) => Reply::err(e),
                    },
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::Action {
                table_id,
                kind,
                amount,
                timestamp,
            } => {
                let Some(identity) = self.entry_identity(session).await else {
                    return Reply::err(GameError::NotAuthenticated);
                };
                let handle = match self.table(&table_id).await {
                    Ok(handle) => handle,
                    Err(e) => return Reply::err(e),
                };
                // The acting player is always the session's bound
                // identity; there is no way to act for someone else.
                let action = Action {
                    player: identity.id,
                    table: table_id,
                    kind,
                    amount,
                    timestamp: timestamp.unwrap_or_else(Utc::now),
                };
                match handle.act(action).await {
                    Ok(()) => Reply::ok(),
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::ChangeSeat {
                table_id,
                new_seat_index,
            } => {
                let Some(identity) = self.entry_identity(session).await else {
                    return Reply::err(GameError::NotAuthenticated);
                };
                match self.table(&table_id).await {
                    Ok(handle) => match handle.change_seat(identity.id, new_seat_index).await {
                        Ok(()) => Reply::ok(),
                        Err(e) => Reply::err(e),
                    },
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::WatchTable { table_id } => {
                let Some(push) = self.entry_push(session).await else {
                    return Reply::err(GameError::NotAuthenticated);
                };
                match self.table(&table_id).await {
                    Ok(handle) => {
                        let _ = handle.subscribe(session, None, push).await;
                        self.track_table(session, &table_id, true).await;
                        Reply::ok()
                    }
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::UnwatchTable { table_id } => {
                match self.table(&table_id).await {
                    Ok(handle) => {
                        let _ = handle.unsubscribe(session).await;
                        self.track_table(session, &table_id, false).await;
                        Reply::ok()
                    }
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::CreateUserTable {
                variant,
                stake_label,
                blinds,
                betting_type,
            } => {
                if self.entry_identity(session).await.is_none() {
                    return Reply::err(GameError::NotAuthenticated);
                }
                match self
                    .lobby
                    .create_user_table(
                        variant,
                        stake_label,
                        Blinds::new(blinds.small, blinds.big),
                        betting_type,
                    )
                    .await
                {
                    Ok(id) => Reply::ok().with_table_id(id),
                    Err(e) => Reply::err(e),
                }
            }

            ClientEvent::GetTables => Reply::ok().with_tables(self.lobby.summaries().await),

            ClientEvent::SubscribeTables => {
                let mut sessions = self.sessions.write().await;
                let Some(entry) = sessions.get_mut(&session) else {
                    return Reply::err(GameError::NotAuthenticated);
                };
                entry.lobby_subscribed = true;
                drop(sessions);
                Reply::ok().with_tables(self.lobby.summaries().await)
            }

            ClientEvent::UnsubscribeTables => {
                let mut sessions = self.sessions.write().await;
                if let Some(entry) = sessions.get_mut(&session) {
                    entry.lobby_subscribed = false;
                }
                Reply::ok()
            }

            ClientEvent::GetState { table_id } => {
                let viewer = self.entry_identity(session).await.map(|i| i.id);
                match self.table(&table_id).await {
                    Ok(handle) => match handle.view(viewer).await {
                        Ok(view) => Reply::ok().with_state(view),
                        Err(e) => Reply::err(e),
                    },
                    Err(e) => Reply::err(e),
                }
            }
        }
    }

    async fn handle_join(
        &self,
        session: SessionId,
        table_id: TableId,
        buy_in: Chips,
        seat_index: Option<usize>,
    ) -> Reply {
        let Some(identity) = self.entry_identity(session).await else {
            return Reply::err(GameError::NotAuthenticated);
        };
        let Some(push) = self.entry_push(session).await else {
            return Reply::err(GameError::NotAuthenticated);
        };
        let handle = match self.table(&table_id).await {
            Ok(handle) => handle,
            Err(e) => return Reply::err(e),
        };

        match handle
            .join(
                identity.id.clone(),
                identity.display_name.clone(),
                buy_in,
                seat_index,
            )
            .await
        {
            Ok(seat) => {
                let _ = handle.subscribe(session, Some(identity.id), push).await;
                self.track_table(session, &table_id, true).await;
                // Keep the class seatable for the next player.
                if let Ok(summary) = handle.summary().await {
                    self.lobby.ensure_capacity(summary.variant, &summary.stake).await;
                }
                Reply::ok().with_seat(seat)
            }
            Err(e) => Reply::err(e),
        }
    }
}
