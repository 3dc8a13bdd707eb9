//! Table actor messages and the handle used to send them.

use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::game::entities::{
    Action, Chips, PlayerId, SeatIndex, TableId, TableSummary, TableView,
};
use crate::game::errors::GameError;
use crate::session::messages::ServerEvent;

/// Messages a table actor accepts. Request/response pairs carry a
/// oneshot; fire-and-forget messages (subscriptions, timer wakeups)
/// do not.
#[derive(Debug)]
pub enum TableMessage {
    Join {
        player: PlayerId,
        display_name: String,
        buy_in: Chips,
        preferred_seat: Option<SeatIndex>,
        respond: oneshot::Sender<Result<SeatIndex, GameError>>,
    },
    Leave {
        player: PlayerId,
        respond: oneshot::Sender<Result<(), GameError>>,
    },
    Act {
        action: Action,
        respond: oneshot::Sender<Result<(), GameError>>,
    },
    ChangeSeat {
        player: PlayerId,
        new_seat: SeatIndex,
        respond: oneshot::Sender<Result<(), GameError>>,
    },
    StartHand {
        respond: oneshot::Sender<Result<(), GameError>>,
    },
    GetView {
        viewer: Option<PlayerId>,
        respond: oneshot::Sender<TableView>,
    },
    GetSummary {
        respond: oneshot::Sender<TableSummary>,
    },
    /// Register a session for state pushes. Seated players get their
    /// own projection, everyone else the spectator one.
    Subscribe {
        session: Uuid,
        viewer: Option<PlayerId>,
        sender: mpsc::Sender<ServerEvent>,
    },
    Unsubscribe {
        session: Uuid,
    },
    /// The player's transport dropped; start the disconnect grace
    /// window.
    SessionClosed {
        player: PlayerId,
    },
    /// Internal: a grace window ran out.
    GraceExpired {
        player: PlayerId,
        generation: u64,
    },
    /// Internal: the post-showdown pause is over.
    NextHandDue {
        generation: u64,
    },
}

/// Cheap cloneable handle to a table actor.
#[derive(Clone, Debug)]
pub struct TableHandle {
    id: TableId,
    sender: mpsc::Sender<TableMessage>,
}

impl TableHandle {
    #[must_use]
    pub fn new(id: TableId, sender: mpsc::Sender<TableMessage>) -> Self {
        Self { id, sender }
    }

    #[must_use]
    pub fn id(&self) -> &TableId {
        &self.id
    }

    pub async fn send(&self, message: TableMessage) -> Result<(), GameError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| GameError::TableNotFound)
    }

    pub async fn join(
        &self,
        player: PlayerId,
        display_name: String,
        buy_in: Chips,
        preferred_seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::Join {
            player,
            display_name,
            buy_in,
            preferred_seat,
            respond: tx,
        })
        .await?;
        rx.await.map_err(|_| GameError::TableNotFound)?
    }

    pub async fn leave(&self, player: PlayerId) -> Result<(), GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::Leave {
            player,
            respond: tx,
        })
        .await?;
        rx.await.map_err(|_| GameError::TableNotFound)?
    }

    pub async fn act(&self, action: Action) -> Result<(), GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::Act {
            action,
            respond: tx,
        })
        .await?;
        rx.await.map_err(|_| GameError::TableNotFound)?
    }

    pub async fn change_seat(
        &self,
        player: PlayerId,
        new_seat: SeatIndex,
    ) -> Result<(), GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::ChangeSeat {
            player,
            new_seat,
            respond: tx,
        })
        .await?;
        rx.await.map_err(|_| GameError::TableNotFound)?
    }

    pub async fn start_hand(&self) -> Result<(), GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::StartHand { respond: tx }).await?;
        rx.await.map_err(|_| GameError::TableNotFound)?
    }

    pub async fn view(&self, viewer: Option<PlayerId>) -> Result<TableView, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::GetView {
            viewer,
            respond: tx,
        })
        .await?;
        rx.await.map_err(|_| GameError::TableNotFound)
    }

    pub async fn summary(&self) -> Result<TableSummary, GameError> {
        let (tx, rx) = oneshot::channel();
        self.send(TableMessage::GetSummary { respond: tx }).await?;
        rx.await.map_err(|_| GameError::TableNotFound)
    }

    pub async fn subscribe(
        &self,
        session: Uuid,
        viewer: Option<PlayerId>,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Result<(), GameError> {
        self.send(TableMessage::Subscribe {
            session,
            viewer,
            sender,
        })
        .await
    }

    pub async fn unsubscribe(&self, session: Uuid) -> Result<(), GameError> {
        self.send(TableMessage::Unsubscribe { session }).await
    }

    pub async fn session_closed(&self, player: PlayerId) -> Result<(), GameError> {
        self.send(TableMessage::SessionClosed { player }).await
    }
}
