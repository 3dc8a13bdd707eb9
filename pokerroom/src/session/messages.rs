//! Wire protocol.
//!
//! Every frame is a JSON envelope `{"event": <name>, "data": {...}}`.
//! Client requests are answered with a [`Reply`]; server pushes reuse
//! the same envelope shape in the other direction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::entities::{
    ActionKind, BettingType, Chips, SeatIndex, TableId, TableSummary, TableView,
};
use crate::game::variant::Variant;

/// Blinds as user table creation supplies them.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BlindsSpec {
    pub small: Chips,
    pub big: Chips,
}

/// Client → server events.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    #[serde(rename_all = "camelCase")]
    JoinTable {
        table_id: TableId,
        buy_in: Chips,
        #[serde(default)]
        seat_index: Option<SeatIndex>,
    },
    #[serde(rename_all = "camelCase")]
    LeaveTable { table_id: TableId },
    #[serde(rename_all = "camelCase")]
    StartHand { table_id: TableId },
    #[serde(rename_all = "camelCase")]
    Action {
        table_id: TableId,
        kind: ActionKind,
        #[serde(default)]
        amount: Option<Chips>,
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    ChangeSeat {
        table_id: TableId,
        new_seat_index: SeatIndex,
    },
    #[serde(rename_all = "camelCase")]
    WatchTable { table_id: TableId },
    #[serde(rename_all = "camelCase")]
    UnwatchTable { table_id: TableId },
    #[serde(rename_all = "camelCase")]
    CreateUserTable {
        variant: Variant,
        stake_label: String,
        blinds: BlindsSpec,
        betting_type: BettingType,
    },
    GetTables,
    SubscribeTables,
    UnsubscribeTables,
    #[serde(rename_all = "camelCase")]
    GetState { table_id: TableId },
}

/// Server → client events.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Viewer-specific projection, sent to a seated player.
    GameState(TableView),
    /// Sanitized projection for the table's spectator channel.
    SpectatorState(TableView),
    /// Current table list, sent to lobby subscribers.
    TableList(Vec<TableSummary>),
    #[serde(rename_all = "camelCase")]
    AuthError { message: String },
    /// A hand was aborted server-side; bets were refunded.
    #[serde(rename_all = "camelCase")]
    TableError { table_id: TableId, message: String },
}

/// Reply to any client request.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Reply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat: Option<SeatIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "tableId")]
    pub table_id: Option<TableId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tables: Option<Vec<TableSummary>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<TableView>,
}

impl Reply {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn err(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seat(mut self, seat: SeatIndex) -> Self {
        self.seat = Some(seat);
        self
    }

    #[must_use]
    pub fn with_table_id(mut self, id: TableId) -> Self {
        self.table_id = Some(id);
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: Vec<TableSummary>) -> Self {
        self.tables = Some(tables);
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: TableView) -> Self {
        self.state = Some(state);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_table_envelope_round_trips() {
        let json = r#"{"event":"joinTable","data":{"tableId":"sys-texas-1/2-0","buyIn":200,"seatIndex":3}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::JoinTable {
                table_id: "sys-texas-1/2-0".to_string(),
                buy_in: 200,
                seat_index: Some(3),
            }
        );
    }

    #[test]
    fn action_event_parses_without_amount() {
        let json = r#"{"event":"action","data":{"tableId":"t","kind":"check"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(
            event,
            ClientEvent::Action {
                kind: ActionKind::Check,
                amount: None,
                ..
            }
        ));
    }

    #[test]
    fn dataless_events_parse() {
        let event: ClientEvent = serde_json::from_str(r#"{"event":"getTables"}"#).unwrap();
        assert_eq!(event, ClientEvent::GetTables);
        let event: ClientEvent =
            serde_json::from_str(r#"{"event":"subscribeTables"}"#).unwrap();
        assert_eq!(event, ClientEvent::SubscribeTables);
    }

    #[test]
    fn create_user_table_parses() {
        let json = r#"{"event":"createUserTable","data":{"variant":"omaha_hi_lo","stakeLabel":"5/10","blinds":{"small":5,"big":10},"bettingType":"pot_limit"}}"#;
        let event: ClientEvent = serde_json::from_str(json).unwrap();
        assert_eq!(
            event,
            ClientEvent::CreateUserTable {
                variant: Variant::OmahaHiLo,
                stake_label: "5/10".to_string(),
                blinds: BlindsSpec { small: 5, big: 10 },
                betting_type: BettingType::PotLimit,
            }
        );
    }

    #[test]
    fn reply_omits_empty_fields() {
        let json = serde_json::to_string(&Reply::ok()).unwrap();
        assert_eq!(json, r#"{"success":true}"#);

        let json = serde_json::to_string(&Reply::err("table is full")).unwrap();
        assert_eq!(json, r#"{"success":false,"error":"table is full"}"#);
    }

    #[test]
    fn server_events_are_tagged() {
        let event = ServerEvent::AuthError {
            message: "bad token".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"event":"authError","data":{"message":"bad token"}}"#);
    }
}
