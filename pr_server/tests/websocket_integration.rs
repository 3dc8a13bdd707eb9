//! End-to-end WebSocket tests: a real server on an ephemeral port,
//! driven by a tungstenite client speaking the JSON envelope protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pokerroom::session::SessionCoordinator;
use pokerroom::{LobbyConfig, StakeDef, Variant, auth::StaticIdentities, wallet::InMemoryWallet};
use pr_server::api::{self, AppState};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> SocketAddr {
    let identities = StaticIdentities::new();
    identities.register("tok-alice", "alice", "Alice").await;
    identities.register("tok-bob", "bob", "Bob").await;

    let wallet = Arc::new(InMemoryWallet::new(10_000));
    let config = LobbyConfig {
        stakes: vec![StakeDef::new(1, 2)],
        variants: vec![Variant::Texas],
    };
    let coordinator = SessionCoordinator::start(config, Arc::new(identities), wallet).await;
    let app = api::create_router(AppState { coordinator });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr, token: Option<&str>) -> WsClient {
    let url = match token {
        Some(token) => format!("ws://{addr}/ws?token={token}"),
        None => format!("ws://{addr}/ws"),
    };
    let (client, _) = connect_async(url).await.expect("websocket connect");
    client
}

async fn send(client: &mut WsClient, frame: Value) {
    client
        .send(Message::Text(frame.to_string().into()))
        .await
        .expect("send frame");
}

/// Next JSON frame matching the predicate, discarding the rest.
async fn next_matching<F>(client: &mut WsClient, mut predicate: F) -> Value
where
    F: FnMut(&Value) -> bool,
{
    timeout(Duration::from_secs(3), async {
        loop {
            let message = client.next().await.expect("stream ended").expect("frame");
            if let Message::Text(text) = message {
                let frame: Value = serde_json::from_str(&text).expect("json frame");
                if predicate(&frame) {
                    return frame;
                }
            }
        }
    })
    .await
    .expect("no matching frame within 3s")
}

#[tokio::test]
async fn get_tables_round_trip() {
    let addr = start_server().await;
    let mut client = connect(addr, Some("tok-alice")).await;

    send(&mut client, json!({"event": "getTables"})).await;
    let reply = next_matching(&mut client, |f| f.get("success").is_some()).await;

    assert_eq!(reply["success"], json!(true));
    let tables = reply["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0]["id"], json!("sys-texas-1/2-0"));
    assert_eq!(tables[0]["variant"], json!("texas"));
}

#[tokio::test]
async fn bad_token_yields_auth_error_push() {
    let addr = start_server().await;
    let mut client = connect(addr, Some("who-dis")).await;

    let frame = next_matching(&mut client, |f| f.get("event").is_some()).await;
    assert_eq!(frame["event"], json!("authError"));
}

#[tokio::test]
async fn two_players_reach_a_dealt_hand() {
    let addr = start_server().await;
    let mut alice = connect(addr, Some("tok-alice")).await;
    let mut bob = connect(addr, Some("tok-bob")).await;

    send(
        &mut alice,
        json!({"event": "joinTable",
               "data": {"tableId": "sys-texas-1/2-0", "buyIn": 200, "seatIndex": 0}}),
    )
    .await;
    let reply = next_matching(&mut alice, |f| f.get("success").is_some()).await;
    assert_eq!(reply["success"], json!(true));
    assert_eq!(reply["seat"], json!(0));

    send(
        &mut bob,
        json!({"event": "joinTable",
               "data": {"tableId": "sys-texas-1/2-0", "buyIn": 200, "seatIndex": 1}}),
    )
    .await;
    let reply = next_matching(&mut bob, |f| f.get("success").is_some()).await;
    assert_eq!(reply["success"], json!(true));

    // Both joins landed: a hand is dealt and alice's push shows her
    // cards but not bob's.
    let frame = next_matching(&mut alice, |f| {
        f["event"] == json!("gameState") && f["data"]["stage"] == json!("preflop")
    })
    .await;
    let seats = frame["data"]["seats"].as_array().unwrap();
    let alice_seat = seats.iter().find(|s| s["player"] == json!("alice")).unwrap();
    let bob_seat = seats.iter().find(|s| s["player"] == json!("bob")).unwrap();
    assert!(alice_seat.get("cards").is_some_and(|c| c.is_array()));
    assert!(bob_seat.get("cards").is_none_or(|c| c.is_null()));
}
