//! End-to-end pairing handshake over a real WebSocket connection
//!
//! A tokio-tungstenite client plays the phone app: it dials the advertised
//! ticket, reads the ack, and pushes the initial snapshot.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::Receiver;
use futures_util::{SinkExt, StreamExt};
use prompt_master_core::session::PairingTicket;
use prompt_master_core::{runtime, App, AppConfig, AppEvent, Snapshot};
use serde_json::json;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

const ACK: &str = r#"{"status":"connected"}"#;

fn paired_app() -> (App, Receiver<AppEvent>, PairingTicket, TempDir) {
    prompt_master_core::logging::init();

    let dir = TempDir::new().unwrap();
    let config = AppConfig {
        data_dir: dir.path().to_path_buf(),
        ..AppConfig::default()
    };
    let app = runtime::block_on(App::bootstrap(config)).unwrap();
    let (_id, events) = app.subscribe();
    app.start().unwrap();
    let ticket = wait_ticket(&events);
    (app, events, ticket, dir)
}

fn wait_for(events: &Receiver<AppEvent>, pred: impl Fn(&AppEvent) -> bool) -> AppEvent {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => {},
            Err(err) => panic!("expected event did not arrive: {}", err),
        }
    }
}

fn wait_ticket(events: &Receiver<AppEvent>) -> PairingTicket {
    match wait_for(events, |e| matches!(e, AppEvent::PairingReady { .. })) {
        AppEvent::PairingReady { ticket } => ticket,
        _ => unreachable!(),
    }
}

fn dial(url: &str) -> Client {
    runtime::block_on(async { connect_async(url).await.unwrap().0 })
}

fn next_text(client: &mut Client) -> String {
    runtime::block_on(async {
        tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(frame) = client.next().await {
                if let Message::Text(text) = frame.unwrap() {
                    return text.to_string();
                }
            }
            panic!("connection ended before a text frame");
        })
        .await
        .unwrap()
    })
}

fn send_text(client: &mut Client, text: String) {
    runtime::block_on(async { client.send(Message::Text(text.into())).await.unwrap() });
}

#[test]
fn test_handshake_loads_first_snapshot() {
    let (app, events, ticket, _dir) = paired_app();
    assert_eq!(ticket.scheme, "ws");

    let mut client = dial(&ticket.peer_id);
    assert_eq!(next_text(&mut client), ACK);

    send_text(&mut client, serde_json::to_string(&Snapshot::demo()).unwrap());
    wait_for(&events, |e| {
        matches!(e, AppEvent::SnapshotLoaded { prompts: 3, .. })
    });

    let listed = app.dispatch("prompts.list", json!({})).unwrap();
    assert_eq!(listed["prompts"].as_array().unwrap().len(), 3);

    let report = app.dispatch("session.status", json!({})).unwrap();
    assert_eq!(report["status"], "connected");
    assert!(!report["startedAt"].is_null());

    // The sync is one-shot; later payloads change nothing
    send_text(
        &mut client,
        json!({ "prompts": [{ "id": "x", "title": "T", "content": "C" }] }).to_string(),
    );
    std::thread::sleep(Duration::from_millis(300));
    let listed = app.dispatch("prompts.list", json!({})).unwrap();
    assert_eq!(listed["prompts"].as_array().unwrap().len(), 3);

    runtime::block_on(app.shutdown());
}

#[test]
fn test_rejects_wrong_token_and_second_peer() {
    let (app, _events, ticket, _dir) = paired_app();

    // Token appended with one char can never compare equal
    let tampered = format!("{}0", ticket.peer_id);
    let err = runtime::block_on(connect_async(tampered.as_str()))
        .err()
        .expect("handshake must be rejected");
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 401),
        other => panic!("expected http rejection, got {}", other),
    }

    let mut first = dial(&ticket.peer_id);
    assert_eq!(next_text(&mut first), ACK);

    let err = runtime::block_on(connect_async(ticket.peer_id.as_str()))
        .err()
        .expect("second peer must be rejected");
    match err {
        WsError::Http(response) => assert_eq!(response.status(), 409),
        other => panic!("expected http rejection, got {}", other),
    }

    runtime::block_on(app.shutdown());
}

#[test]
fn test_disconnect_wipes_and_reissues_ticket() {
    let (app, events, ticket, _dir) = paired_app();

    let mut client = dial(&ticket.peer_id);
    assert_eq!(next_text(&mut client), ACK);
    send_text(&mut client, serde_json::to_string(&Snapshot::demo()).unwrap());
    wait_for(&events, |e| matches!(e, AppEvent::SnapshotLoaded { .. }));

    let result = app.dispatch("session.disconnect", json!({})).unwrap();
    assert_eq!(result["status"], "waiting_for_peer");

    let listed = app.dispatch("prompts.list", json!({})).unwrap();
    assert!(listed["prompts"].as_array().unwrap().is_empty());

    // A fresh ticket with a fresh token is already advertised
    let fresh = wait_ticket(&events);
    assert_ne!(fresh.peer_id, ticket.peer_id);

    let mut redial = dial(&fresh.peer_id);
    assert_eq!(next_text(&mut redial), ACK);

    runtime::block_on(app.shutdown());
}

#[test]
fn test_ticket_is_scannable() {
    let (app, _events, ticket, _dir) = paired_app();

    assert_eq!(ticket.scheme, "ws");
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64;
    assert!((now_ms - ticket.timestamp).abs() < 5_000);

    let token = ticket.peer_id.split("auth=").nth(1).unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

    let encoded = ticket.encoded().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&encoded).unwrap();
    assert_eq!(parsed["type"], "ws");
    assert_eq!(parsed["peerId"], ticket.peer_id.as_str());

    runtime::block_on(app.shutdown());
}
