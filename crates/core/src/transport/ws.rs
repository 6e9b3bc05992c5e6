//! Loopback WebSocket pairing transport
//!
//! Listens on an OS-assigned port, authenticates the `auth` query parameter
//! in constant time, and admits exactly one peer at a time. Text frames are
//! forwarded verbatim to the session layer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Instant};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{Request, Response},
        Error as WsError, Message,
    },
    WebSocketStream,
};
use tracing::{debug, info};
use url::Url;

use super::{PeerLink, Transport, TransportEvent};
use crate::errors::{CompanionError, Result};
use crate::runtime::RUNTIME;
use crate::util::{ct_eq, generate_token};

const TOKEN_LENGTH: usize = 32;
const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// One open pairing channel
struct Channel {
    shutdown: watch::Sender<bool>,
}

/// WebSocket listener transport bound to the loopback interface
pub struct WsTransport {
    bind_host: String,
    bind_port: u16,
    state: Mutex<Option<Channel>>,
}

impl WsTransport {
    pub fn new(bind_host: impl Into<String>, bind_port: u16) -> WsTransport {
        WsTransport {
            bind_host: bind_host.into(),
            bind_port,
            state: Mutex::new(None),
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().unwrap().is_some()
    }
}

impl Transport for WsTransport {
    fn scheme(&self) -> &'static str {
        "ws"
    }

    fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Result<String> {
        let mut state = self.state.lock().unwrap();

        if state.is_some() {
            return Err(CompanionError::Transport(
                "pairing channel already open".to_string(),
            ));
        }

        // Bind on a random port unless the config pins one
        let listener = std::net::TcpListener::bind((self.bind_host.as_str(), self.bind_port))?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;

        let token = generate_token(TOKEN_LENGTH);
        let peer_id = format!("ws://{}/?auth={}", addr, token);

        let listener = {
            let _guard = RUNTIME.enter();
            tokio::net::TcpListener::from_std(listener)?
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        RUNTIME.spawn(run_accept_loop(listener, token, events, shutdown_rx));

        info!(%addr, "pairing channel open");
        *state = Some(Channel {
            shutdown: shutdown_tx,
        });

        Ok(peer_id)
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();

        if let Some(channel) = state.take() {
            let _ = channel.shutdown.send(true);
            info!("pairing channel closed");
        }
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Accept connections until shutdown and hand each to its own task
async fn run_accept_loop(
    listener: tokio::net::TcpListener,
    token: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let claimed = Arc::new(AtomicBool::new(false));

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, _addr)) => {
                    let token_clone = token.clone();
                    let events_clone = events.clone();
                    let claimed_clone = Arc::clone(&claimed);
                    let shutdown_clone = shutdown.clone();

                    tokio::spawn(async move {
                        handle_connection(
                            stream,
                            token_clone,
                            events_clone,
                            claimed_clone,
                            shutdown_clone,
                        )
                        .await;
                    });
                },
                Err(e) => {
                    debug!(error = %e, "accept failed");
                },
            },
        }
    }
}

/// Handle a single WebSocket connection
async fn handle_connection(
    stream: TcpStream,
    expected_token: String,
    events: mpsc::UnboundedSender<TransportEvent>,
    claimed: Arc<AtomicBool>,
    shutdown: watch::Receiver<bool>,
) {
    let peer_addr = stream.peer_addr().ok();

    let websocket = match accept_with_auth(stream, &expected_token, &claimed).await {
        Ok(websocket) => websocket,
        Err(e) => {
            debug!(addr = ?peer_addr, error = %e, "handshake refused");
            return;
        },
    };

    info!(addr = ?peer_addr, "peer attached");

    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let _ = events.send(TransportEvent::PeerConnected {
        link: PeerLink::new(outbound_tx),
    });

    let reason = run_message_loop(websocket, outbound_rx, &events, shutdown).await;

    // Free the slot before announcing the detach so the peer may redial
    claimed.store(false, Ordering::SeqCst);
    let _ = events.send(TransportEvent::PeerClosed);

    match reason {
        Ok(reason) => info!(addr = ?peer_addr, reason, "peer detached"),
        Err(e) => debug!(addr = ?peer_addr, error = %e, "connection errored"),
    }
}

/// Run the WebSocket message loop for an attached peer
async fn run_message_loop(
    websocket: WebSocketStream<TcpStream>,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    events: &mpsc::UnboundedSender<TransportEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> std::result::Result<&'static str, WsError> {
    let (mut write, mut read) = websocket.split();

    let mut ping_interval = interval(PING_INTERVAL);
    let mut last_pong = Instant::now();

    loop {
        // Check pong timeout
        if last_pong.elapsed() >= PONG_TIMEOUT {
            break;
        }

        tokio::select! {
            // Channel teardown
            _ = shutdown.changed() => {
                let _ = write.close().await;
                return Ok("channel closed");
            }

            // Send ping
            _ = ping_interval.tick() => {
                write.send(Message::Ping(vec![].into())).await?;
            }

            // Send outbound messages
            Some(msg) = outbound_rx.recv() => {
                write.send(Message::Text(msg.into())).await?;
            }

            // Receive messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let _ = events.send(TransportEvent::Data(text.to_string()));
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let _ = write.send(Message::Close(frame)).await;
                        return Ok("peer closed");
                    }
                    Some(Err(e)) => {
                        return Err(e);
                    }
                    None => {
                        return Ok("stream ended");
                    }
                    _ => {}
                }
            }
        }
    }

    let _ = write.close().await;
    Ok("pong timeout")
}

/// Accept a WebSocket handshake, checking the auth token and the peer slot
///
/// Wrong or missing tokens get HTTP 401; a second concurrent peer gets 409.
async fn accept_with_auth(
    stream: TcpStream,
    expected_token: &str,
    claimed: &Arc<AtomicBool>,
) -> std::result::Result<WebSocketStream<TcpStream>, WsError> {
    let expected = expected_token.to_string();
    let claim = Arc::clone(claimed);
    let we_claimed = Arc::new(AtomicBool::new(false));
    let claim_witness = Arc::clone(&we_claimed);

    let callback = move |req: &Request, response: Response| {
        let full_url = format!(
            "ws://{}{}",
            req.uri()
                .authority()
                .map(|a| a.as_str())
                .unwrap_or("localhost"),
            req.uri()
        );

        let url = match Url::parse(&full_url) {
            Ok(url) => url,
            Err(_) => return Err(reject(http::StatusCode::BAD_REQUEST, "Bad Request")),
        };

        let auth_token = url
            .query_pairs()
            .find(|(key, _)| key == "auth")
            .map(|(_, value)| value.into_owned());

        match auth_token {
            Some(token) if ct_eq(&token, &expected) => {
                if claim
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
                {
                    claim_witness.store(true, Ordering::SeqCst);
                    Ok(response)
                } else {
                    Err(reject(http::StatusCode::CONFLICT, "Already Paired"))
                }
            },
            _ => Err(reject(http::StatusCode::UNAUTHORIZED, "Unauthorized")),
        }
    };

    match accept_hdr_async(stream, callback).await {
        Ok(websocket) => Ok(websocket),
        Err(e) => {
            // A handshake that claimed the slot but failed mid-flight
            // must give it back
            if we_claimed.load(Ordering::SeqCst) {
                claimed.store(false, Ordering::SeqCst);
            }
            Err(e)
        },
    }
}

fn reject(status: http::StatusCode, body: &str) -> http::Response<Option<String>> {
    http::Response::builder()
        .status(status)
        .body(Some(body.to_string()))
        .unwrap()
}
