//! Pairing session lifecycle
//!
//! Owns the transport, advertises the pairing ticket, and pumps transport
//! events until the peer's first snapshot lands in the replica. One snapshot
//! per session; everything after it is ignored until `disconnect` starts a
//! fresh pairing.

pub(crate) mod payload;
mod ticket;

pub use ticket::PairingTicket;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::events::{AppEvent, EventBus, ToastLevel};
use crate::i18n::Catalog;
use crate::model::Snapshot;
use crate::runtime;
use crate::store::ReplicaStore;
use crate::transport::{Transport, TransportEvent};
use crate::util::format_elapsed;

/// Pairing lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    WaitingForPeer,
    Connecting,
    Connected,
    Error,
}

impl ConnectionStatus {
    /// Catalog key for the status line shells render
    pub fn label_key(&self) -> &'static str {
        match self {
            ConnectionStatus::Idle => "generating_qr",
            ConnectionStatus::WaitingForPeer => "waiting_for_scan",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "connection_error",
        }
    }
}

/// Mutable session fields, guarded by one short-lived lock
#[derive(Default)]
struct SessionState {
    status: ConnectionStatus,
    peer_id: Option<String>,
    ticket: Option<PairingTicket>,
    started_at: Option<DateTime<Utc>>,
    snapshot_taken: bool,
}

/// Answer to the `session.status` command
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub status_key: &'static str,
    pub peer_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub elapsed_seconds: Option<u64>,
    /// Session timer as `H:MM:SS`, or `M:SS` under an hour
    pub elapsed: Option<String>,
    pub ticket: Option<PairingTicket>,
}

/// Pairing state machine plus the transport it drives
pub struct SessionManager {
    transport: Box<dyn Transport>,
    inner: Arc<SessionInner>,
}

struct SessionInner {
    state: Mutex<SessionState>,
    store: Arc<ReplicaStore>,
    events: EventBus,
    catalog: Arc<RwLock<Catalog>>,
    accept_delay: Duration,
}

impl SessionManager {
    pub fn new(
        transport: Box<dyn Transport>,
        store: Arc<ReplicaStore>,
        events: EventBus,
        catalog: Arc<RwLock<Catalog>>,
        accept_delay: Duration,
    ) -> SessionManager {
        SessionManager {
            transport,
            inner: Arc::new(SessionInner {
                state: Mutex::new(SessionState::default()),
                store,
                events,
                catalog,
                accept_delay,
            }),
        }
    }

    /// Tear down any prior attempt and advertise a fresh pairing ticket
    pub fn begin_pairing(&self) -> Result<ConnectionStatus> {
        self.transport.close();

        {
            let mut state = self.inner.state.lock().unwrap();
            *state = SessionState::default();
            state.status = ConnectionStatus::WaitingForPeer;
        }
        self.inner.emit_status(ConnectionStatus::WaitingForPeer);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let peer_id = match self.transport.open(events_tx) {
            Ok(peer_id) => peer_id,
            Err(e) => {
                self.inner.fail(&e.to_string());
                return Err(e);
            },
        };

        let ticket = PairingTicket::new(self.transport.scheme(), peer_id.clone());
        {
            let mut state = self.inner.state.lock().unwrap();
            state.peer_id = Some(peer_id.clone());
            state.ticket = Some(ticket.clone());
        }

        info!(peer_id = %peer_id, "pairing started");
        self.inner.events.emit(AppEvent::PairingReady { ticket });

        runtime::spawn(run_event_pump(Arc::clone(&self.inner), events_rx));

        Ok(ConnectionStatus::WaitingForPeer)
    }

    /// End the session: destroy the channel, wipe the replica and its
    /// mirror, then immediately start pairing again
    pub async fn disconnect(&self) -> Result<ConnectionStatus> {
        info!("session disconnect");
        self.transport.close();

        self.inner.store.clear().await?;

        {
            let mut state = self.inner.state.lock().unwrap();
            *state = SessionState::default();
        }
        self.inner.emit_status(ConnectionStatus::Idle);

        self.begin_pairing()
    }

    /// Feed a snapshot in directly, as if the peer had sent it
    pub async fn ingest_snapshot(&self, snapshot: Snapshot) -> Result<bool> {
        self.inner.accept_snapshot(snapshot).await
    }

    /// Current state for the `session.status` command
    pub fn status(&self) -> StatusReport {
        let state = self.inner.state.lock().unwrap();
        let elapsed_seconds = state
            .started_at
            .map(|t| (Utc::now() - t).num_seconds().max(0) as u64);

        StatusReport {
            status: state.status,
            status_key: state.status.label_key(),
            peer_id: state.peer_id.clone(),
            started_at: state.started_at,
            elapsed_seconds,
            elapsed: elapsed_seconds.map(format_elapsed),
            ticket: state.ticket.clone(),
        }
    }

    /// Close the transport without restarting (embedder shutdown)
    pub fn shutdown(&self) {
        self.transport.close();
    }
}

impl SessionInner {
    fn emit_status(&self, status: ConnectionStatus) {
        self.events.emit(AppEvent::StatusChanged { status });
    }

    fn set_status(&self, status: ConnectionStatus) {
        {
            let mut state = self.state.lock().unwrap();
            state.status = status;
        }
        self.emit_status(status);
    }

    fn toast_text(&self, key: &str) -> String {
        self.catalog.read().unwrap().text(key)
    }

    /// Report a channel failure; parks in `Error` only while pairing
    fn fail(&self, reason: &str) {
        warn!(reason, "pairing channel failed");
        self.events
            .emit_toast(ToastLevel::Error, self.toast_text("connection_error"));

        let parked = {
            let state = self.state.lock().unwrap();
            matches!(
                state.status,
                ConnectionStatus::WaitingForPeer | ConnectionStatus::Connecting
            )
        };
        if parked {
            self.set_status(ConnectionStatus::Error);
        }
    }

    /// Load the one snapshot this session will take
    ///
    /// Returns false when a snapshot was already taken.
    async fn accept_snapshot(&self, snapshot: Snapshot) -> Result<bool> {
        {
            let mut state = self.state.lock().unwrap();
            if state.snapshot_taken {
                debug!("snapshot already taken; payload ignored");
                return Ok(false);
            }
            state.snapshot_taken = true;
        }

        // Presentational only; zero by default
        if !self.accept_delay.is_zero() {
            tokio::time::sleep(self.accept_delay).await;
        }

        let prompts = snapshot.prompts.len();
        let categories = snapshot.categories.len();
        let tags = snapshot.tags.len();

        if let Err(e) = self.store.bulk_load(snapshot).await {
            self.state.lock().unwrap().snapshot_taken = false;
            return Err(e);
        }

        {
            let mut state = self.state.lock().unwrap();
            state.started_at = Some(Utc::now());
            state.status = ConnectionStatus::Connected;
        }
        self.emit_status(ConnectionStatus::Connected);
        self.events.emit(AppEvent::SnapshotLoaded {
            prompts,
            categories,
            tags,
        });

        info!(prompts, categories, tags, "session connected");
        Ok(true)
    }
}

/// Process transport events for one pairing cycle
///
/// Ends when the transport drops its event sender (channel closed or
/// superseded by a newer pairing attempt).
async fn run_event_pump(
    inner: Arc<SessionInner>,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
) {
    while let Some(event) = inbound.recv().await {
        match event {
            TransportEvent::PeerConnected { link } => {
                let already_loaded = inner.state.lock().unwrap().snapshot_taken;
                if !already_loaded {
                    inner.set_status(ConnectionStatus::Connecting);
                }

                if let Err(e) = link.send(payload::ACK) {
                    debug!(error = %e, "ack not delivered");
                }
            },

            TransportEvent::Data(text) => match payload::parse_snapshot(&text) {
                Some(snapshot) => {
                    if let Err(e) = inner.accept_snapshot(snapshot).await {
                        warn!(error = %e, "snapshot load failed");
                        inner.events.emit_toast(ToastLevel::Error, e.user_message());
                    }
                },
                None => debug!(bytes = text.len(), "payload without prompts ignored"),
            },

            TransportEvent::PeerClosed => {
                info!("peer detached");
            },

            TransportEvent::Failed(reason) => inner.fail(&reason),
        }
    }

    debug!("event pump stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crossbeam_channel::Receiver;
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::db::{kv, Db};
    use crate::errors::CompanionError;

    #[derive(Clone, Default)]
    struct FakeTransport {
        shared: Arc<FakeShared>,
    }

    #[derive(Default)]
    struct FakeShared {
        sender: Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>,
        opens:  AtomicUsize,
        closes: AtomicUsize,
    }

    impl FakeTransport {
        fn push(&self, event: TransportEvent) {
            self.shared
                .sender
                .lock()
                .unwrap()
                .as_ref()
                .expect("transport not open")
                .send(event)
                .unwrap();
        }

        fn opens(&self) -> usize {
            self.shared.opens.load(Ordering::SeqCst)
        }

        fn closes(&self) -> usize {
            self.shared.closes.load(Ordering::SeqCst)
        }
    }

    impl Transport for FakeTransport {
        fn scheme(&self) -> &'static str {
            "fake"
        }

        fn open(&self, events: mpsc::UnboundedSender<TransportEvent>) -> Result<String> {
            let n = self.shared.opens.fetch_add(1, Ordering::SeqCst) + 1;
            *self.shared.sender.lock().unwrap() = Some(events);
            Ok(format!("fake-peer-{}", n))
        }

        fn close(&self) {
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
            *self.shared.sender.lock().unwrap() = None;
        }
    }

    struct Fixture {
        session: SessionManager,
        fake: FakeTransport,
        store: Arc<ReplicaStore>,
        db: Db,
        rx: Receiver<AppEvent>,
        _dir: TempDir,
    }

    async fn session_fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("session.db");
        let db = Db::open(db_path.to_str().unwrap()).await.unwrap();

        let events = EventBus::new();
        let (_, rx) = events.subscribe();
        let store = Arc::new(ReplicaStore::new(db.clone(), events.clone()));
        let catalog = Arc::new(RwLock::new(Catalog::builtin("en").unwrap()));

        let fake = FakeTransport::default();
        let session = SessionManager::new(
            Box::new(fake.clone()),
            Arc::clone(&store),
            events,
            catalog,
            Duration::ZERO,
        );

        Fixture {
            session,
            fake,
            store,
            db,
            rx,
            _dir: dir,
        }
    }

    async fn wait_for_event(
        rx: &Receiver<AppEvent>,
        log: &mut Vec<AppEvent>,
        pred: impl Fn(&AppEvent) -> bool,
    ) {
        for _ in 0..250 {
            log.extend(rx.try_iter());
            if log.iter().any(&pred) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("event not observed; saw {:?}", log);
    }

    fn demo_payload() -> String {
        serde_json::to_string(&Snapshot::demo()).unwrap()
    }

    fn attach_peer(fake: &FakeTransport) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        fake.push(TransportEvent::PeerConnected {
            link: crate::transport::PeerLink::new(tx),
        });
        rx
    }

    // ========================================
    // Pairing
    // ========================================

    #[tokio::test]
    async fn test_begin_pairing_advertises_ticket() {
        let fx = session_fixture().await;
        let mut log = Vec::new();

        let status = fx.session.begin_pairing().unwrap();
        assert_eq!(status, ConnectionStatus::WaitingForPeer);
        assert_eq!(fx.fake.opens(), 1);

        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::PairingReady { .. })
        })
        .await;

        let ticket = log
            .iter()
            .find_map(|e| match e {
                AppEvent::PairingReady { ticket } => Some(ticket.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(ticket.scheme, "fake");
        assert_eq!(ticket.peer_id, "fake-peer-1");

        let report = fx.session.status();
        assert_eq!(report.status, ConnectionStatus::WaitingForPeer);
        assert_eq!(report.status_key, "waiting_for_scan");
        assert_eq!(report.peer_id.as_deref(), Some("fake-peer-1"));
        assert!(report.started_at.is_none());
    }

    #[tokio::test]
    async fn test_peer_attach_acks_then_snapshot_connects() {
        let fx = session_fixture().await;
        let mut log = Vec::new();

        fx.session.begin_pairing().unwrap();
        let mut outbound = attach_peer(&fx.fake);

        // The ack goes out as soon as the peer attaches
        let ack = tokio::time::timeout(Duration::from_secs(5), outbound.recv())
            .await
            .expect("timed out waiting for ack")
            .expect("link dropped");
        assert_eq!(ack, payload::ACK);

        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(
                e,
                AppEvent::StatusChanged {
                    status: ConnectionStatus::Connecting
                }
            )
        })
        .await;

        fx.fake.push(TransportEvent::Data(demo_payload()));
        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::SnapshotLoaded { prompts: 3, .. })
        })
        .await;

        assert_eq!(fx.store.prompt_count(), 3);
        let report = fx.session.status();
        assert_eq!(report.status, ConnectionStatus::Connected);
        assert!(report.started_at.is_some());
        assert!(report.elapsed.is_some());
    }

    #[tokio::test]
    async fn test_stray_payloads_do_not_connect_or_load() {
        let fx = session_fixture().await;
        let mut log = Vec::new();

        fx.session.begin_pairing().unwrap();
        let _outbound = attach_peer(&fx.fake);

        // Ack echo and garbage first, then the real snapshot
        fx.fake
            .push(TransportEvent::Data(r#"{"status":"connected"}"#.into()));
        fx.fake.push(TransportEvent::Data("not json".into()));
        fx.fake.push(TransportEvent::Data(demo_payload()));

        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::SnapshotLoaded { .. })
        })
        .await;
        assert_eq!(fx.store.prompt_count(), 3);

        // A second snapshot after the first is ignored
        fx.fake.push(TransportEvent::Data(
            r#"{"prompts":[{"id":"x","title":"T","content":"C"}]}"#.into(),
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fx.store.prompt_count(), 3);
        assert_eq!(
            fx.session.status().status,
            ConnectionStatus::Connected
        );
    }

    #[tokio::test]
    async fn test_disconnect_wipes_replica_and_restarts() {
        let fx = session_fixture().await;
        let mut log = Vec::new();

        fx.session.begin_pairing().unwrap();
        let _outbound = attach_peer(&fx.fake);
        fx.fake.push(TransportEvent::Data(demo_payload()));
        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::SnapshotLoaded { .. })
        })
        .await;

        let status = fx.session.disconnect().await.unwrap();

        assert_eq!(status, ConnectionStatus::WaitingForPeer);
        assert!(fx.store.snapshot().is_empty());
        assert!(kv::get(&fx.db, kv::SESSION_SNAPSHOT).await.unwrap().is_none());
        assert!(fx.fake.closes() >= 1);

        // Fresh pairing, fresh peer id
        let report = fx.session.status();
        assert_eq!(report.peer_id.as_deref(), Some("fake-peer-2"));
        assert!(report.started_at.is_none());
    }

    // ========================================
    // Failure handling
    // ========================================

    #[tokio::test]
    async fn test_failed_parks_in_error_only_while_pairing() {
        let fx = session_fixture().await;
        let mut log = Vec::new();

        fx.session.begin_pairing().unwrap();
        fx.fake.push(TransportEvent::Failed("bind lost".into()));

        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::Toast { level: ToastLevel::Error, message } if message == "Connection failed")
        })
        .await;
        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(
                e,
                AppEvent::StatusChanged {
                    status: ConnectionStatus::Error
                }
            )
        })
        .await;

        // Manual retry works
        fx.session.begin_pairing().unwrap();
        assert_eq!(fx.fake.opens(), 2);
        assert_eq!(
            fx.session.status().status,
            ConnectionStatus::WaitingForPeer
        );

        // Once connected, a failure toasts but does not park
        let _outbound = attach_peer(&fx.fake);
        fx.fake.push(TransportEvent::Data(demo_payload()));
        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::SnapshotLoaded { .. })
        })
        .await;

        log.clear();
        fx.fake.push(TransportEvent::Failed("socket burp".into()));
        wait_for_event(&fx.rx, &mut log, |e| {
            matches!(e, AppEvent::Toast { .. })
        })
        .await;
        assert_eq!(fx.session.status().status, ConnectionStatus::Connected);
    }

    // ========================================
    // Direct ingestion
    // ========================================

    #[tokio::test]
    async fn test_ingest_snapshot_is_one_shot() {
        let fx = session_fixture().await;

        assert!(fx.session.ingest_snapshot(Snapshot::demo()).await.unwrap());
        assert_eq!(fx.session.status().status, ConnectionStatus::Connected);
        assert_eq!(fx.store.prompt_count(), 3);

        // Second ingestion is refused quietly
        assert!(!fx.session.ingest_snapshot(Snapshot::default()).await.unwrap());
        assert_eq!(fx.store.prompt_count(), 3);
    }

    #[tokio::test]
    async fn test_begin_pairing_surfaces_open_failure() {
        struct BrokenTransport;

        impl Transport for BrokenTransport {
            fn scheme(&self) -> &'static str {
                "broken"
            }
            fn open(&self, _: mpsc::UnboundedSender<TransportEvent>) -> Result<String> {
                Err(CompanionError::Transport("no port".into()))
            }
            fn close(&self) {}
        }

        let dir = tempdir().unwrap();
        let db = Db::open(dir.path().join("broken.db").to_str().unwrap())
            .await
            .unwrap();
        let events = EventBus::new();
        let (_, rx) = events.subscribe();
        let store = Arc::new(ReplicaStore::new(db, events.clone()));
        let catalog = Arc::new(RwLock::new(Catalog::builtin("en").unwrap()));
        let session = SessionManager::new(
            Box::new(BrokenTransport),
            store,
            events,
            catalog,
            Duration::ZERO,
        );

        let err = session.begin_pairing().unwrap_err();
        assert_eq!(err.category(), "transport");
        assert_eq!(session.status().status, ConnectionStatus::Error);

        let mut log = Vec::new();
        wait_for_event(&rx, &mut log, |e| {
            matches!(e, AppEvent::Toast { level: ToastLevel::Error, .. })
        })
        .await;
    }
}
