//! Push-channel connection manager
//!
//! Owns one socket, its lifecycle state machine and the reconnect timer.
//! Every connect gets a generation number; a socket task only touches shared
//! state while its generation is the current one, so a socket replaced by
//! `disconnect()` + `connect()` can never overwrite the newer state.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backoff::ReconnectPolicy;
use super::dispatcher::MessageDispatcher;
use super::transport::Transport;
use crate::error::{Result, SyncError};

/// Outbound frames buffered per socket
const OUTBOUND_BUFFER: usize = 64;

/// Push-channel lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Error => "error",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SocketPhase {
    Connecting,
    Connected,
}

struct LiveSocket {
    generation: u64,
    phase: SocketPhase,
    close_tx: watch::Sender<bool>,
    outbound: mpsc::Sender<String>,
}

#[derive(Default)]
struct Inner {
    url: Option<String>,
    generation: u64,
    live: Option<LiveSocket>,
    reconnect_timer: Option<JoinHandle<()>>,
    attempts: u32,
    intentionally_closed: bool,
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.live
            .as_ref()
            .is_some_and(|live| live.generation == generation)
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    dispatcher: Arc<MessageDispatcher>,
    policy: ReconnectPolicy,
    state: watch::Sender<ConnectionState>,
    inner: Mutex<Inner>,
}

/// Reconnecting push-channel client.
///
/// Cloning yields another handle to the same connection. `connect` and the
/// reconnect timer spawn tasks, so they must run inside a tokio runtime.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        dispatcher: Arc<MessageDispatcher>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                transport,
                dispatcher,
                policy,
                state,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Dispatcher receiving this connection's frames
    pub fn dispatcher(&self) -> &Arc<MessageDispatcher> {
        &self.shared.dispatcher
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receive every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Reconnects attempted since the last successful open
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.inner.lock().attempts
    }

    pub fn has_pending_reconnect(&self) -> bool {
        self.shared.inner.lock().reconnect_timer.is_some()
    }

    /// Open the channel. No-op while a socket is connecting or connected.
    pub fn connect(&self, url: &str) {
        let mut inner = self.shared.inner.lock();
        if let Some(live) = &inner.live {
            debug!(phase = ?live.phase, "Push channel already connected or connecting");
            return;
        }

        // Connecting during a backoff wait takes the place of the pending
        // retry; outside a retry chain the budget starts fresh
        match inner.reconnect_timer.take() {
            Some(timer) => {
                timer.abort();
                inner.attempts += 1;
                debug!("Pending reconnect replaced by explicit connect");
            }
            None => inner.attempts = 0,
        }
        self.shared.open_socket(&mut inner, url.to_string());
    }

    /// Close the channel and cancel any pending reconnect
    pub fn disconnect(&self) {
        let mut inner = self.shared.inner.lock();
        inner.intentionally_closed = true;
        inner.attempts = 0;

        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
            debug!("Pending reconnect cancelled");
        }
        if let Some(live) = inner.live.take() {
            let _ = live.close_tx.send(true);
        }

        self.shared.set_state(ConnectionState::Disconnected);
        info!("Push channel disconnected");
    }

    /// Queue a text frame on the connected socket
    pub fn send(&self, text: String) -> Result<()> {
        let inner = self.shared.inner.lock();
        match &inner.live {
            Some(live) if live.phase == SocketPhase::Connected => live
                .outbound
                .try_send(text)
                .map_err(|e| SyncError::Transport(format!("outbound queue: {}", e))),
            _ => {
                warn!("Cannot send message: push channel not connected");
                Err(SyncError::NotConnected)
            }
        }
    }
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Connection state changed");
        }
    }

    fn open_socket(self: &Arc<Self>, inner: &mut Inner, url: String) {
        inner.intentionally_closed = false;
        inner.generation += 1;
        inner.url = Some(url.clone());

        let generation = inner.generation;
        let (close_tx, close_rx) = watch::channel(false);
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        inner.live = Some(LiveSocket {
            generation,
            phase: SocketPhase::Connecting,
            close_tx,
            outbound,
        });

        self.set_state(ConnectionState::Connecting);
        info!(%url, attempt = inner.attempts, "Connecting push channel");

        tokio::spawn(Arc::clone(self).run_socket(url, generation, close_rx, outbound_rx));
    }

    async fn run_socket(
        self: Arc<Self>,
        url: String,
        generation: u64,
        mut close_rx: watch::Receiver<bool>,
        mut outbound_rx: mpsc::Receiver<String>,
    ) {
        let opened = tokio::select! {
            biased;
            _ = close_rx.changed() => {
                debug!(generation, "Connect abandoned by disconnect");
                return;
            }
            result = self.transport.open(&url) => result,
        };

        let mut socket = match opened {
            Ok(socket) => socket,
            Err(e) => {
                warn!(%url, "Push channel connect failed: {}", e);
                self.on_transport_error(generation);
                self.on_closed(generation);
                return;
            }
        };

        if !self.on_open(generation) {
            socket.close().await;
            return;
        }

        loop {
            tokio::select! {
                biased;
                _ = close_rx.changed() => {
                    socket.close().await;
                    debug!(generation, "Push channel closed by client");
                    return;
                }
                Some(text) = outbound_rx.recv() => {
                    if let Err(e) = socket.send_text(text).await {
                        warn!("Push channel send failed: {}", e);
                        self.on_transport_error(generation);
                        break;
                    }
                }
                frame = socket.next_frame() => match frame {
                    Some(Ok(text)) => {
                        self.dispatcher.dispatch_raw(&text);
                    }
                    Some(Err(e)) => {
                        warn!("Push channel transport error: {}", e);
                        self.on_transport_error(generation);
                        break;
                    }
                    None => {
                        info!("Push channel closed by server");
                        break;
                    }
                },
            }
        }

        self.on_closed(generation);
    }

    fn on_open(&self, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        match inner.live.as_mut() {
            Some(live) if live.generation == generation => live.phase = SocketPhase::Connected,
            _ => return false,
        }

        inner.attempts = 0;
        self.set_state(ConnectionState::Connected);
        info!("Push channel connected");
        true
    }

    fn on_transport_error(&self, generation: u64) {
        let inner = self.inner.lock();
        if inner.is_current(generation) {
            self.set_state(ConnectionState::Error);
        }
    }

    fn on_closed(self: &Arc<Self>, generation: u64) {
        let mut inner = self.inner.lock();
        if !inner.is_current(generation) {
            return;
        }

        inner.live = None;
        self.set_state(ConnectionState::Disconnected);

        if !inner.intentionally_closed {
            self.schedule_reconnect(&mut inner);
        }
    }

    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner) {
        if !self.policy.allows(inner.attempts) {
            error!(
                attempts = inner.attempts,
                "Push channel reconnect attempts exhausted, giving up"
            );
            self.set_state(ConnectionState::Error);
            return;
        }

        let Some(url) = inner.url.clone() else {
            return;
        };

        if let Some(timer) = inner.reconnect_timer.take() {
            timer.abort();
        }

        let delay = self.policy.delay_for(inner.attempts);
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = inner.attempts + 1,
            max_attempts = self.policy.max_attempts,
            "Scheduling push channel reconnect"
        );

        let shared = Arc::clone(self);
        inner.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let mut inner = shared.inner.lock();
            inner.reconnect_timer = None;
            if inner.intentionally_closed || inner.live.is_some() {
                return;
            }
            inner.attempts += 1;
            shared.open_socket(&mut inner, url);
        }));
    }
}
