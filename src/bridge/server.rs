use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use log::{error, info, warn};

use crate::bridge::journal::EventLog;
use crate::bridge::state::SharedState;
use crate::codec::{extract_field, ProcessedAck};
use crate::config::RECV_BUFFER_SIZE;
use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Listening,
    Connected,
    Closed,
}

#[derive(Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Owns the single accept/receive loop and the one peer connection slot.
///
/// The handle is cheap to clone; all clones drive the same bridge. The
/// background loop is the only writer of the shared state, the host calls
/// the query methods at arbitrary times. Outbound writes (acknowledgements
/// and host-originated sends) share one guarded write half so they cannot
/// interleave on the socket.
#[derive(Clone)]
pub struct BridgeServer {
    bind_address: String,
    state: SharedState,
    journal: EventLog,
    lifecycle: Arc<Mutex<Lifecycle>>,
    running: Arc<AtomicBool>,
    local_addr: Arc<Mutex<Option<SocketAddr>>>,
    writer: Arc<tokio::sync::Mutex<Option<OwnedWriteHalf>>>,
    loop_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BridgeServer {
    pub fn new(bind_address: String, state: SharedState, journal: EventLog) -> Self {
        Self {
            bind_address,
            state,
            journal,
            lifecycle: Arc::new(Mutex::new(Lifecycle::Idle)),
            running: Arc::new(AtomicBool::new(false)),
            local_addr: Arc::new(Mutex::new(None)),
            writer: Arc::new(tokio::sync::Mutex::new(None)),
            loop_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Binds the configured endpoint and spawns the accept/receive loop.
    ///
    /// A second call while the bridge is running reports `AlreadyRunning`
    /// without binding again. A bind failure is fatal to this attempt: the
    /// bridge returns to `Idle` and is not retried automatically. Starting
    /// again after a clean `stop()` (or after the peer disconnected) is
    /// permitted.
    pub async fn start(&self) -> Result<StartOutcome, BridgeError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("{}", BridgeError::AlreadyStarted);
            self.journal.record("[bridge] start ignored, already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let listener = match TcpListener::bind(&self.bind_address).await {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_lifecycle(Lifecycle::Idle);
                error!("Bind failed on {}: {} (port might be in use)", self.bind_address, e);
                self.journal.record(&format!("[bridge] bind failed on {}: {}", self.bind_address, e));
                return Err(BridgeError::Bind {
                    address: self.bind_address.clone(),
                    source: e,
                });
            }
        };

        if let Ok(mut addr) = self.local_addr.lock() {
            *addr = listener.local_addr().ok();
        }
        self.set_lifecycle(Lifecycle::Listening);
        info!("Bridge listening on {}", self.bind_address);
        self.journal.record(&format!("[bridge] listening on {}", self.bind_address));

        let server = self.clone();
        let handle = tokio::spawn(async move {
            server.run(listener).await;
        });

        if let Ok(mut task) = self.loop_task.lock() {
            *task = Some(handle);
        }

        Ok(StartOutcome::Started)
    }

    /// Accepts exactly one peer, then receives until stop or disconnect.
    async fn run(&self, listener: TcpListener) {
        let (stream, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("{}", BridgeError::Accept(e));
                self.journal.record("[bridge] accept failed");
                self.teardown().await;
                return;
            }
        };
        // Single-connection design: the listening endpoint is released as
        // soon as the one peer is attached
        drop(listener);

        info!("Peer connected from {}", peer_addr);
        self.journal.record(&format!("[bridge] peer connected from {}", peer_addr));

        let (read_half, write_half) = stream.into_split();
        {
            let mut writer = self.writer.lock().await;
            if !self.running.load(Ordering::SeqCst) {
                // A stop raced the accept; never publish the connection
                drop(writer);
                self.teardown().await;
                return;
            }
            *writer = Some(write_half);
        }
        self.set_lifecycle(Lifecycle::Connected);

        self.receive_loop(read_half).await;
        self.teardown().await;
    }

    async fn receive_loop(&self, mut read_half: OwnedReadHalf) {
        let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

        while self.running.load(Ordering::SeqCst) {
            match read_half.read(&mut buffer).await {
                Ok(0) => {
                    info!("Peer disconnected");
                    self.journal.record("[bridge] peer disconnected");
                    break;
                }
                Ok(n) => {
                    // One chunk is treated as one logical message, exactly
                    // like the wire contract assumes. Messages split or
                    // coalesced across reads will parse wrong; known
                    // limitation of the protocol, not fixed here.
                    let message = String::from_utf8_lossy(&buffer[..n]).to_string();
                    self.process_message(&message).await;
                }
                Err(e) => {
                    error!("Receive failed: {}", e);
                    self.journal.record(&format!("[bridge] receive failed: {}", e));
                    break;
                }
            }
        }
    }

    async fn process_message(&self, message: &str) {
        info!("Received: {}", message);
        self.journal.record(&format!("[bridge] received: {}", message));

        // A missing field is a malformed envelope; it is absorbed as an
        // empty string, never an error
        let action = extract_field(message, "action").unwrap_or_default();
        let symbol = extract_field(message, "symbol").unwrap_or_default();

        self.state.apply(message, &action, &symbol);
        self.journal.record(&format!(
            "[bridge] active symbols: {}",
            self.state.active_symbols_display()
        ));

        let ack = ProcessedAck::new(symbol, action);
        match serde_json::to_string(&ack) {
            Ok(json) => {
                if let Err(e) = self.write_line(&json).await {
                    warn!("Could not acknowledge envelope: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to serialize acknowledgement: {}", e);
            }
        }
    }

    /// Writes `text` plus a newline delimiter to the peer, if one is
    /// attached. Returns `NoActiveConnection` otherwise; nothing is
    /// buffered for later.
    pub async fn send_to_peer(&self, text: &str) -> Result<(), BridgeError> {
        self.write_line(text).await?;
        info!("Sent to peer: {}", text);
        self.journal.record(&format!("[bridge] sent to peer: {}", text));
        Ok(())
    }

    async fn write_line(&self, line: &str) -> Result<(), BridgeError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(BridgeError::NoActiveConnection)?;

        let framed = format!("{}\n", line);
        writer
            .write_all(framed.as_bytes())
            .await
            .map_err(BridgeError::Send)
    }

    /// Stops the bridge: clears the running flag, aborts the loop and
    /// force-closes the peer connection. Idempotent, safe to call in any
    /// state.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let task = self.loop_task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.abort();
            // Abort lands at the task's next yield point; wait it out so
            // the loop cannot publish a connection handle after the
            // cleanup below
            let _ = task.await;
        }

        *self.writer.lock().await = None;
        self.set_lifecycle(Lifecycle::Closed);
        if let Ok(mut addr) = self.local_addr.lock() {
            *addr = None;
        }

        info!("Bridge stopped");
        self.journal.record("[bridge] stopped");
    }

    // Loop-side teardown after a disconnect, receive error or stop; leaves
    // the bridge startable again
    async fn teardown(&self) {
        self.running.store(false, Ordering::SeqCst);
        *self.writer.lock().await = None;
        self.set_lifecycle(Lifecycle::Closed);
        if let Ok(mut addr) = self.local_addr.lock() {
            *addr = None;
        }
        self.journal.record("[bridge] connection closed");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle.lock().map(|l| *l).unwrap_or(Lifecycle::Closed)
    }

    /// Address actually bound, while listening or connected. Differs from
    /// the configured one when binding port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.lock().ok().and_then(|addr| *addr)
    }

    pub fn active_symbols_display(&self) -> String {
        self.state.active_symbols_display()
    }

    pub fn last_envelope(&self) -> String {
        self.state.last_envelope()
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        if let Ok(mut lifecycle) = self.lifecycle.lock() {
            *lifecycle = next;
        }
    }
}
