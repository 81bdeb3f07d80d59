//! Telnet event loop: listener, client table, and readiness multiplexing.
//!
//! One task owns everything socket related.  It runs this state machine:
//!
//! ```text
//!            ┌──────────────────────┐   network ready    ┌──────────┐
//!  start ──► │  WaitingForNetwork   │ ─────────────────► │   bind   │
//!            └──────────────────────┘ ◄── bind failed ── └────┬─────┘
//!                      ▲                (rebind_delay)        │ ok
//!                      │                                      ▼
//!                      │  listener error / network lost  ┌──────────┐
//!                      └──────── teardown ◄───────────── │ Serving  │
//!                                                        └────┬─────┘
//!                                       shutdown: teardown ◄──┘
//! ```
//!
//! While serving, a single `tokio::select!` waits (for at most
//! `poll_timeout`) on:
//!
//! - the listener (a new connection),
//! - every connected client socket becoming readable,
//! - a broadcast request from the fan-out task.
//!
//! # Why one task? (for beginners)
//!
//! The client table lives inside [`TelnetServer`] and nothing else can reach
//! it.  Serial output arrives as messages on an `mpsc` channel instead of
//! through a shared `Mutex<Vec<TcpStream>>`, so there is no lock to hold
//! across a socket write and no way for two tasks to disagree about which
//! slots are in use.
//!
//! All client I/O is non-blocking (`try_read` / `try_write`): a client that
//! stops reading has output dropped, it never stalls the loop.

use std::io;
use std::net::{Shutdown, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use serial_bridge_core::{ClientTable, TelnetDecoder, GREETING};

use crate::application::forward_input::forward_client_input;
use crate::application::ports::{NetworkReadiness, SerialTransport};
use crate::domain::BridgeConfig;

/// Pending broadcast buffers the fan-out may queue ahead of the event loop.
pub const BROADCAST_QUEUE_DEPTH: usize = 32;

/// Creates the channel the fan-out task uses to reach the event loop.
pub fn broadcast_channel() -> (mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
    mpsc::channel(BROADCAST_QUEUE_DEPTH)
}

// ── Client connection ─────────────────────────────────────────────────────────

/// One occupied slot of the client table.
#[derive(Debug)]
struct ClientConnection {
    stream: TcpStream,
    peer: SocketAddr,
    /// Per-client decoder state; a command split across reads resumes here.
    decoder: TelnetDecoder,
}

impl ClientConnection {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream,
            peer,
            decoder: TelnetDecoder::new(),
        }
    }

    /// Best-effort write.  Whatever the socket cannot take right now is
    /// dropped; only a hard socket error is returned.
    fn offer(&self, payload: &[u8]) -> io::Result<()> {
        match self.stream.try_write(payload) {
            Ok(n) if n < payload.len() => {
                debug!(peer = %self.peer, "socket took {n} of {} bytes", payload.len());
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                debug!(peer = %self.peer, "socket busy; dropped {} bytes", payload.len());
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

// ── Event loop ────────────────────────────────────────────────────────────────

/// What woke the serving loop.
enum Wake {
    Accepted(io::Result<(TcpStream, SocketAddr)>),
    Readable(usize),
    SocketError(usize, io::Error),
    Broadcast(Option<Vec<u8>>),
    Timeout,
}

/// Why a serving session ended.
#[derive(Debug)]
enum SessionEnd {
    Shutdown,
    NetworkLost,
    ListenerFailed(io::Error),
}

/// The Telnet side of the bridge.
///
/// Construct it once in `main` and hand it to [`TelnetServer::run`].
pub struct TelnetServer {
    config: Arc<BridgeConfig>,
    serial: Arc<dyn SerialTransport>,
    network: Arc<dyn NetworkReadiness>,
    broadcasts: mpsc::Receiver<Vec<u8>>,
    /// Cleared once the fan-out drops its sender, so a closed channel is
    /// not polled in a tight loop.
    fan_out_alive: bool,
    local_addr: watch::Sender<Option<SocketAddr>>,
    clients: ClientTable<ClientConnection>,
    read_buf: Vec<u8>,
}

impl TelnetServer {
    pub fn new(
        config: BridgeConfig,
        serial: Arc<dyn SerialTransport>,
        network: Arc<dyn NetworkReadiness>,
        broadcasts: mpsc::Receiver<Vec<u8>>,
    ) -> Self {
        let (local_addr, _) = watch::channel(None);
        Self {
            clients: ClientTable::with_capacity(config.max_clients),
            read_buf: vec![0; config.read_buffer_size.max(1)],
            config: Arc::new(config),
            serial,
            network,
            broadcasts,
            fan_out_alive: true,
            local_addr,
        }
    }

    /// Watches the address the listener is bound to (`None` while not
    /// serving).  Useful when the configured port is `0`.
    pub fn local_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.local_addr.subscribe()
    }

    /// Runs network sessions until `running` is cleared.
    ///
    /// Every session waits for the network, binds a fresh listener, and serves
    /// clients until the listener fails, the network is lost, or shutdown is
    /// requested.  All client connections are closed at the end of a session.
    pub async fn run(mut self, running: Arc<AtomicBool>) {
        while running.load(Ordering::Relaxed) {
            if !self.wait_for_network(&running).await {
                break;
            }

            let listener = match self.bind_listener() {
                Ok(listener) => listener,
                Err(e) => {
                    error!(
                        "failed to listen on {}: {e}; retrying in {:?}",
                        self.config.listen_addr, self.config.rebind_delay
                    );
                    sleep(self.config.rebind_delay).await;
                    continue;
                }
            };

            let bound = listener.local_addr().ok();
            self.local_addr.send_replace(bound);
            info!(
                "Telnet server listening on {}",
                bound.unwrap_or(self.config.listen_addr)
            );

            let end = self.serve(&listener, &running).await;
            drop(listener);
            if !self.end_session(end) {
                break;
            }
        }
        info!("Telnet server stopped");
    }

    /// Blocks until the network is ready.  Returns `false` if shutdown was
    /// requested first.
    async fn wait_for_network(&mut self, running: &AtomicBool) -> bool {
        if self.network.is_ready() {
            return true;
        }
        info!("waiting for network");

        let mut ready = self.network.wait_ready();
        loop {
            if !running.load(Ordering::Relaxed) {
                return false;
            }
            let fan_out_alive = self.fan_out_alive;
            tokio::select! {
                () = &mut ready => {
                    info!("network ready");
                    return true;
                }
                payload = self.broadcasts.recv(), if fan_out_alive => match payload {
                    Some(payload) => trace!("no listener; dropped {} bytes", payload.len()),
                    None => self.fan_out_alive = false,
                },
                () = sleep(self.config.poll_timeout) => {}
            }
        }
    }

    fn bind_listener(&self) -> io::Result<TcpListener> {
        let addr = self.config.listen_addr;
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.set_keepalive(true)?;
        socket.bind(addr)?;
        let backlog = u32::try_from(self.config.max_clients)
            .unwrap_or(u32::MAX)
            .max(1);
        socket.listen(backlog)
    }

    async fn serve(&mut self, listener: &TcpListener, running: &AtomicBool) -> SessionEnd {
        loop {
            if !running.load(Ordering::Relaxed) {
                return SessionEnd::Shutdown;
            }
            if !self.network.is_ready() {
                return SessionEnd::NetworkLost;
            }

            let fan_out_alive = self.fan_out_alive;
            let wake = {
                let mut readable: FuturesUnordered<_> = self
                    .clients
                    .iter()
                    .map(|(index, client)| async move { (index, client.stream.readable().await) })
                    .collect();

                tokio::select! {
                    accepted = listener.accept() => Wake::Accepted(accepted),
                    Some((index, ready)) = readable.next(), if !readable.is_empty() => match ready {
                        Ok(()) => Wake::Readable(index),
                        Err(e) => Wake::SocketError(index, e),
                    },
                    payload = self.broadcasts.recv(), if fan_out_alive => Wake::Broadcast(payload),
                    () = sleep(self.config.poll_timeout) => Wake::Timeout,
                }
            };

            match wake {
                Wake::Accepted(Ok((stream, peer))) => self.admit(stream, peer),
                Wake::Accepted(Err(e)) if is_transient_accept_error(&e) => {
                    warn!("accept failed: {e}");
                }
                Wake::Accepted(Err(e)) => return SessionEnd::ListenerFailed(e),
                Wake::Readable(index) => self.service_client(index).await,
                Wake::SocketError(index, e) => {
                    if let Some(client) = self.clients.get(index) {
                        warn!(peer = %client.peer, "socket error: {e}");
                    }
                    self.release_client(index);
                }
                Wake::Broadcast(Some(payload)) => self.broadcast(&payload),
                Wake::Broadcast(None) => {
                    debug!("fan-out stopped; no more serial output");
                    self.fan_out_alive = false;
                }
                Wake::Timeout => trace!("poll timeout; {} clients", self.clients.len()),
            }
        }
    }

    fn admit(&mut self, stream: TcpStream, peer: SocketAddr) {
        let index = match self.clients.insert(ClientConnection::new(stream, peer)) {
            Ok(index) => index,
            Err(rejected) => {
                warn!(
                    %peer,
                    "all {} client slots in use; closing connection",
                    self.clients.capacity()
                );
                reject(rejected.stream, peer);
                return;
            }
        };
        info!(
            %peer,
            "client connected in slot {index} ({}/{})",
            self.clients.len(),
            self.clients.capacity()
        );

        let greeted = self.clients.get(index).map(|client| client.offer(&GREETING));
        if let Some(Err(e)) = greeted {
            warn!(%peer, "greeting failed: {e}");
            self.release_client(index);
        }
    }

    async fn service_client(&mut self, index: usize) {
        let Some(client) = self.clients.get_mut(index) else {
            return;
        };

        match client.stream.try_read(&mut self.read_buf) {
            Ok(0) => {
                info!(peer = %client.peer, "client disconnected");
                self.release_client(index);
            }
            Ok(n) => {
                trace!(peer = %client.peer, "{n} bytes from client");
                forward_client_input(
                    &mut client.decoder,
                    client.peer,
                    &self.read_buf[..n],
                    self.serial.as_ref(),
                    self.config.break_duration,
                )
                .await;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => {
                warn!(peer = %client.peer, "read failed: {e}");
                self.release_client(index);
            }
        }
    }

    /// Offers `payload` to every client; clients whose socket failed are
    /// released.
    fn broadcast(&mut self, payload: &[u8]) {
        let mut failed = Vec::new();
        self.clients.for_each(|index, client| {
            if let Err(e) = client.offer(payload) {
                warn!(peer = %client.peer, "write failed: {e}");
                failed.push(index);
            }
        });
        for index in failed {
            self.release_client(index);
        }
    }

    fn release_client(&mut self, index: usize) {
        if let Some(client) = self.clients.release(index) {
            info!(peer = %client.peer, "slot {index} released");
        }
    }

    /// Closes every client after the listener is gone.  Returns `true` if a
    /// new session should follow.
    fn end_session(&mut self, end: SessionEnd) -> bool {
        self.teardown();
        self.local_addr.send_replace(None);
        match end {
            SessionEnd::Shutdown => false,
            SessionEnd::NetworkLost => {
                warn!("network lost; listener closed");
                true
            }
            SessionEnd::ListenerFailed(e) => {
                error!("listener failed: {e}; listener closed");
                true
            }
        }
    }

    fn teardown(&mut self) {
        let closed = self.clients.release_all();
        if !closed.is_empty() {
            info!("closed {} client connections", closed.len());
        }
    }
}

/// Shuts down a connection that found no free slot, then drops it.
fn reject(stream: TcpStream, peer: SocketAddr) {
    match stream.into_std() {
        Ok(stream) => {
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                debug!(%peer, "shutdown of rejected connection failed: {e}");
            }
        }
        Err(e) => debug!(%peer, "could not detach rejected connection: {e}"),
    }
}

/// Accept errors that concern one half-open connection, not the listener.
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────
