//! Serial connection acceptor.
//!
//! The server waits on three sources at once: the listening socket, the
//! operator's input, and the shutdown signal. Whichever becomes ready first
//! is turned into a `Wakeup` and dispatched from one place.
//!
//! Sessions run inline: once a client is accepted, the acceptor drives that
//! session to completion before it waits again. A second client that
//! connects meanwhile sits in the listen backlog until the first session
//! ends. While a session is active, operator input belongs to it, so an
//! `exit` typed then closes the session rather than the server.

use crate::runtime::connection::Connection;
use crate::runtime::event::{ChatEvent, EventSink};
use crate::runtime::input::InputSource;
use crate::runtime::protocol::is_exit_token;
use crate::runtime::session::DuplexSession;
use crate::shutdown::ShutdownSignal;
use socket2::{Domain, Protocol, Socket, Type};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

/// Source of inbound chat connections.
pub trait Listener {
    type Stream: AsyncRead + AsyncWrite;

    fn local_addr(&self) -> io::Result<SocketAddr>;

    /// Wait for the next inbound connection.
    fn accept(&mut self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;

    /// Per-connection setup run before a session starts. An error rejects
    /// that client only.
    fn configure(&self, stream: &Self::Stream) -> io::Result<()>;
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn local_addr(&self) -> io::Result<SocketAddr> {
        TcpListener::local_addr(self)
    }

    async fn accept(&mut self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }

    fn configure(&self, stream: &TcpStream) -> io::Result<()> {
        stream.set_nodelay(true)
    }
}

/// What woke the acceptor.
enum Wakeup<S> {
    Shutdown,
    Command(Option<String>),
    Incoming(io::Result<(S, SocketAddr)>),
}

/// Accepts clients one at a time and runs a chat session with each.
pub struct ConnectionAcceptor<L = TcpListener> {
    listener: L,
    buffer_size: usize,
    shutdown: ShutdownSignal,
    events: EventSink,
}

impl<L: Listener> ConnectionAcceptor<L> {
    pub fn new(listener: L, buffer_size: usize, shutdown: ShutdownSignal, events: EventSink) -> Self {
        Self {
            listener,
            buffer_size,
            shutdown,
            events,
        }
    }

    /// Serve until the shutdown signal trips or the operator stops the server.
    ///
    /// While no session is active, the operator stops the server by typing
    /// `exit` or by closing their input. Closed input counts as `exit`, so a
    /// server started with its input at end of file (`< /dev/null`) stops
    /// right away. The listening socket is released when this returns.
    pub async fn serve(mut self, input: &mut InputSource) {
        match self.listener.local_addr() {
            Ok(addr) => {
                info!(addr = %addr, "Waiting for clients");
                self.events.emit(ChatEvent::Listening { addr });
            }
            Err(e) => warn!(error = %e, "Listener has no local address"),
        }

        loop {
            let wakeup = tokio::select! {
                biased;
                _ = self.shutdown.triggered() => Wakeup::Shutdown,
                line = input.next_line() => Wakeup::Command(line),
                incoming = self.listener.accept() => Wakeup::Incoming(incoming),
            };

            match wakeup {
                Wakeup::Shutdown => {
                    info!("Shutdown requested, no longer accepting");
                    break;
                }
                Wakeup::Command(None) => {
                    info!("Local input ended, no longer accepting");
                    break;
                }
                Wakeup::Command(Some(line)) if is_exit_token(&line) => {
                    info!("Stop command received");
                    break;
                }
                Wakeup::Command(Some(line)) => {
                    warn!(len = line.len(), "No client connected, input discarded");
                }
                Wakeup::Incoming(Ok((stream, peer))) => {
                    self.run_session(stream, peer, input).await;
                }
                Wakeup::Incoming(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {
                    debug!("Accept interrupted");
                }
                Wakeup::Incoming(Err(e)) => {
                    error!(error = %e, "Failed to accept connection");
                }
            }
        }

        drop(self.listener);
        self.events.emit(ChatEvent::Stopped);
        info!("Listener closed");
    }

    async fn run_session(&self, stream: L::Stream, peer: SocketAddr, input: &mut InputSource) {
        if let Err(e) = self.listener.configure(&stream) {
            // Setup failure rejects this client only
            warn!(peer = %peer, error = %e, "Failed to configure connection, dropping it");
            return;
        }

        info!(peer = %peer, "Accepted connection");
        self.events.emit(ChatEvent::Accepted { peer });

        let session = DuplexSession::new(
            Connection::new(stream, peer),
            self.buffer_size,
            self.shutdown.clone(),
            self.events.clone(),
        );
        let reason = session.run(input).await;
        debug!(peer = %peer, %reason, "Ready for the next client");
    }
}

/// Bind a listening socket with the given backlog.
///
/// Must be called from within a Tokio runtime.
pub fn bind_listener(addr: SocketAddr, backlog: i32, reuse_address: bool) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;

    socket.set_reuse_address(reuse_address)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;

    TcpListener::from_std(socket.into())
}
