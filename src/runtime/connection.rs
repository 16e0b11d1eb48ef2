//! Connection handle and session liveness.
//!
//! A `Connection` is one duplex byte stream bound to a peer. It is split
//! into independent read and write halves so the receive and send paths of
//! a session can each hold one half while running concurrently. The handle
//! tracks whether it is still active and why it was closed.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The peer performed an orderly close (zero-length read).
    PeerClosed,
    /// The local operator typed `exit` or closed their input.
    LocalClosed,
    /// A read or write on the connection failed.
    Errored(io::ErrorKind),
    /// The process-wide shutdown signal tripped.
    Shutdown,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::PeerClosed => write!(f, "peer disconnected"),
            Termination::LocalClosed => write!(f, "closed locally"),
            Termination::Errored(kind) => write!(f, "connection error: {kind}"),
            Termination::Shutdown => write!(f, "shutdown requested"),
        }
    }
}

/// Current state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    /// Open and usable in both directions.
    Active,
    /// Closed; never reopened.
    Closed(Termination),
}

/// A single chat connection.
#[derive(Debug)]
pub struct Connection<S = TcpStream> {
    reader: ReadHalf<S>,
    writer: WriteHalf<S>,
    peer: SocketAddr,
    state: ConnState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wrap an already-open stream.
    pub fn new(stream: S, peer: SocketAddr) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer,
            peer,
            state: ConnState::Active,
        }
    }

    /// Address of the remote end.
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state(), ConnState::Active)
    }

    /// Borrow both halves at once so they can be driven concurrently.
    pub(crate) fn halves(&mut self) -> (&mut ReadHalf<S>, &mut WriteHalf<S>) {
        (&mut self.reader, &mut self.writer)
    }

    /// Close the connection, recording `reason`.
    ///
    /// Only the first call does anything; it returns `true`. Later calls
    /// return `false` and leave the recorded reason untouched.
    pub async fn close(&mut self, reason: Termination) -> bool {
        if let ConnState::Closed(previous) = self.state {
            trace!(peer = %self.peer, %previous, "Connection already closed");
            return false;
        }
        self.state = ConnState::Closed(reason);

        // The peer may already be gone, in which case the FIN has nowhere to go.
        if let Err(e) = self.writer.shutdown().await {
            debug!(peer = %self.peer, error = %e, "Write shutdown failed");
        }
        debug!(peer = %self.peer, %reason, "Connection closed");
        true
    }
}
