//! Duplex chat session over one connection.
//!
//! A session runs two paths against the same connection:
//!
//! - **receive**: one read at a time from the peer, each chunk surfaced as a
//!   `ChatEvent::Received`;
//! - **send**: one operator line at a time, written to the peer.
//!
//! Both paths are futures owned by the session and driven concurrently in a
//! single `select!` together with the shutdown signal. Each holds its own
//! half of the connection and its own buffer, so neither direction waits on
//! the other. The first path to reach a terminal condition decides the
//! session's `Termination`; the others are dropped on the spot, and the
//! connection is closed exactly once before `run` returns. Nothing the
//! session started outlives it.

use crate::runtime::buffer::ChunkBuffer;
use crate::runtime::connection::{Connection, Termination};
use crate::runtime::event::{ChatEvent, EventSink};
use crate::runtime::input::InputSource;
use crate::runtime::protocol::{classify, LocalLine};
use crate::shutdown::ShutdownSignal;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// One chat exchange with one peer.
pub struct DuplexSession<S = TcpStream> {
    conn: Connection<S>,
    recv_buf: ChunkBuffer,
    send_chunk: usize,
    shutdown: ShutdownSignal,
    events: EventSink,
}

impl<S> DuplexSession<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Create a session over an active connection.
    ///
    /// `buffer_size` bounds both directions: reads return at most that many
    /// bytes, and longer operator lines go out in pieces of that size.
    pub fn new(
        conn: Connection<S>,
        buffer_size: usize,
        shutdown: ShutdownSignal,
        events: EventSink,
    ) -> Self {
        let recv_buf = ChunkBuffer::new(buffer_size);
        let send_chunk = recv_buf.capacity();
        Self {
            conn,
            recv_buf,
            send_chunk,
            shutdown,
            events,
        }
    }

    /// Exchange data until either side closes, an I/O error occurs, or the
    /// shutdown signal trips. Consumes the session; the connection is
    /// closed and released when this returns.
    pub async fn run(mut self, input: &mut InputSource) -> Termination {
        let peer = self.conn.peer();
        debug_assert!(self.conn.is_active(), "session started on a closed connection");
        debug!(peer = %peer, "Session started");

        let reason = if self.shutdown.is_triggered() {
            Termination::Shutdown
        } else {
            let (reader, writer) = self.conn.halves();
            tokio::select! {
                reason = receive_loop(reader, &mut self.recv_buf, peer, &self.events) => reason,
                reason = send_loop(writer, input, self.send_chunk, peer) => reason,
                _ = self.shutdown.triggered() => Termination::Shutdown,
            }
        };

        self.conn.close(reason).await;
        self.events.emit(ChatEvent::Closed { peer, reason });
        info!(peer = %peer, %reason, "Session ended");
        reason
    }
}

/// Receive path: surface every chunk until the peer closes or a read fails.
async fn receive_loop<R>(
    reader: &mut R,
    buffer: &mut ChunkBuffer,
    peer: SocketAddr,
    events: &EventSink,
) -> Termination
where
    R: AsyncRead + Unpin,
{
    loop {
        match buffer.fill_from(reader).await {
            Ok(0) => {
                debug!(peer = %peer, "Peer closed the connection");
                return Termination::PeerClosed;
            }
            Ok(_) => {
                trace!(peer = %peer, bytes = buffer.len(), "Received chunk");
                events.emit(ChatEvent::Received {
                    peer,
                    data: buffer.to_bytes(),
                });
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "Read failed");
                return Termination::Errored(e.kind());
            }
        }
    }
}

/// Send path: transmit operator lines until `exit`, end of input, or a failed write.
async fn send_loop<W>(
    writer: &mut W,
    input: &mut InputSource,
    chunk_size: usize,
    peer: SocketAddr,
) -> Termination
where
    W: AsyncWrite + Unpin,
{
    loop {
        let Some(line) = input.next_line().await else {
            debug!(peer = %peer, "Local input ended");
            return Termination::LocalClosed;
        };

        let kind = classify(&line);
        if kind == LocalLine::Blank {
            continue;
        }

        // The exit token is forwarded like any other text before closing.
        if let Err(e) = transmit(writer, line.as_bytes(), chunk_size).await {
            warn!(peer = %peer, error = %e, "Write failed");
            return Termination::Errored(e.kind());
        }
        trace!(peer = %peer, bytes = line.len(), "Sent line");

        if kind == LocalLine::Exit {
            debug!(peer = %peer, "Exit requested by operator");
            return Termination::LocalClosed;
        }
    }
}

/// Write `data` in pieces no larger than the peer's expected read size.
async fn transmit<W>(writer: &mut W, data: &[u8], chunk_size: usize) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for chunk in data.chunks(chunk_size) {
        writer.write_all(chunk).await?;
    }
    writer.flush().await
}
