//! User-visible chat events and the console that prints them.
//!
//! Loops never print directly. They emit `ChatEvent`s into an `EventSink`,
//! and a single console task renders them on stdout, which keeps display
//! output ordered and lets tests observe exactly what the operator sees.

use crate::runtime::connection::Termination;
use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

/// Something the operator should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// The server bound its listening socket.
    Listening { addr: SocketAddr },
    /// The server accepted a client.
    Accepted { peer: SocketAddr },
    /// The client reached its server.
    Connected { peer: SocketAddr },
    /// One chunk arrived from the peer.
    Received { peer: SocketAddr, data: Bytes },
    /// A session ended.
    Closed { peer: SocketAddr, reason: Termination },
    /// The server stopped accepting and released its socket.
    Stopped,
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatEvent::Listening { addr } => {
                write!(f, "server listening on port {}, waiting for a client", addr.port())
            }
            ChatEvent::Accepted { peer } => write!(f, "client [{}] connected", peer.ip()),
            ChatEvent::Connected { peer } => write!(f, "connected to server [{peer}]"),
            ChatEvent::Received { peer, data } => write!(
                f,
                "recv from [{}], data is = {}",
                peer.ip(),
                String::from_utf8_lossy(data)
            ),
            ChatEvent::Closed { peer, reason } => match reason {
                Termination::PeerClosed => write!(f, "peer [{}] disconnected", peer.ip()),
                Termination::LocalClosed => {
                    write!(f, "closed connection with [{}]", peer.ip())
                }
                Termination::Errored(kind) => {
                    write!(f, "connection with [{}] failed: {kind}", peer.ip())
                }
                Termination::Shutdown => {
                    write!(f, "connection with [{}] closed for shutdown", peer.ip())
                }
            },
            ChatEvent::Stopped => write!(f, "server stopped"),
        }
    }
}

/// Sending side of the display channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Queue an event for display. Dropped silently if nobody is listening.
    pub fn emit(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            trace!("Display receiver gone, event dropped");
        }
    }
}

/// Spawn the console task printing events to stdout.
///
/// The task ends once every `EventSink` clone has been dropped, after
/// writing everything queued before that.
pub fn spawn_console(rx: mpsc::UnboundedReceiver<ChatEvent>) -> JoinHandle<()> {
    tokio::spawn(print_events(rx, tokio::io::stdout()))
}

async fn print_events<W>(mut rx: mpsc::UnboundedReceiver<ChatEvent>, mut out: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = rx.recv().await {
        let mut line = event.to_string();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        let written = async {
            out.write_all(line.as_bytes()).await?;
            out.flush().await
        };
        if let Err(e) = written.await {
            warn!(error = %e, "Failed to write to console");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn client() -> SocketAddr {
        "192.168.1.20:40312".parse().unwrap()
    }

    #[test]
    fn test_received_display() {
        let event = ChatEvent::Received {
            peer: client(),
            data: Bytes::from_static(b"hello\n"),
        };
        assert_eq!(
            event.to_string(),
            "recv from [192.168.1.20], data is = hello\n"
        );
    }

    #[test]
    fn test_closed_display_distinguishes_reasons() {
        let closed = |reason| ChatEvent::Closed {
            peer: client(),
            reason,
        }
        .to_string();

        assert_eq!(
            closed(Termination::PeerClosed),
            "peer [192.168.1.20] disconnected"
        );
        assert_eq!(
            closed(Termination::LocalClosed),
            "closed connection with [192.168.1.20]"
        );
        assert_eq!(
            closed(Termination::Shutdown),
            "connection with [192.168.1.20] closed for shutdown"
        );
        assert!(closed(Termination::Errored(io::ErrorKind::ConnectionReset))
            .starts_with("connection with [192.168.1.20] failed: "));
    }

    #[test]
    fn test_invalid_utf8_is_displayed_lossily() {
        let event = ChatEvent::Received {
            peer: client(),
            data: Bytes::from_static(b"caf\xff\n"),
        };
        assert_eq!(
            event.to_string(),
            "recv from [192.168.1.20], data is = caf\u{fffd}\n"
        );
    }

    #[tokio::test]
    async fn test_console_terminates_each_event_once() {
        let (sink, rx) = EventSink::channel();
        sink.emit(ChatEvent::Received {
            peer: client(),
            data: Bytes::from_static(b"hi"),
        });
        sink.emit(ChatEvent::Received {
            peer: client(),
            data: Bytes::from_static(b"hello\n"),
        });
        sink.emit(ChatEvent::Stopped);
        drop(sink);

        let mut out = Vec::new();
        print_events(rx, &mut out).await;

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "recv from [192.168.1.20], data is = hi\n\
             recv from [192.168.1.20], data is = hello\n\
             server stopped\n"
        );
    }

    #[test]
    fn test_emit_without_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.emit(ChatEvent::Stopped);
    }
}
