//! Line-oriented operator input.
//!
//! Terminal reads cannot be cancelled once started, so they run on a
//! dedicated OS thread that forwards each line through a bounded channel.
//! Receiving from the channel is cancel-safe, which lets any loop put
//! `next_line` in a multiplexed wait next to socket readiness and the
//! shutdown signal without losing typed text.

use std::io::BufRead;
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

/// Lines buffered between the reader thread and the consuming loop.
const INPUT_QUEUE_DEPTH: usize = 16;

/// Source of operator lines. Each line keeps its trailing newline.
#[derive(Debug)]
pub struct InputSource {
    lines: mpsc::Receiver<String>,
}

impl InputSource {
    /// Read lines from the process's standard input.
    pub fn stdin() -> Self {
        let (tx, source) = Self::channel(INPUT_QUEUE_DEPTH);

        let spawned = thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || forward_lines(std::io::stdin().lock(), tx));

        // If the thread never started, the sender is gone and the source
        // simply reports end of input.
        if let Err(e) = spawned {
            error!(error = %e, "Failed to start input reader");
        }

        source
    }

    /// Build a source fed by the returned sender.
    pub fn channel(depth: usize) -> (mpsc::Sender<String>, Self) {
        let (tx, rx) = mpsc::channel(depth);
        (tx, Self { lines: rx })
    }

    /// Wait for the next line. `None` once input has ended.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }
}

/// Blocking loop: read lines until end of input or until the receiver is gone.
fn forward_lines<R: BufRead>(mut reader: R, tx: mpsc::Sender<String>) {
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("Local input reached end of stream");
                break;
            }
            Ok(_) => {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to read local input");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_forward_lines_keeps_newlines() {
        let (tx, mut rx) = mpsc::channel(8);
        forward_lines(Cursor::new("hello\nexit\nno newline"), tx);

        assert_eq!(rx.try_recv().unwrap(), "hello\n");
        assert_eq!(rx.try_recv().unwrap(), "exit\n");
        assert_eq!(rx.try_recv().unwrap(), "no newline");
        // Sender dropped at end of input
        assert_eq!(
            rx.try_recv().unwrap_err(),
            mpsc::error::TryRecvError::Disconnected
        );
    }

    #[test]
    fn test_forward_lines_stops_when_receiver_gone() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        // Must return rather than block
        forward_lines(Cursor::new("one\ntwo\n"), tx);
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (tx, mut input) = InputSource::channel(4);
        tx.send("hi\n".to_string()).await.unwrap();
        drop(tx);

        assert_eq!(input.next_line().await.as_deref(), Some("hi\n"));
        assert_eq!(input.next_line().await, None);
    }
}
