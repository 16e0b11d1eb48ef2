//! Cooperative shutdown signal.
//!
//! A write-once flag shared by every loop in the process. Handles are cloned
//! into the loops that need them instead of living in a global. Besides a
//! plain read, the signal can be awaited, so any blocking wait that selects
//! on it wakes as soon as it trips.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, warn};

/// Process-wide cancellation flag. Starts `false`, becomes `true` once, never resets.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trip the signal.
    ///
    /// Returns `true` only for the call that actually changed it.
    pub fn trigger(&self) -> bool {
        self.tx.send_if_modified(|stopped| {
            if *stopped {
                false
            } else {
                *stopped = true;
                true
            }
        })
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the signal has tripped. Resolves immediately if it already has.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // `self` keeps the sender alive, so the channel cannot close under us.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    /// Trip the signal on Ctrl-C instead of letting the interrupt kill the process.
    ///
    /// The first interrupt only sets the flag so the loops can unwind on their
    /// own. A second one exits immediately.
    pub fn listen_for_interrupt(&self) {
        let signal = self.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for interrupt");
                return;
            }
            warn!("Interrupt received, shutting down");
            signal.trigger();

            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Second interrupt received, exiting immediately");
                std::process::exit(130);
            }
        });
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
