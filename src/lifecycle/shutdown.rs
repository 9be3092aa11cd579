//! Shutdown coordination.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::signals::wait_for_signal;

/// Latched handle that tells every server to drain and stop.
///
/// The flag stays set once triggered, so a server that subscribes after the
/// signal still stops.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

/// One subscriber's view of the shutdown flag.
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been triggered.
    pub async fn wait(mut self) {
        // A dropped sender also means nobody can keep the server alive.
        let _ = self.rx.wait_for(|stopped| *stopped).await;
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Works with or without current subscribers.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Trigger once the process receives SIGINT or SIGTERM.
    pub fn trigger_on_signal(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            this.trigger();
        })
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
