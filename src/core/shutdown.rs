//! Process-wide stop signal.
//!
//! `Shutdown` is an explicit, cloneable handle instead of ambient statics:
//! every long-lived worker (watcher loop, backup scheduler, HTTP server)
//! receives its own clone. Triggering it
//! - sets a flag that poll loops check (`is_triggered`)
//! - drops the broadcast sender, so every `wait_timeout` wakes at once
//! - unblocks the HTTP server if one was registered

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tiny_http::Server;

#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<Inner>,
    /// Disconnects (never receives a value) once the sender is dropped
    wake_rx: Receiver<()>,
}

struct Inner {
    triggered: AtomicBool,
    wake_tx: Mutex<Option<Sender<()>>>,
    server: Mutex<Option<Arc<Server>>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = channel::bounded(0);
        Self {
            inner: Arc::new(Inner {
                triggered: AtomicBool::new(false),
                wake_tx: Mutex::new(Some(wake_tx)),
                server: Mutex::new(None),
            }),
            wake_rx,
        }
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.inner.triggered.store(true, Ordering::SeqCst);

        // Dropping the only sender disconnects every receiver clone
        self.inner.wake_tx.lock().take();

        if let Some(server) = self.inner.server.lock().take() {
            server.unblock();
        }
    }

    /// Check if shutdown has been requested
    ///
    /// Uses Relaxed ordering for performance - worst case is processing
    /// one more poll iteration before stopping
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Relaxed)
    }

    /// Sleep for `timeout` or until shutdown is requested, whichever is first.
    ///
    /// Returns `true` if shutdown was requested.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        if self.is_triggered() {
            return true;
        }
        match self.wake_rx.recv_timeout(timeout) {
            Err(RecvTimeoutError::Timeout) => self.is_triggered(),
            // Disconnected: the sender was dropped by `trigger`
            Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        }
    }

    /// Register the HTTP server so `trigger` can unblock its accept loop.
    ///
    /// If shutdown already happened, the server is unblocked immediately.
    pub fn register_server(&self, server: Arc<Server>) {
        if self.is_triggered() {
            server.unblock();
            return;
        }
        *self.inner.server.lock() = Some(server);
    }

    /// Install the Ctrl+C handler that triggers this signal.
    pub fn install_ctrlc_handler(&self) -> anyhow::Result<()> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            crate::log!("serve"; "shutting down...");
            shutdown.trigger();
        })
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
