//! Broadcast shutdown signaling for pipeline runs.
//!
//! Wraps a watch channel into a shutdown transmitter/receiver pair. The
//! signal carries no payload; receivers only care whether shutdown has been
//! requested.

use tokio::sync::watch;

/// Transmitter side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

/// Receiver side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownTx {
    /// Requests shutdown. Returns whether any receiver observed the request.
    pub fn shutdown(&self) -> bool {
        self.0.send(true).is_ok()
    }

    /// Creates a new receiver subscribed to this transmitter.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

impl ShutdownRx {
    /// Returns whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }
}

/// Creates a new shutdown channel in the not-shut-down state.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}
