//! Sync iterator for consuming push channel events
//!
//! Provides a blocking iterator interface over what the background worker
//! receives, without requiring async/await.

use crate::frame::InboundFrame;
use std::sync::mpsc;
use std::time::Duration;

/// What the push worker reports to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Handshake completed and subscriptions were sent; fired again after every reconnect
    Connected,
    /// A JSON frame arrived
    Frame(InboundFrame),
    /// The link dropped; the worker keeps reconnecting
    Disconnected(String),
    /// The broker refused the credentials; the worker has stopped
    Rejected(String),
}

/// Blocking iterator over push events
///
/// This iterator blocks on `next()` until an event is available or the
/// worker has stopped. Use `try_recv()` for non-blocking access.
pub struct PushEvents {
    rx: mpsc::Receiver<PushEvent>,
}

impl PushEvents {
    pub(crate) fn new(rx: mpsc::Receiver<PushEvent>) -> Self {
        Self { rx }
    }

    /// Block until an event is available
    ///
    /// Returns `None` once the worker is gone.
    pub fn recv(&self) -> Option<PushEvent> {
        self.rx.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<PushEvent> {
        self.rx.try_recv().ok()
    }

    /// Block until an event is available or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PushEvent> {
        self.rx.recv_timeout(timeout).ok()
    }
}

impl Iterator for PushEvents {
    type Item = PushEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
