//! Change notifications for box snapshots
//!
//! Every accepted snapshot change reaches two audiences: the listeners
//! registered on the box with [`SettopBox::on_change`](crate::SettopBox::on_change),
//! and the application-wide [`ChangeIterator`].
//!
//! ```rust,ignore
//! for event in system.changes() {
//!     println!("{} now shows {:?}", event.device_id, event.snapshot.title);
//! }
//! ```

use crate::model::{DeviceId, PlaybackSnapshot};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;
use tracing::warn;

/// A box published a new snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub device_id: DeviceId,
    pub snapshot: PlaybackSnapshot,
    pub changed_at: DateTime<Utc>,
}

/// Handle returned by `on_change`, used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Application-wide change stream shared by all boxes of a registry
///
/// Events are only queued once somebody asked for an iterator, so an
/// application that only uses per-box listeners does not accumulate them.
pub(crate) struct ChangeBus {
    tx: Mutex<mpsc::Sender<ChangeEvent>>,
    rx: Arc<std::sync::Mutex<mpsc::Receiver<ChangeEvent>>>,
    subscribed: AtomicBool,
}

impl ChangeBus {
    pub(crate) fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx: Mutex::new(tx),
            rx: Arc::new(std::sync::Mutex::new(rx)),
            subscribed: AtomicBool::new(false),
        }
    }

    pub(crate) fn iter(&self) -> ChangeIterator {
        self.subscribed.store(true, Ordering::SeqCst);
        ChangeIterator::new(Arc::clone(&self.rx))
    }

    fn publish(&self, event: &ChangeEvent) {
        if self.subscribed.load(Ordering::SeqCst) {
            // The receiver lives as long as the bus, so sending cannot fail.
            let _ = self.tx.lock().send(event.clone());
        }
    }
}

/// Fans one box's changes out to its listeners and the shared bus
pub(crate) struct ChangeNotifier {
    device_id: DeviceId,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
    bus: Option<Arc<ChangeBus>>,
}

impl ChangeNotifier {
    pub(crate) fn new(device_id: DeviceId, bus: Option<Arc<ChangeBus>>) -> Self {
        Self {
            device_id,
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
            bus,
        }
    }

    pub(crate) fn subscribe(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver a snapshot to every audience
    ///
    /// A panicking listener is logged and does not stop delivery to the rest.
    pub(crate) fn notify(&self, snapshot: PlaybackSnapshot) {
        let event = ChangeEvent {
            device_id: self.device_id.clone(),
            snapshot,
            changed_at: Utc::now(),
        };

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                warn!(device = %self.device_id, "Change listener panicked");
            }
        }

        if let Some(bus) = &self.bus {
            bus.publish(&event);
        }
    }
}

/// Blocking iterator over snapshot changes of all boxes
///
/// All iterators obtained from the same system share one queue; each event
/// is delivered to exactly one of them.
pub struct ChangeIterator {
    rx: Arc<std::sync::Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl ChangeIterator {
    pub(crate) fn new(rx: Arc<std::sync::Mutex<mpsc::Receiver<ChangeEvent>>>) -> Self {
        Self { rx }
    }

    /// Block until the next event is available
    ///
    /// Returns `None` if the channel is closed.
    pub fn recv(&self) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.recv().ok()
    }

    /// Block until the next event or timeout expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<ChangeEvent> {
        self.rx.lock().ok()?.try_recv().ok()
    }

    /// Drain the events queued right now
    pub fn try_iter(&self) -> TryIter<'_> {
        TryIter { inner: self }
    }

    /// Iterate until no event arrives within `timeout`
    pub fn timeout_iter(&self, timeout: Duration) -> TimeoutIter<'_> {
        TimeoutIter {
            inner: self,
            timeout,
        }
    }
}

impl Iterator for ChangeIterator {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// Non-blocking iterator over currently available events
pub struct TryIter<'a> {
    inner: &'a ChangeIterator,
}

impl<'a> Iterator for TryIter<'a> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.try_recv()
    }
}

/// Blocking iterator with timeout
pub struct TimeoutIter<'a> {
    inner: &'a ChangeIterator,
    timeout: Duration,
}

impl<'a> Iterator for TimeoutIter<'a> {
    type Item = ChangeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv_timeout(self.timeout)
    }
}
