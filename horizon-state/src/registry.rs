//! Routing of push events to the boxes of a household
//!
//! Each box gets its own actor thread, so frames for one box are applied in
//! arrival order while a slow metadata lookup for one box never delays
//! another. A dispatcher thread consumes the push channel events, decodes
//! frames once and hands the messages to the owning actor.
//!
//! ```text
//! PushEvents → dispatcher → decode_frame → actor(box) → dispatch → SettopBox
//! ```

use crate::catalog::CatalogHandle;
use crate::change::{ChangeBus, ChangeIterator, ChangeNotifier};
use crate::decoder::{decode_frame, BoxMessage};
use crate::dispatch::dispatch;
use crate::error::{Result, StateError};
use crate::model::{Device, DeviceId};
use crate::settop_box::SettopBox;
use horizon_api::MetadataSource;
use horizon_stream::{CommandSink, InboundFrame, PushEvent, PushEvents};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

struct Job {
    message: BoxMessage,
    frame: Arc<InboundFrame>,
}

/// Routing table shared with the dispatcher thread
struct Router {
    boxes: HashMap<DeviceId, Arc<SettopBox>>,
    actors: Mutex<HashMap<DeviceId, mpsc::Sender<Job>>>,
    accepting: AtomicBool,
}

impl Router {
    fn route(&self, frame: InboundFrame) -> usize {
        if !self.accepting.load(Ordering::SeqCst) {
            debug!(topic = %frame.topic, "Registry stopped, dropping frame");
            return 0;
        }

        let messages = decode_frame(&frame);
        if messages.is_empty() {
            debug!(topic = %frame.topic, "Frame not addressed to a box");
            return 0;
        }

        let frame = Arc::new(frame);
        let actors = self.actors.lock();
        let mut routed = 0;
        for message in messages {
            let Some(actor) = actors.get(message.device_id()) else {
                debug!(device = %message.device_id(), "Frame for unknown box dropped");
                continue;
            };
            let device = message.device_id().clone();
            let job = Job {
                message,
                frame: Arc::clone(&frame),
            };
            if actor.send(job).is_err() {
                warn!(device = %device, "Box actor has stopped, frame dropped");
            } else {
                routed += 1;
            }
        }
        routed
    }

    fn announce_presence(&self) {
        for settop_box in self.boxes.values() {
            if let Err(e) = settop_box.announce_presence() {
                warn!(device = %settop_box.id(), "Presence announcement failed: {}", e);
            }
        }
    }

    fn handle_event(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                info!(boxes = self.boxes.len(), "Push channel up, announcing presence");
                self.announce_presence();
            }
            PushEvent::Frame(frame) => {
                self.route(frame);
            }
            PushEvent::Disconnected(reason) => {
                warn!("Push channel lost, waiting for reconnect: {}", reason);
            }
            PushEvent::Rejected(reason) => {
                warn!("Push channel rejected: {}", reason);
            }
        }
    }
}

/// The boxes of one household and the threads that feed them
pub struct Registry {
    router: Arc<Router>,
    bus: Arc<ChangeBus>,
    actor_handles: Mutex<Vec<JoinHandle<()>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl Registry {
    /// Create one box per device and start its actor thread
    pub fn new(
        devices: Vec<Device>,
        sink: Arc<dyn CommandSink>,
        metadata: Arc<dyn MetadataSource>,
        catalog: CatalogHandle,
    ) -> Result<Self> {
        let bus = Arc::new(ChangeBus::new());
        let mut boxes = HashMap::new();
        let mut actors = HashMap::new();
        let mut actor_handles = Vec::new();

        for device in devices {
            let id = device.id.clone();
            if boxes.contains_key(&id) {
                warn!(device = %id, "Duplicate box in household, ignoring");
                continue;
            }

            let notifier = ChangeNotifier::new(id.clone(), Some(Arc::clone(&bus)));
            let settop_box = Arc::new(SettopBox::with_notifier(
                device,
                Arc::clone(&sink),
                Arc::clone(&metadata),
                catalog.clone(),
                notifier,
            ));

            let (tx, rx) = mpsc::channel::<Job>();
            let worker_box = Arc::clone(&settop_box);
            let handle = thread::Builder::new()
                .name(format!("horizon-box-{id}"))
                .spawn(move || {
                    for job in rx {
                        dispatch(&worker_box, job.message, &job.frame);
                    }
                    debug!(device = %worker_box.id(), "Box actor stopped");
                })
                .map_err(|e| StateError::Spawn(e.to_string()))?;

            boxes.insert(id.clone(), settop_box);
            actors.insert(id, tx);
            actor_handles.push(handle);
        }

        info!(boxes = boxes.len(), "Registry created");
        Ok(Self {
            router: Arc::new(Router {
                boxes,
                actors: Mutex::new(actors),
                accepting: AtomicBool::new(true),
            }),
            bus,
            actor_handles: Mutex::new(actor_handles),
            dispatcher: Mutex::new(None),
        })
    }

    /// Consume push events on a dispatcher thread until the stream ends
    pub fn start(&self, events: PushEvents) -> Result<()> {
        let mut dispatcher = self.dispatcher.lock();
        if dispatcher.is_some() {
            return Err(StateError::Spawn("dispatcher already running".to_string()));
        }

        let router = Arc::clone(&self.router);
        let handle = thread::Builder::new()
            .name("horizon-dispatch".to_string())
            .spawn(move || {
                for event in events {
                    router.handle_event(event);
                }
                debug!("Push event stream ended, dispatcher stopped");
            })
            .map_err(|e| StateError::Spawn(e.to_string()))?;
        *dispatcher = Some(handle);
        Ok(())
    }

    /// Route one frame directly, bypassing the push channel
    ///
    /// Returns how many box messages were queued.
    pub fn route(&self, frame: InboundFrame) -> usize {
        self.router.route(frame)
    }

    /// Let every box announce this client
    pub fn announce_presence(&self) {
        self.router.announce_presence();
    }

    /// All boxes, ordered by id
    pub fn settop_boxes(&self) -> Vec<Arc<SettopBox>> {
        let mut boxes: Vec<_> = self.router.boxes.values().cloned().collect();
        boxes.sort_by(|a, b| a.id().cmp(b.id()));
        boxes
    }

    pub fn settop_box(&self, id: &DeviceId) -> Result<Arc<SettopBox>> {
        self.router
            .boxes
            .get(id)
            .cloned()
            .ok_or_else(|| StateError::DeviceNotFound(id.clone()))
    }

    /// Blocking iterator over the changes of all boxes
    pub fn changes(&self) -> ChangeIterator {
        self.bus.iter()
    }

    pub fn is_accepting(&self) -> bool {
        self.router.accepting.load(Ordering::SeqCst)
    }

    /// Drop every frame routed from now on
    pub fn stop_accepting(&self) {
        self.router.accepting.store(false, Ordering::SeqCst);
    }

    /// Stop routing and join all threads
    ///
    /// Call once the push channel has closed: the dispatcher exits when its
    /// event stream ends. Frames already queued for a box are still applied.
    pub fn shutdown(&self) {
        self.stop_accepting();
        self.router.actors.lock().clear();

        for handle in self.actor_handles.lock().drain(..) {
            if handle.join().is_err() {
                warn!("Box actor panicked during shutdown");
            }
        }
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!("Dispatcher panicked during shutdown");
            }
        }
        info!("Registry shut down");
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.stop_accepting();
        self.router.actors.lock().clear();
    }
}
