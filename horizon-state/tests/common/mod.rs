//! In-memory collaborators for driving boxes without a broker or REST backend

#![allow(dead_code)]

use horizon_api::{ChannelRecord, FetchError, MetadataSource, RecordingDetail, ReplayEvent, VodDetail};
use horizon_state::dispatch::dispatch;
use horizon_state::{
    BoxMessage, CatalogHandle, ChangeEvent, ChannelCatalog, Device, SettopBox, StateError,
};
use horizon_stream::{CommandBuilder, CommandSink, InboundFrame, OutboundFrame, PushError};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

pub const DEVICE: &str = "3C36E4-EOSSTB-1";

/// Records published frames instead of sending them
pub struct RecordingSink {
    commands: CommandBuilder,
    frames: Mutex<Vec<OutboundFrame>>,
    connected: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            commands: CommandBuilder::new("hh", "client0001", "Test remote"),
            frames: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        })
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn frames(&self) -> Vec<OutboundFrame> {
        self.frames.lock().clone()
    }

    pub fn kinds(&self) -> Vec<String> {
        self.frames()
            .iter()
            .map(|f| f.kind().unwrap_or("presence").to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.frames.lock().clear();
    }
}

impl CommandSink for RecordingSink {
    fn publish(&self, frame: OutboundFrame) -> Result<(), PushError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(PushError::NotConnected);
        }
        self.frames.lock().push(frame);
        Ok(())
    }

    fn commands(&self) -> &CommandBuilder {
        &self.commands
    }
}

/// Canned metadata keyed by id; unknown ids answer with a protocol error
#[derive(Default)]
pub struct FakeMetadata {
    pub events: Mutex<HashMap<String, Result<ReplayEvent, FetchError>>>,
    pub recordings: Mutex<HashMap<String, Result<RecordingDetail, FetchError>>>,
    pub vods: Mutex<HashMap<String, Result<VodDetail, FetchError>>>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeMetadata {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_event(&self, id: &str, payload: Value) {
        let event = serde_json::from_value(payload).unwrap();
        self.events.lock().insert(id.to_string(), Ok(event));
    }

    pub fn with_event_error(&self, id: &str, error: FetchError) {
        self.events.lock().insert(id.to_string(), Err(error));
    }

    pub fn with_recording(&self, id: &str, payload: Value) {
        let recording = serde_json::from_value(payload).unwrap();
        self.recordings.lock().insert(id.to_string(), Ok(recording));
    }

    pub fn with_vod(&self, id: &str, payload: Value) {
        let vod = serde_json::from_value(payload).unwrap();
        self.vods.lock().insert(id.to_string(), Ok(vod));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

fn lookup<T: Clone>(
    map: &Mutex<HashMap<String, Result<T, FetchError>>>,
    id: &str,
) -> Result<T, FetchError> {
    map.lock()
        .get(id)
        .cloned()
        .unwrap_or_else(|| Err(FetchError::Protocol(format!("no fixture for {id}"))))
}

impl MetadataSource for FakeMetadata {
    fn replay_event(&self, event_id: &str) -> Result<ReplayEvent, FetchError> {
        self.calls.lock().push(format!("event:{event_id}"));
        lookup(&self.events, event_id)
    }

    fn recording(&self, recording_id: &str) -> Result<RecordingDetail, FetchError> {
        self.calls.lock().push(format!("recording:{recording_id}"));
        lookup(&self.recordings, recording_id)
    }

    fn vod(&self, title_id: &str) -> Result<VodDetail, FetchError> {
        self.calls.lock().push(format!("vod:{title_id}"));
        lookup(&self.vods, title_id)
    }
}

pub fn channel(id: &str, name: &str) -> ChannelRecord {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "linearProducts": ["basic"],
        "imageStream": { "full": format!("https://img/{id}.jpg") },
    }))
    .unwrap()
}

pub fn catalog(channels: &[(&str, &str)]) -> CatalogHandle {
    let records: Vec<ChannelRecord> = channels.iter().map(|(id, name)| channel(id, name)).collect();
    let entitlements: HashSet<String> = ["basic".to_string()].into_iter().collect();
    CatalogHandle::new(ChannelCatalog::build(&records, &entitlements))
}

/// A box wired to fakes, with every change captured
pub struct Harness {
    pub settop_box: SettopBox,
    pub sink: Arc<RecordingSink>,
    pub metadata: Arc<FakeMetadata>,
    pub changes: mpsc::Receiver<ChangeEvent>,
}

impl Harness {
    pub fn new(catalog: CatalogHandle) -> Self {
        let sink = RecordingSink::new();
        let metadata = FakeMetadata::new();
        let settop_box = SettopBox::new(
            Device::new(DEVICE, "Living room"),
            sink.clone(),
            metadata.clone(),
            catalog,
        );
        let (tx, changes) = mpsc::channel();
        let tx = Mutex::new(tx);
        settop_box.on_change(move |event| {
            let _ = tx.lock().send(event.clone());
        });
        Self { settop_box, sink, metadata, changes }
    }

    /// Feed a raw frame through the decoder into the box
    pub fn feed(&self, payload: Value) -> Vec<horizon_state::Result<()>> {
        let frame = InboundFrame::new(format!("hh/{DEVICE}/status"), payload);
        horizon_state::decode_frame(&frame)
            .into_iter()
            .map(|message: BoxMessage| self.settop_box.handle(message))
            .collect()
    }

    /// Feed a raw frame through the dispatch boundary, as the registry does
    pub fn deliver(&self, payload: Value) -> Vec<Option<StateError>> {
        let frame = InboundFrame::new(format!("hh/{DEVICE}/status"), payload);
        horizon_state::decode_frame(&frame)
            .into_iter()
            .map(|message| dispatch(&self.settop_box, message, &frame))
            .collect()
    }

    /// Bring the box to Running and forget the requests that triggers
    pub fn running(self) -> Self {
        self.feed(device_state("ONLINE_RUNNING"));
        self.sink.clear();
        self
    }

    pub fn drain_changes(&self) -> Vec<ChangeEvent> {
        self.changes.try_iter().collect()
    }

    pub fn next_change(&self) -> Option<ChangeEvent> {
        self.changes.recv_timeout(Duration::from_secs(5)).ok()
    }
}

pub fn device_state(state: &str) -> Value {
    json!({ "source": DEVICE, "deviceType": "STB", "state": state })
}

pub fn main_ui(stamp: i64, player: Value) -> Value {
    json!({
        "source": DEVICE,
        "messageTimeStamp": stamp,
        "status": { "uiStatus": "mainUI", "playerState": player }
    })
}

pub fn linear(stamp: i64, channel_id: &str, event_id: &str, speed: i64) -> Value {
    main_ui(
        stamp,
        json!({
            "sourceType": "linear",
            "source": { "channelId": channel_id, "eventId": event_id },
            "speed": speed
        }),
    )
}

pub fn app(stamp: i64, name: &str) -> Value {
    json!({
        "source": DEVICE,
        "messageTimeStamp": stamp,
        "status": {
            "uiStatus": "apps",
            "appsState": { "appName": name, "logoPath": "//img/app.png" }
        }
    })
}
