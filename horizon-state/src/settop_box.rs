//! State machine and remote control for one set-top box

use crate::catalog::{CatalogHandle, ChannelDescriptor};
use crate::change::{ChangeEvent, ChangeNotifier, ListenerId};
use crate::decoder::{BoxMessage, ChannelPlayback, PlayerSource, PlayerState, UiState};
use crate::error::{Result, StateError};
use crate::model::{ConnectivityState, Device, DeviceId, PlaybackSnapshot, SourceKind};
use chrono::{DateTime, TimeZone, Utc};
use horizon_api::MetadataSource;
use horizon_stream::{CommandSink, MediaKey, OutboundFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct BoxState {
    snapshot: PlaybackSnapshot,
    last_stamp: Option<i64>,
    capacity: Option<u8>,
}

/// One set-top box of the household
///
/// Frames are applied by the registry through [`SettopBox::handle`]; the
/// application reads the snapshot and drives the box with the remote-control
/// methods. Remote-control calls that the current state does not permit are
/// skipped and return `Ok(())`.
///
/// ```rust,ignore
/// let living_room = system.settop_box(&"3C36E4-EOSSTB-003656579806".into())?;
/// living_room.on_change(|event| println!("{:?}", event.snapshot.title));
/// living_room.set_channel("NPO 1 HD")?;
/// ```
pub struct SettopBox {
    device: Device,
    state: Mutex<BoxState>,
    sink: Arc<dyn CommandSink>,
    metadata: Arc<dyn MetadataSource>,
    catalog: CatalogHandle,
    notifier: ChangeNotifier,
}

impl SettopBox {
    /// A standalone box whose changes only reach its own listeners
    pub fn new(
        device: Device,
        sink: Arc<dyn CommandSink>,
        metadata: Arc<dyn MetadataSource>,
        catalog: CatalogHandle,
    ) -> Self {
        let notifier = ChangeNotifier::new(device.id.clone(), None);
        Self::with_notifier(device, sink, metadata, catalog, notifier)
    }

    pub(crate) fn with_notifier(
        device: Device,
        sink: Arc<dyn CommandSink>,
        metadata: Arc<dyn MetadataSource>,
        catalog: CatalogHandle,
        notifier: ChangeNotifier,
    ) -> Self {
        Self {
            device,
            state: Mutex::new(BoxState::default()),
            sink,
            metadata,
            catalog,
            notifier,
        }
    }

    pub fn id(&self) -> &DeviceId {
        &self.device.id
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.lock().snapshot.clone()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.state.lock().snapshot.connectivity
    }

    /// Running or in standby
    pub fn is_available(&self) -> bool {
        matches!(
            self.connectivity(),
            ConnectivityState::Running | ConnectivityState::Standby
        )
    }

    /// Share of the recording storage in use, as last reported by the box
    pub fn recording_capacity(&self) -> Option<u8> {
        self.state.lock().capacity
    }

    /// Call `listener` after every snapshot change of this box
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(Arc::new(listener))
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    /// Announce this client as a controller to the box
    pub fn announce_presence(&self) -> Result<()> {
        debug!(device = %self.device.id, "Announcing presence");
        self.publish(self.sink.commands().presence())
    }

    /// Apply one decoded message
    ///
    /// Errors are for the dispatch boundary, which degrades the snapshot.
    pub fn handle(&self, message: BoxMessage) -> Result<()> {
        match message {
            BoxMessage::Connectivity { state, .. } => self.apply_connectivity(state),
            BoxMessage::Status { stamp, ui, .. } => self.apply_status(stamp, ui),
            BoxMessage::Capacity { used_percent, .. } => {
                debug!(device = %self.device.id, ?used_percent, "Recording capacity");
                self.state.lock().capacity = used_percent;
                Ok(())
            }
            BoxMessage::Malformed { stamp, reason, .. } => {
                if !self.accept_stamp(stamp) {
                    return Ok(());
                }
                Err(StateError::Protocol(reason))
            }
        }
    }

    /// Force the empty snapshot and tell observers
    pub fn force_reset(&self) {
        let snapshot = {
            let mut state = self.state.lock();
            state.snapshot.reset();
            state.snapshot.paused = false;
            state.snapshot.clone()
        };
        self.notifier.notify(snapshot);
    }

    fn apply_connectivity(&self, connectivity: ConnectivityState) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock();
            if state.snapshot.connectivity == connectivity {
                return Ok(());
            }
            info!(device = %self.device.id, from = ?state.snapshot.connectivity, to = ?connectivity, "Connectivity changed");
            state.snapshot.connectivity = connectivity;
            if connectivity != ConnectivityState::Running {
                state.snapshot.reset();
            }
            state.snapshot.clone()
        };

        match connectivity {
            ConnectivityState::Running => {
                let commands = self.sink.commands();
                self.send_best_effort(commands.ui_status_request(self.device.id.as_str()));
                self.send_best_effort(commands.capacity_request(self.device.id.as_str()));
            }
            ConnectivityState::Standby | ConnectivityState::Unknown => {
                self.notifier.notify(snapshot);
            }
        }
        Ok(())
    }

    /// Record `stamp` as the newest one, or refuse it when it is stale
    ///
    /// Frames without a stamp are always accepted.
    fn accept_stamp(&self, stamp: Option<i64>) -> bool {
        let mut state = self.state.lock();
        if let (Some(stamp), Some(last)) = (stamp, state.last_stamp) {
            if stamp <= last {
                debug!(device = %self.device.id, stamp, last, "Discarding stale status");
                return false;
            }
        }
        if stamp.is_some() {
            state.last_stamp = stamp;
        }
        true
    }

    fn apply_status(&self, stamp: Option<i64>, ui: UiState) -> Result<()> {
        if !self.accept_stamp(stamp) {
            return Ok(());
        }
        let connectivity = self.connectivity();

        let snapshot = match ui {
            UiState::Apps { app_name, logo_path } => PlaybackSnapshot {
                connectivity,
                source_kind: SourceKind::App,
                channel_title: Some(app_name.clone()),
                title: Some(app_name),
                artwork_url: absolute_logo_url(&logo_path),
                ..Default::default()
            },
            UiState::MainUi(Some(player)) => self.classify(connectivity, &player)?,
            UiState::MainUi(None) => {
                debug!(device = %self.device.id, "Player reports no source");
                return Ok(());
            }
            UiState::Other(name) => {
                debug!(device = %self.device.id, ui = %name, "Ignoring UI status");
                return Ok(());
            }
        };

        let snapshot = {
            let mut state = self.state.lock();
            // Connectivity may have moved while metadata was fetched.
            state.snapshot = PlaybackSnapshot {
                connectivity: state.snapshot.connectivity,
                ..snapshot
            };
            state.snapshot.clone()
        };
        debug!(device = %self.device.id, kind = ?snapshot.source_kind, "Snapshot updated");
        self.notifier.notify(snapshot);
        Ok(())
    }

    fn classify(&self, connectivity: ConnectivityState, player: &PlayerState) -> Result<PlaybackSnapshot> {
        let paused = player.is_paused();
        let catalog = self.catalog.current();

        match &player.source {
            PlayerSource::Channel {
                playback,
                channel_id,
                event_id,
            } => {
                let event = self.metadata.replay_event(event_id)?;
                let channel_id = channel_id.clone().or_else(|| event.channel_id.clone());
                let Some(channel) = channel_id.as_deref().and_then(|id| catalog.get(id)) else {
                    debug!(device = %self.device.id, ?channel_id, "Channel not in catalog");
                    return Ok(PlaybackSnapshot::unknown_channel(connectivity, paused));
                };

                Ok(PlaybackSnapshot {
                    connectivity,
                    source_kind: match playback {
                        ChannelPlayback::Live => SourceKind::LiveChannel,
                        ChannelPlayback::Buffer => SourceKind::Buffer,
                        ChannelPlayback::Replay => SourceKind::Replay,
                    },
                    title: Some(event.display_title()),
                    paused,
                    ..channel_fields(channel)
                })
            }

            PlayerSource::Recording {
                recording_id,
                session_start_time,
                session_end_time,
            } => {
                let recording = self.metadata.recording(recording_id)?;
                let channel = recording.channel_id.as_deref().and_then(|id| catalog.get(id));
                let base = channel.map(channel_fields).unwrap_or_default();
                let artwork_url = recording
                    .poster_url()
                    .map(str::to_string)
                    .or(base.artwork_url.clone());

                Ok(PlaybackSnapshot {
                    connectivity,
                    source_kind: SourceKind::Recording,
                    title: Some(recording.title),
                    artwork_url,
                    paused,
                    duration_seconds: session_duration(*session_start_time, *session_end_time),
                    position_seconds: player.relative_position.map(|ms| ms / 1000.0),
                    position_observed_at: player.last_speed_change_time.and_then(epoch_millis),
                    ..base
                })
            }

            PlayerSource::Vod { title_id } => {
                let vod = self.metadata.vod(title_id)?;
                Ok(PlaybackSnapshot {
                    connectivity,
                    source_kind: SourceKind::Vod,
                    title: Some(vod.title),
                    paused,
                    duration_seconds: vod.duration,
                    position_seconds: player.relative_position.map(|ms| ms / 1000.0),
                    position_observed_at: player.last_speed_change_time.and_then(epoch_millis),
                    ..Default::default()
                })
            }

            PlayerSource::Unmapped(source_type) => {
                debug!(device = %self.device.id, %source_type, "Unmapped source type");
                Ok(PlaybackSnapshot::unknown_channel(connectivity, paused))
            }
        }
    }

    pub fn turn_on(&self) -> Result<()> {
        if self.connectivity() != ConnectivityState::Standby {
            return self.skip("turn_on");
        }
        self.send_key(MediaKey::Power)
    }

    pub fn turn_off(&self) -> Result<()> {
        if !self.is_running() {
            return self.skip("turn_off");
        }
        self.send_key(MediaKey::Power)?;
        let snapshot = {
            let mut state = self.state.lock();
            state.snapshot.reset();
            state.snapshot.clone()
        };
        self.notifier.notify(snapshot);
        Ok(())
    }

    pub fn pause(&self) -> Result<()> {
        let snapshot = self.snapshot();
        if snapshot.connectivity != ConnectivityState::Running || snapshot.paused {
            return self.skip("pause");
        }
        self.send_key(MediaKey::MediaPlayPause)
    }

    pub fn play(&self) -> Result<()> {
        let snapshot = self.snapshot();
        if snapshot.connectivity != ConnectivityState::Running || !snapshot.paused {
            return self.skip("play");
        }
        self.send_key(MediaKey::MediaPlayPause)
    }

    pub fn stop(&self) -> Result<()> {
        self.running_key("stop", MediaKey::MediaStop)
    }

    pub fn next_channel(&self) -> Result<()> {
        self.running_key("next_channel", MediaKey::ChannelUp)
    }

    pub fn previous_channel(&self) -> Result<()> {
        self.running_key("previous_channel", MediaKey::ChannelDown)
    }

    pub fn enter(&self) -> Result<()> {
        self.running_key("enter", MediaKey::Enter)
    }

    pub fn rewind(&self) -> Result<()> {
        self.running_key("rewind", MediaKey::MediaRewind)
    }

    pub fn fast_forward(&self) -> Result<()> {
        self.running_key("fast_forward", MediaKey::MediaFastForward)
    }

    pub fn record(&self) -> Result<()> {
        self.running_key("record", MediaKey::MediaRecord)
    }

    /// Tune to the first catalog channel whose display name is exactly `name`
    pub fn set_channel(&self, name: &str) -> Result<()> {
        if !self.is_running() {
            return self.skip("set_channel");
        }
        let catalog = self.catalog.current();
        let channel = catalog
            .find_by_name(name)
            .ok_or_else(|| StateError::ChannelNotFound(name.to_string()))?;
        info!(device = %self.device.id, channel = %channel.id, "Tuning channel");
        self.publish(
            self.sink
                .commands()
                .tune_channel(self.device.id.as_str(), channel.id.as_str()),
        )
    }

    /// Play a network recording from the start
    pub fn play_recording(&self, recording_id: &str) -> Result<()> {
        if !self.is_running() {
            return self.skip("play_recording");
        }
        self.publish(
            self.sink
                .commands()
                .play_recording(self.device.id.as_str(), recording_id),
        )
    }

    fn is_running(&self) -> bool {
        self.connectivity() == ConnectivityState::Running
    }

    fn running_key(&self, operation: &'static str, key: MediaKey) -> Result<()> {
        if !self.is_running() {
            return self.skip(operation);
        }
        self.send_key(key)
    }

    fn skip(&self, operation: &'static str) -> Result<()> {
        debug!(device = %self.device.id, operation, "Not permitted in current state, skipped");
        Ok(())
    }

    fn send_key(&self, key: MediaKey) -> Result<()> {
        self.publish(self.sink.commands().key_event(self.device.id.as_str(), key))
    }

    fn publish(&self, frame: OutboundFrame) -> Result<()> {
        self.sink.publish(frame).map_err(StateError::from)
    }

    fn send_best_effort(&self, frame: OutboundFrame) {
        let kind = frame.kind().unwrap_or_default().to_string();
        if let Err(e) = self.sink.publish(frame) {
            warn!(device = %self.device.id, %kind, "Request not sent: {}", e);
        }
    }
}

impl std::fmt::Debug for SettopBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettopBox")
            .field("device", &self.device)
            .field("connectivity", &self.connectivity())
            .finish_non_exhaustive()
    }
}

fn channel_fields(channel: &ChannelDescriptor) -> PlaybackSnapshot {
    PlaybackSnapshot {
        channel_id: Some(channel.id.clone()),
        channel_title: Some(channel.display_name.clone()),
        artwork_url: Some(channel.stream_artwork_url.clone()).filter(|url| !url.is_empty()),
        ..Default::default()
    }
}

/// Seconds between two epoch-millisecond times; `None` unless `end >= start`
fn session_duration(start: Option<i64>, end: Option<i64>) -> Option<f64> {
    let millis = end?.checked_sub(start?).filter(|ms| *ms >= 0)?;
    Some(millis as f64 / 1000.0)
}

fn epoch_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// App logos arrive scheme-relative or bare
fn absolute_logo_url(path: &str) -> Option<String> {
    if path.is_empty() {
        None
    } else if path.starts_with("http://") || path.starts_with("https://") {
        Some(path.to_string())
    } else if path.starts_with("//") {
        Some(format!("https:{path}"))
    } else {
        Some(format!("https://{path}"))
    }
}
