//! Decoding of inbound push frames into closed message types
//!
//! Every frame is decoded exactly once, at the boundary, into a list of
//! [`BoxMessage`]s addressed to one box. Downstream code matches exhaustively
//! on these enums instead of probing JSON fields.
//!
//! Routing rules:
//! - frames carrying `source` belong to that box; they may carry a device
//!   state (`deviceType == "STB"` with `state`) and/or a `status` object
//! - frames carrying `CPE.capacity` without `source` are routed by the
//!   `{household}/{device}/networkRecordings/capacity` topic
//! - everything else is not addressed to a box

use crate::model::{ConnectivityState, DeviceId};
use horizon_stream::topics::capacity_device;
use horizon_stream::InboundFrame;
use serde_json::Value;

/// A message for one box
#[derive(Debug, Clone, PartialEq)]
pub enum BoxMessage {
    /// The box reported its power/online state
    Connectivity {
        device_id: DeviceId,
        state: ConnectivityState,
    },

    /// The box reported what its UI shows
    Status {
        device_id: DeviceId,
        stamp: Option<i64>,
        ui: UiState,
    },

    /// The box reported its recording storage usage
    Capacity {
        device_id: DeviceId,
        used_percent: Option<u8>,
    },

    /// A frame addressed to the box that could not be decoded
    ///
    /// Carries the frame's stamp so a late duplicate is still recognised
    /// as stale.
    Malformed {
        device_id: DeviceId,
        stamp: Option<i64>,
        reason: String,
    },
}

impl BoxMessage {
    pub fn device_id(&self) -> &DeviceId {
        match self {
            BoxMessage::Connectivity { device_id, .. }
            | BoxMessage::Status { device_id, .. }
            | BoxMessage::Capacity { device_id, .. }
            | BoxMessage::Malformed { device_id, .. } => device_id,
        }
    }
}

/// Top-level UI of a box
#[derive(Debug, Clone, PartialEq)]
pub enum UiState {
    /// An app is in the foreground
    Apps { app_name: String, logo_path: String },

    /// The TV player; `None` when the player reports no source
    MainUi(Option<PlayerState>),

    /// Any other UI, carried by name
    Other(String),
}

/// Player state of the main UI
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub source: PlayerSource,
    pub speed: Option<f64>,
    /// Epoch milliseconds of the last speed change
    pub last_speed_change_time: Option<i64>,
    /// Milliseconds from the start of the content
    pub relative_position: Option<f64>,
}

impl PlayerState {
    pub fn is_paused(&self) -> bool {
        self.speed == Some(0.0)
    }
}

/// How a channel is being watched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPlayback {
    Live,
    Buffer,
    Replay,
}

/// What the player is playing
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerSource {
    /// `linear`, `reviewbuffer` or `replay`
    Channel {
        playback: ChannelPlayback,
        channel_id: Option<String>,
        event_id: String,
    },

    /// `nDVR`
    Recording {
        recording_id: String,
        session_start_time: Option<i64>,
        session_end_time: Option<i64>,
    },

    /// `VOD`
    Vod { title_id: String },

    /// Any source type this client does not know
    Unmapped(String),
}

/// Decode one frame into the messages it carries
pub fn decode_frame(frame: &InboundFrame) -> Vec<BoxMessage> {
    let payload = &frame.payload;

    if let Some(source) = payload.get("source").and_then(Value::as_str) {
        let device_id = DeviceId::new(source);
        let mut messages = Vec::new();

        if payload.get("deviceType").and_then(Value::as_str) == Some("STB") {
            if let Some(state) = payload.get("state").and_then(Value::as_str) {
                messages.push(BoxMessage::Connectivity {
                    device_id: device_id.clone(),
                    state: ConnectivityState::from_wire(state),
                });
            }
        }

        if let Some(status) = payload.get("status") {
            let stamp = payload.get("messageTimeStamp").and_then(as_i64);
            match decode_status(status) {
                Ok(Some(ui)) => messages.push(BoxMessage::Status {
                    device_id,
                    stamp,
                    ui,
                }),
                Ok(None) => {}
                Err(reason) => messages.push(BoxMessage::Malformed {
                    device_id,
                    stamp,
                    reason,
                }),
            }
        }
        return messages;
    }

    if payload.get("CPE.capacity").is_some() {
        if let Some(device) = capacity_device(&frame.topic) {
            return vec![BoxMessage::Capacity {
                device_id: DeviceId::new(device),
                used_percent: payload.get("used").and_then(as_f64).map(to_percent),
            }];
        }
    }

    Vec::new()
}

/// `Ok(None)` for a status without `uiStatus`, which carries nothing to apply
fn decode_status(status: &Value) -> Result<Option<UiState>, String> {
    let Some(ui_status) = status.get("uiStatus").and_then(Value::as_str) else {
        return Ok(None);
    };

    let ui = match ui_status {
        "apps" => {
            let apps = status
                .get("appsState")
                .ok_or_else(|| "apps status without appsState".to_string())?;
            UiState::Apps {
                app_name: required_str(apps, "appName")?,
                logo_path: optional_str(apps, "logoPath").unwrap_or_default(),
            }
        }
        "mainUI" => UiState::MainUi(decode_player(status.get("playerState"))?),
        other => UiState::Other(other.to_string()),
    };
    Ok(Some(ui))
}

fn decode_player(player: Option<&Value>) -> Result<Option<PlayerState>, String> {
    let Some(player) = player else {
        return Ok(None);
    };
    let (Some(source_type), Some(source)) = (
        player.get("sourceType").and_then(Value::as_str),
        player.get("source"),
    ) else {
        return Ok(None);
    };

    let source = match source_type {
        "linear" => decode_channel(ChannelPlayback::Live, source)?,
        "reviewbuffer" => decode_channel(ChannelPlayback::Buffer, source)?,
        "replay" => decode_channel(ChannelPlayback::Replay, source)?,
        "nDVR" => PlayerSource::Recording {
            recording_id: required_str(source, "recordingId")?,
            session_start_time: source.get("sessionStartTime").and_then(as_i64),
            session_end_time: source.get("sessionEndTime").and_then(as_i64),
        },
        "VOD" => PlayerSource::Vod {
            title_id: required_str(source, "titleId")?,
        },
        other => PlayerSource::Unmapped(other.to_string()),
    };

    Ok(Some(PlayerState {
        source,
        speed: player.get("speed").and_then(as_f64),
        last_speed_change_time: player.get("lastSpeedChangeTime").and_then(as_i64),
        relative_position: player.get("relativePosition").and_then(as_f64),
    }))
}

fn decode_channel(playback: ChannelPlayback, source: &Value) -> Result<PlayerSource, String> {
    Ok(PlayerSource::Channel {
        playback,
        channel_id: optional_str(source, "channelId"),
        event_id: required_str(source, "eventId")?,
    })
}

fn required_str(value: &Value, field: &str) -> Result<String, String> {
    optional_str(value, field).ok_or_else(|| format!("missing {field}"))
}

fn optional_str(value: &Value, field: &str) -> Option<String> {
    value.get(field).and_then(Value::as_str).map(str::to_string)
}

fn as_i64(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|f| f as i64))
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn as_f64(value: &Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn to_percent(used: f64) -> u8 {
    used.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn frame(topic: &str, payload: Value) -> InboundFrame {
        InboundFrame::new(topic, payload)
    }

    fn main_ui(player: Value) -> InboundFrame {
        frame(
            "hh/BOX/status",
            json!({
                "source": "BOX",
                "messageTimeStamp": 10,
                "status": { "uiStatus": "mainUI", "playerState": player }
            }),
        )
    }

    fn player_source(frame: &InboundFrame) -> PlayerSource {
        match decode_frame(frame).pop() {
            Some(BoxMessage::Status {
                ui: UiState::MainUi(Some(player)),
                ..
            }) => player.source,
            other => panic!("Expected a player state, got {other:?}"),
        }
    }

    #[rstest]
    #[case("ONLINE_RUNNING", ConnectivityState::Running)]
    #[case("ONLINE_STANDBY", ConnectivityState::Standby)]
    #[case("OFFLINE_NETWORK_STANDBY", ConnectivityState::Unknown)]
    fn test_device_state(#[case] wire: &str, #[case] expected: ConnectivityState) {
        let messages = decode_frame(&frame(
            "hh/BOX/status",
            json!({ "source": "BOX", "deviceType": "STB", "state": wire }),
        ));
        assert_eq!(
            messages,
            vec![BoxMessage::Connectivity {
                device_id: DeviceId::new("BOX"),
                state: expected
            }]
        );
    }

    #[test]
    fn test_presence_of_other_clients_is_not_a_device_state() {
        let messages = decode_frame(&frame(
            "hh/abc/status",
            json!({ "source": "abc", "deviceType": "HGO", "state": "ONLINE_RUNNING" }),
        ));
        assert!(messages.is_empty());
    }

    #[rstest]
    #[case("linear", ChannelPlayback::Live)]
    #[case("reviewbuffer", ChannelPlayback::Buffer)]
    #[case("replay", ChannelPlayback::Replay)]
    fn test_channel_sources(#[case] source_type: &str, #[case] playback: ChannelPlayback) {
        let source = player_source(&main_ui(json!({
            "sourceType": source_type,
            "source": { "channelId": "NL_1", "eventId": "E1" },
            "speed": 1
        })));
        assert_eq!(
            source,
            PlayerSource::Channel {
                playback,
                channel_id: Some("NL_1".to_string()),
                event_id: "E1".to_string()
            }
        );
    }

    #[test]
    fn test_recording_source_and_progress() {
        let messages = decode_frame(&main_ui(json!({
            "sourceType": "nDVR",
            "source": { "recordingId": "R1", "sessionStartTime": 1000, "sessionEndTime": 61000 },
            "speed": 0,
            "lastSpeedChangeTime": 1_700_000_000_000i64,
            "relativePosition": 5000
        })));

        let Some(BoxMessage::Status { stamp, ui: UiState::MainUi(Some(player)), .. }) =
            messages.into_iter().next()
        else {
            panic!("Expected a status message");
        };
        assert_eq!(stamp, Some(10));
        assert!(player.is_paused());
        assert_eq!(player.relative_position, Some(5000.0));
        assert_eq!(player.last_speed_change_time, Some(1_700_000_000_000));
        assert_eq!(
            player.source,
            PlayerSource::Recording {
                recording_id: "R1".to_string(),
                session_start_time: Some(1000),
                session_end_time: Some(61000)
            }
        );
    }

    #[test]
    fn test_unknown_source_type_is_unmapped_not_an_error() {
        let source = player_source(&main_ui(json!({
            "sourceType": "pvr2000",
            "source": {}
        })));
        assert_eq!(source, PlayerSource::Unmapped("pvr2000".to_string()));
    }

    #[test]
    fn test_main_ui_without_source_is_empty_player() {
        let messages = decode_frame(&main_ui(json!({ "speed": 1 })));
        assert!(matches!(
            messages.as_slice(),
            [BoxMessage::Status { ui: UiState::MainUi(None), .. }]
        ));
    }

    #[test]
    fn test_missing_event_id_is_malformed() {
        let messages = decode_frame(&main_ui(json!({
            "sourceType": "linear",
            "source": { "channelId": "NL_1" }
        })));
        assert!(matches!(
            messages.as_slice(),
            [BoxMessage::Malformed { stamp: Some(10), reason, .. }] if reason.contains("eventId")
        ));
    }

    #[test]
    fn test_apps() {
        let messages = decode_frame(&frame(
            "hh/BOX/status",
            json!({
                "source": "BOX",
                "status": {
                    "uiStatus": "apps",
                    "appsState": { "appName": "Netflix", "logoPath": "//img/n.png" }
                }
            }),
        ));
        assert_eq!(
            messages,
            vec![BoxMessage::Status {
                device_id: DeviceId::new("BOX"),
                stamp: None,
                ui: UiState::Apps {
                    app_name: "Netflix".to_string(),
                    logo_path: "//img/n.png".to_string()
                }
            }]
        );
    }

    #[test]
    fn test_status_without_ui_status_is_dropped() {
        let messages = decode_frame(&frame(
            "hh/BOX/status",
            json!({ "source": "BOX", "status": { "playerState": {} } }),
        ));
        assert!(messages.is_empty());
    }

    #[test]
    fn test_combined_state_and_status() {
        let messages = decode_frame(&frame(
            "hh/BOX/status",
            json!({
                "source": "BOX", "deviceType": "STB", "state": "ONLINE_RUNNING",
                "status": { "uiStatus": "settings" }
            }),
        ));
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1], BoxMessage::Status { ui: UiState::Other(ref name), .. } if name == "settings"));
    }

    #[rstest]
    #[case("hh/BOX-1/networkRecordings/capacity", Some("BOX-1"))]
    #[case("hh/BOX-1/networkRecordings", None)]
    #[case("hh", None)]
    fn test_capacity_routing(#[case] topic: &str, #[case] device: Option<&str>) {
        let messages = decode_frame(&frame(topic, json!({ "CPE.capacity": true, "used": 42.4 })));
        match device {
            Some(device) => assert_eq!(
                messages,
                vec![BoxMessage::Capacity {
                    device_id: DeviceId::new(device),
                    used_percent: Some(42)
                }]
            ),
            None => assert!(messages.is_empty()),
        }
    }

    #[test]
    fn test_stamp_as_string() {
        let messages = decode_frame(&frame(
            "hh/BOX/status",
            json!({
                "source": "BOX", "messageTimeStamp": "1700000000123",
                "status": { "uiStatus": "mainUI" }
            }),
        ));
        assert!(matches!(
            messages.as_slice(),
            [BoxMessage::Status { stamp: Some(1_700_000_000_123), .. }]
        ));
    }
}
