//! Builders for the command frames understood by the boxes
//!
//! Every command carries a fresh correlation id and the sending client id.

use crate::frame::{random_id, OutboundFrame, COMMAND_ID_LEN};
use crate::topics::{device_topic, presence_topic};
use serde_json::json;

/// Remote-control keys, named after their W3C key values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKey {
    Power,
    Enter,
    ChannelUp,
    ChannelDown,
    MediaRecord,
    MediaPlayPause,
    MediaStop,
    MediaRewind,
    MediaFastForward,
}

impl MediaKey {
    pub fn w3c_key(self) -> &'static str {
        match self {
            MediaKey::Power => "Power",
            MediaKey::Enter => "Enter",
            MediaKey::ChannelUp => "ChannelUp",
            MediaKey::ChannelDown => "ChannelDown",
            MediaKey::MediaRecord => "MediaRecord",
            MediaKey::MediaPlayPause => "MediaPlayPause",
            MediaKey::MediaStop => "MediaStop",
            MediaKey::MediaRewind => "MediaRewind",
            MediaKey::MediaFastForward => "MediaFastForward",
        }
    }
}

/// Builds command frames on behalf of one client of one household
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuilder {
    household_id: String,
    client_id: String,
    controller_name: String,
}

impl CommandBuilder {
    pub fn new(
        household_id: impl Into<String>,
        client_id: impl Into<String>,
        controller_name: impl Into<String>,
    ) -> Self {
        Self {
            household_id: household_id.into(),
            client_id: client_id.into(),
            controller_name: controller_name.into(),
        }
    }

    pub fn household_id(&self) -> &str {
        &self.household_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Announce this client as an online controller
    pub fn presence(&self) -> OutboundFrame {
        OutboundFrame::new(
            presence_topic(&self.household_id, &self.client_id),
            json!({
                "source": self.client_id,
                "state": "ONLINE_RUNNING",
                "deviceType": "HGO",
            }),
        )
    }

    /// Ask a box to publish its current UI status
    pub fn ui_status_request(&self, device_id: &str) -> OutboundFrame {
        self.simple(device_id, "CPE.getUiStatus")
    }

    /// Ask a box to publish its recording capacity
    pub fn capacity_request(&self, device_id: &str) -> OutboundFrame {
        self.simple(device_id, "CPE.capacity")
    }

    /// Press and release a key
    pub fn key_event(&self, device_id: &str, key: MediaKey) -> OutboundFrame {
        OutboundFrame::new(
            device_topic(&self.household_id, device_id),
            json!({
                "id": random_id(COMMAND_ID_LEN),
                "type": "CPE.KeyEvent",
                "source": self.client_id,
                "status": {
                    "w3cKey": key.w3c_key(),
                    "eventType": "keyDownUp",
                },
            }),
        )
    }

    /// Tune to a linear channel
    pub fn tune_channel(&self, device_id: &str, channel_id: &str) -> OutboundFrame {
        self.push_to_tv(device_id, "linear", json!({ "channelId": channel_id }))
    }

    /// Start playback of a network recording from the beginning
    pub fn play_recording(&self, device_id: &str, recording_id: &str) -> OutboundFrame {
        self.push_to_tv(device_id, "nDVR", json!({ "recordingId": recording_id }))
    }

    fn simple(&self, device_id: &str, kind: &str) -> OutboundFrame {
        OutboundFrame::new(
            device_topic(&self.household_id, device_id),
            json!({
                "id": random_id(COMMAND_ID_LEN),
                "type": kind,
                "source": self.client_id,
            }),
        )
    }

    fn push_to_tv(&self, device_id: &str, source_type: &str, source: serde_json::Value) -> OutboundFrame {
        OutboundFrame::new(
            device_topic(&self.household_id, device_id),
            json!({
                "id": random_id(COMMAND_ID_LEN),
                "type": "CPE.pushToTV",
                "source": {
                    "clientId": self.client_id,
                    "friendlyDeviceName": self.controller_name,
                },
                "status": {
                    "sourceType": source_type,
                    "source": source,
                    "relativePosition": 0,
                    "speed": 1,
                },
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn builder() -> CommandBuilder {
        CommandBuilder::new("hh", "client01", "Living room tablet")
    }

    #[test]
    fn test_presence() {
        let frame = builder().presence();
        assert_eq!(frame.topic, "hh/client01/status");
        assert_eq!(frame.payload["state"], "ONLINE_RUNNING");
        assert_eq!(frame.payload["deviceType"], "HGO");
        assert_eq!(frame.payload["source"], "client01");
    }

    #[rstest]
    #[case::status(builder().ui_status_request("BOX"), "CPE.getUiStatus")]
    #[case::capacity(builder().capacity_request("BOX"), "CPE.capacity")]
    fn test_requests(#[case] frame: OutboundFrame, #[case] kind: &str) {
        assert_eq!(frame.topic, "hh/BOX");
        assert_eq!(frame.kind(), Some(kind));
        assert_eq!(frame.payload["source"], "client01");
        assert_eq!(frame.id().map(str::len), Some(COMMAND_ID_LEN));
    }

    #[test]
    fn test_key_event() {
        let frame = builder().key_event("BOX", MediaKey::MediaPlayPause);
        assert_eq!(frame.kind(), Some("CPE.KeyEvent"));
        assert_eq!(frame.payload["status"]["w3cKey"], "MediaPlayPause");
        assert_eq!(frame.payload["status"]["eventType"], "keyDownUp");
    }

    #[test]
    fn test_tune_channel() {
        let frame = builder().tune_channel("BOX", "NL_1");
        assert_eq!(frame.kind(), Some("CPE.pushToTV"));
        assert_eq!(frame.payload["source"]["clientId"], "client01");
        assert_eq!(frame.payload["source"]["friendlyDeviceName"], "Living room tablet");
        assert_eq!(frame.payload["status"]["sourceType"], "linear");
        assert_eq!(frame.payload["status"]["source"]["channelId"], "NL_1");
        assert_eq!(frame.payload["status"]["speed"], 1);
    }

    #[test]
    fn test_play_recording() {
        let frame = builder().play_recording("BOX", "rec-9");
        assert_eq!(frame.payload["status"]["sourceType"], "nDVR");
        assert_eq!(frame.payload["status"]["source"]["recordingId"], "rec-9");
        assert_eq!(frame.payload["status"]["relativePosition"], 0);
    }

    #[test]
    fn test_correlation_ids_are_fresh() {
        let b = builder();
        let first = b.key_event("BOX", MediaKey::Power);
        let second = b.key_event("BOX", MediaKey::Power);
        assert_ne!(first.id(), second.id());
    }
}
