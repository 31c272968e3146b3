//! Frames crossing the push channel

use rand::{distributions::Alphanumeric, Rng};
use serde_json::Value;

/// Length of the correlation id carried by command frames
pub const COMMAND_ID_LEN: usize = 8;

/// Length of the generated MQTT client id
pub const CLIENT_ID_LEN: usize = 10;

/// Random alphanumeric identifier
pub fn random_id(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A JSON message received from the broker
#[derive(Debug, Clone, PartialEq)]
pub struct InboundFrame {
    pub topic: String,
    pub payload: Value,
}

impl InboundFrame {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self { topic: topic.into(), payload }
    }

    /// Decode a raw publish; `None` if the payload is not JSON
    pub fn from_bytes(topic: &str, payload: &[u8]) -> Option<Self> {
        serde_json::from_slice(payload)
            .ok()
            .map(|payload| Self::new(topic, payload))
    }
}

/// A JSON message to publish
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundFrame {
    pub topic: String,
    pub payload: Value,
}

impl OutboundFrame {
    pub fn new(topic: impl Into<String>, payload: Value) -> Self {
        Self { topic: topic.into(), payload }
    }

    /// The `type` field of the payload
    pub fn kind(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    /// The correlation id of the payload
    pub fn id(&self) -> Option<&str> {
        self.payload.get("id").and_then(Value::as_str)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.payload.to_string().into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_inbound_from_bytes() {
        let frame = InboundFrame::from_bytes("hh/BOX/status", br#"{"source":"BOX"}"#).unwrap();
        assert_eq!(frame.topic, "hh/BOX/status");
        assert_eq!(frame.payload["source"], "BOX");

        assert!(InboundFrame::from_bytes("hh", b"not json").is_none());
    }

    #[test]
    fn test_outbound_accessors() {
        let frame = OutboundFrame::new("hh/BOX", json!({"id": "abc", "type": "CPE.getUiStatus"}));
        assert_eq!(frame.kind(), Some("CPE.getUiStatus"));
        assert_eq!(frame.id(), Some("abc"));
        assert_eq!(frame.to_bytes(), br#"{"id":"abc","type":"CPE.getUiStatus"}"#.to_vec());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_random_id_is_alphanumeric(len in 0usize..64) {
            let id = random_id(len);
            prop_assert_eq!(id.len(), len);
            prop_assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }
}
