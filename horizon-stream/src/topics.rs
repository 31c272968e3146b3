//! Topic layout of the household broker

/// Topics a client subscribes to after the handshake
pub fn subscriptions(household_id: &str, client_id: &str) -> Vec<String> {
    let hh = household_id;
    vec![
        hh.to_string(),
        format!("{hh}/#"),
        format!("{hh}/{client_id}"),
        format!("{hh}/+/status"),
        format!("{hh}/+/networkRecordings"),
        format!("{hh}/+/networkRecordings/capacity"),
        format!("{hh}/watchlistService"),
        format!("{hh}/purchaseService"),
        format!("{hh}/personalizationService"),
        format!("{hh}/recordingStatus"),
        format!("{hh}/recordingStatus/lastUserAction"),
    ]
}

/// Topic a box listens on for commands
pub fn device_topic(household_id: &str, device_id: &str) -> String {
    format!("{household_id}/{device_id}")
}

/// Topic on which a client announces itself
pub fn presence_topic(household_id: &str, client_id: &str) -> String {
    format!("{household_id}/{client_id}/status")
}

/// Device id from a `{household}/{device}/networkRecordings/capacity` topic
pub fn capacity_device(topic: &str) -> Option<&str> {
    let parts: Vec<&str> = topic.split('/').collect();
    match parts.as_slice() {
        [_, device, "networkRecordings", "capacity"] if !device.is_empty() => Some(device),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriptions() {
        let topics = subscriptions("hh", "client");
        assert_eq!(topics.len(), 11);
        assert_eq!(topics[0], "hh");
        assert!(topics.contains(&"hh/client".to_string()));
        assert!(topics.contains(&"hh/+/networkRecordings/capacity".to_string()));
    }

    #[test]
    fn test_capacity_device() {
        assert_eq!(capacity_device("hh/BOX-1/networkRecordings/capacity"), Some("BOX-1"));
        assert_eq!(capacity_device("hh/BOX-1/networkRecordings"), None);
        assert_eq!(capacity_device("hh/BOX-1/status"), None);
        assert_eq!(capacity_device("hh//networkRecordings/capacity"), None);
    }

    #[test]
    fn test_command_topics() {
        assert_eq!(device_topic("hh", "BOX-1"), "hh/BOX-1");
        assert_eq!(presence_topic("hh", "abc"), "hh/abc/status");
    }
}
