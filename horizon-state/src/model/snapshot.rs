//! Per-box "now playing" view

use super::ChannelId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown when the box plays a channel missing from the catalog
pub const UNKNOWN_CHANNEL_TITLE: &str = "No information available";

/// Power/online state reported by a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectivityState {
    #[default]
    Unknown,
    Running,
    Standby,
}

impl ConnectivityState {
    /// Decode the `state` field of a device-state frame
    pub fn from_wire(state: &str) -> Self {
        match state {
            "ONLINE_RUNNING" => ConnectivityState::Running,
            "ONLINE_STANDBY" => ConnectivityState::Standby,
            _ => ConnectivityState::Unknown,
        }
    }
}

/// What kind of content the box is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceKind {
    #[default]
    None,
    LiveChannel,
    Buffer,
    Replay,
    Recording,
    Vod,
    App,
}

/// Consistent view of what a box is playing
///
/// With `source_kind == None` the channel, title and artwork are all absent.
/// `position_seconds` is only meaningful together with `position_observed_at`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaybackSnapshot {
    pub connectivity: ConnectivityState,
    pub source_kind: SourceKind,
    pub channel_id: Option<ChannelId>,
    pub channel_title: Option<String>,
    pub title: Option<String>,
    pub artwork_url: Option<String>,
    pub paused: bool,
    pub duration_seconds: Option<f64>,
    pub position_seconds: Option<f64>,
    pub position_observed_at: Option<DateTime<Utc>>,
}

impl PlaybackSnapshot {
    /// Nothing playing, with the given connectivity
    pub fn empty(connectivity: ConnectivityState) -> Self {
        Self {
            connectivity,
            ..Default::default()
        }
    }

    /// Live channel that could not be resolved against the catalog
    pub fn unknown_channel(connectivity: ConnectivityState, paused: bool) -> Self {
        Self {
            connectivity,
            source_kind: SourceKind::LiveChannel,
            title: Some(UNKNOWN_CHANNEL_TITLE.to_string()),
            paused,
            ..Default::default()
        }
    }

    /// Clear playback fields, keeping connectivity
    pub fn reset(&mut self) {
        *self = Self::empty(self.connectivity);
    }

    pub fn is_empty(&self) -> bool {
        self.source_kind == SourceKind::None
    }

    /// Playback position extrapolated to `now`
    ///
    /// Frozen while paused; clamped to the duration when one is known.
    pub fn estimated_position(&self, now: DateTime<Utc>) -> Option<f64> {
        let position = self.position_seconds?;
        let observed_at = self.position_observed_at?;
        if self.paused {
            return Some(position);
        }

        let elapsed = (now - observed_at).num_milliseconds().max(0) as f64 / 1000.0;
        let estimate = position + elapsed;
        Some(match self.duration_seconds {
            Some(duration) => estimate.min(duration),
            None => estimate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_connectivity_from_wire() {
        assert_eq!(ConnectivityState::from_wire("ONLINE_RUNNING"), ConnectivityState::Running);
        assert_eq!(ConnectivityState::from_wire("ONLINE_STANDBY"), ConnectivityState::Standby);
        assert_eq!(ConnectivityState::from_wire("OFFLINE"), ConnectivityState::Unknown);
    }

    #[test]
    fn test_reset_keeps_connectivity() {
        let mut snapshot = PlaybackSnapshot {
            connectivity: ConnectivityState::Running,
            source_kind: SourceKind::Replay,
            channel_id: Some(ChannelId::new("NL_1")),
            title: Some("Journaal".to_string()),
            paused: true,
            ..Default::default()
        };
        snapshot.reset();

        assert_eq!(snapshot, PlaybackSnapshot::empty(ConnectivityState::Running));
        assert!(snapshot.is_empty());
        assert!(!snapshot.paused);
    }

    #[test]
    fn test_unknown_channel() {
        let snapshot = PlaybackSnapshot::unknown_channel(ConnectivityState::Running, false);
        assert_eq!(snapshot.source_kind, SourceKind::LiveChannel);
        assert_eq!(snapshot.title.as_deref(), Some(UNKNOWN_CHANNEL_TITLE));
        assert!(snapshot.channel_id.is_none());
        assert!(snapshot.artwork_url.is_none());
    }

    #[test]
    fn test_estimated_position() {
        let observed = Utc::now();
        let mut snapshot = PlaybackSnapshot {
            source_kind: SourceKind::Recording,
            duration_seconds: Some(100.0),
            position_seconds: Some(10.0),
            position_observed_at: Some(observed),
            ..Default::default()
        };

        assert_eq!(snapshot.estimated_position(observed + Duration::seconds(5)), Some(15.0));
        assert_eq!(snapshot.estimated_position(observed + Duration::seconds(500)), Some(100.0));

        snapshot.paused = true;
        assert_eq!(snapshot.estimated_position(observed + Duration::seconds(5)), Some(10.0));

        snapshot.position_observed_at = None;
        assert_eq!(snapshot.estimated_position(observed), None);
    }
}
