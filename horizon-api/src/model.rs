//! Typed views of the REST resources

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepts `"12"` or `12` and yields `"12"`
fn number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImageStream {
    #[serde(default)]
    pub full: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Logo {
    #[serde(default)]
    pub focused: Option<String>,
    #[serde(default)]
    pub focus: Option<String>,
}

/// One entry of the linear channel list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelRecord {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub logical_channel_number: Option<String>,
    #[serde(default)]
    pub is_radio: bool,
    #[serde(default)]
    pub linear_products: Vec<String>,
    #[serde(default)]
    pub image_stream: ImageStream,
    #[serde(default)]
    pub logo: Logo,
}

impl ChannelRecord {
    /// Full stream still, else the small one, else the focus logo, else empty
    pub fn stream_artwork(&self) -> String {
        self.image_stream
            .full
            .clone()
            .or_else(|| self.image_stream.small.clone())
            .or_else(|| self.logo.focus.clone())
            .unwrap_or_default()
    }

    pub fn logo_artwork(&self) -> Option<String> {
        self.logo.focused.clone()
    }
}

/// A broadcast event on a linear channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub episode_name: Option<String>,
}

impl ReplayEvent {
    /// `title` or `title: episode`
    pub fn display_title(&self) -> String {
        match &self.episode_name {
            Some(episode) if !episode.is_empty() => format!("{}: {}", self.title, episode),
            _ => self.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Poster {
    #[serde(default)]
    pub url: Option<String>,
}

/// A single network recording
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingDetail {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub poster: Poster,
    #[serde(default)]
    pub season: Option<i64>,
    #[serde(default)]
    pub episode: Option<i64>,
}

impl RecordingDetail {
    pub fn poster_url(&self) -> Option<&str> {
        self.poster.url.as_deref().filter(|url| !url.is_empty())
    }
}

/// An on-demand title
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VodDetail {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    /// Running time in seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSettings {
    #[serde(default)]
    pub device_friendly_name: Option<String>,
}

/// A box assigned to the household
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedDevice {
    pub device_id: String,
    #[serde(rename = "hashedCPEId", default)]
    pub hashed_cpe_id: Option<String>,
    #[serde(default)]
    pub platform_type: String,
    #[serde(default)]
    pub settings: DeviceSettings,
}

/// Household account with its boxes
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub customer_id: String,
    #[serde(default)]
    pub hashed_customer_id: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub city_id: Option<String>,
    #[serde(default)]
    pub assigned_devices: Vec<AssignedDevice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Entitlement {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Entitlements {
    #[serde(default)]
    pub entitlements: Vec<Entitlement>,
}

/// Network recording storage of the household
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RecordingQuota {
    pub quota: f64,
    pub occupied: f64,
}

impl RecordingQuota {
    /// Occupied share of the quota, rounded to a whole percent
    pub fn percent_used(&self) -> Option<u8> {
        if self.quota <= 0.0 {
            return None;
        }
        Some(((self.occupied / self.quota) * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}

/// A recorded show or season with its episode count
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingGroup {
    #[serde(rename = "showId", alias = "Id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub poster: Poster,
    #[serde(rename = "noOfEpisodes", default)]
    pub episode_count: u32,
}

/// Entry of the household recording list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecordingEntry {
    Single(RecordingDetail),
    Season(RecordingGroup),
    Show(RecordingGroup),
    #[serde(other)]
    Other,
}

/// Entry of a show's episode list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowEpisodeEntry {
    Show(RecordingGroup),
    Episode(RecordingDetail),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_channel_artwork_fallbacks() {
        let full: ChannelRecord = serde_json::from_value(json!({
            "id": "NL_1", "name": "NPO 1", "logicalChannelNumber": 1,
            "imageStream": { "full": "full.jpg", "small": "small.jpg" },
            "logo": { "focused": "logo.png" }
        }))
        .unwrap();
        assert_eq!(full.stream_artwork(), "full.jpg");
        assert_eq!(full.logical_channel_number.as_deref(), Some("1"));
        assert_eq!(full.logo_artwork().as_deref(), Some("logo.png"));

        let logo_only: ChannelRecord = serde_json::from_value(json!({
            "id": "NL_2", "name": "NPO 2", "logo": { "focus": "focus.png" }
        }))
        .unwrap();
        assert_eq!(logo_only.stream_artwork(), "focus.png");

        let bare: ChannelRecord =
            serde_json::from_value(json!({ "id": "NL_3", "name": "NPO 3" })).unwrap();
        assert_eq!(bare.stream_artwork(), "");
    }

    #[test]
    fn test_replay_event_title() {
        let event: ReplayEvent = serde_json::from_value(json!({
            "eventId": "ev", "channelId": "NL_1", "title": "Show", "episodeName": "Pilot"
        }))
        .unwrap();
        assert_eq!(event.display_title(), "Show: Pilot");

        let event: ReplayEvent = serde_json::from_value(json!({ "title": "Journaal" })).unwrap();
        assert_eq!(event.display_title(), "Journaal");
    }

    #[test]
    fn test_quota_percentage() {
        let quota = RecordingQuota { quota: 300.0, occupied: 100.0 };
        assert_eq!(quota.percent_used(), Some(33));
        assert_eq!(RecordingQuota { quota: 0.0, occupied: 1.0 }.percent_used(), None);
    }

    #[test]
    fn test_recording_entries() {
        let entries: Vec<RecordingEntry> = serde_json::from_value(json!([
            { "type": "single", "id": "r1", "title": "Film", "poster": { "url": "p.jpg" } },
            { "type": "show", "showId": "s1", "title": "Series", "noOfEpisodes": 4 },
            { "type": "season", "Id": "s2", "title": "Series S2", "noOfEpisodes": 2 },
            { "type": "bookmark", "id": "x" }
        ]))
        .unwrap();

        assert!(matches!(&entries[0], RecordingEntry::Single(r) if r.poster_url() == Some("p.jpg")));
        assert!(matches!(&entries[1], RecordingEntry::Show(g) if g.id == "s1" && g.episode_count == 4));
        assert!(matches!(&entries[2], RecordingEntry::Season(g) if g.id == "s2"));
        assert_eq!(entries[3], RecordingEntry::Other);
    }

    #[test]
    fn test_customer_city_as_number() {
        let customer: Customer = serde_json::from_value(json!({
            "customerId": "c1", "cityId": 65535,
            "assignedDevices": [{
                "deviceId": "3C36E4-EOSSTB-1", "hashedCPEId": "h",
                "platformType": "EOS", "settings": { "deviceFriendlyName": "Living" }
            }]
        }))
        .unwrap();
        assert_eq!(customer.city_id.as_deref(), Some("65535"));
        assert_eq!(
            customer.assigned_devices[0].settings.device_friendly_name.as_deref(),
            Some("Living")
        );
    }
}
