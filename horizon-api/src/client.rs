use crate::endpoints::ServiceEndpoints;
use crate::error::FetchError;
use crate::fetcher::MetadataFetcher;
use crate::model::{
    ChannelRecord, Customer, Entitlements, RecordingDetail, RecordingEntry, RecordingGroup,
    RecordingQuota, ReplayEvent, ShowEpisodeEntry, VodDetail,
};
use crate::region::RegionSettings;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

/// Metadata lookups needed to describe what a box is playing
///
/// Implemented by [`HorizonClient`]; the state engine only depends on this
/// trait so it can run against in-memory fixtures.
pub trait MetadataSource: Send + Sync {
    fn replay_event(&self, event_id: &str) -> Result<ReplayEvent, FetchError>;
    fn recording(&self, recording_id: &str) -> Result<RecordingDetail, FetchError>;
    fn vod(&self, title_id: &str) -> Result<VodDetail, FetchError>;
}

#[derive(Deserialize)]
struct DataList<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Typed access to the Horizon REST services for one household
///
/// ```rust,ignore
/// let client = HorizonClient::new(fetcher, endpoints, region);
/// let customer = client.customer()?;
/// let channels = client.channels()?;
/// ```
pub struct HorizonClient {
    fetcher: MetadataFetcher,
    endpoints: ServiceEndpoints,
    language: String,
    profile_id: Option<String>,
    city_id: RwLock<Option<String>>,
}

impl HorizonClient {
    pub fn new(fetcher: MetadataFetcher, endpoints: ServiceEndpoints, region: &RegionSettings) -> Self {
        Self::with_language(fetcher, endpoints, region.language)
    }

    pub fn with_language(
        fetcher: MetadataFetcher,
        endpoints: ServiceEndpoints,
        language: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            endpoints,
            language: language.into(),
            profile_id: None,
            city_id: RwLock::new(None),
        }
    }

    /// Profile whose personalization applies to recording and VOD lookups
    pub fn with_profile_id(mut self, profile_id: impl Into<String>) -> Self {
        self.profile_id = Some(profile_id.into());
        self
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    pub fn fetcher(&self) -> &MetadataFetcher {
        &self.fetcher
    }

    pub fn household_id(&self) -> String {
        self.fetcher.sessions().household_id()
    }

    /// Household account and its assigned boxes; remembers the city for catalog lookups
    pub fn customer(&self) -> Result<Customer, FetchError> {
        info!("Retrieving customer");
        let url = format!(
            "{}/v1/customer/{}?with=profiles%2Cdevices",
            self.endpoints.personalization,
            self.household_id()
        );
        let customer: Customer = self.fetch_as(&url)?;
        *self.city_id.write() = customer.city_id.clone();
        Ok(customer)
    }

    /// Product identifiers the household is entitled to
    pub fn entitlements(&self) -> Result<HashSet<String>, FetchError> {
        info!("Retrieving entitlements");
        let url = format!(
            "{}/v2/customers/{}/entitlements?enableDaypass=true",
            self.endpoints.purchase,
            self.household_id()
        );
        let entitlements: Entitlements = self.fetch_as(&url)?;
        Ok(entitlements.entitlements.into_iter().map(|e| e.id).collect())
    }

    /// Raw linear channel list for the customer's city
    pub fn channels(&self) -> Result<Vec<ChannelRecord>, FetchError> {
        info!("Retrieving channels");
        let mut url = format!(
            "{}/v2/channels?language={}&productClass=Orion-DASH",
            self.endpoints.linear, self.language
        );
        if let Some(city_id) = self.city_id.read().as_deref() {
            url.push_str(&format!("&cityId={city_id}"));
        }
        self.fetch_as(&url)
    }

    pub fn recording_quota(&self) -> Result<RecordingQuota, FetchError> {
        let url = format!(
            "{}/customers/{}/quota",
            self.endpoints.recording,
            self.household_id()
        );
        self.fetch_as(&url)
    }

    /// Recordings, newest first
    pub fn recordings(&self) -> Result<Vec<RecordingEntry>, FetchError> {
        info!("Retrieving recordings");
        let url = format!(
            "{}/customers/{}/recordings?sort=time&sortOrder=desc&language={}",
            self.endpoints.recording,
            self.household_id(),
            self.language
        );
        let list: DataList<RecordingEntry> = self.fetch_as(&url)?;
        let recordings: Vec<_> = list
            .data
            .into_iter()
            .filter(|entry| *entry != RecordingEntry::Other)
            .collect();
        info!(count = recordings.len(), "Recordings retrieved");
        Ok(recordings)
    }

    /// Recorded episodes of a show, oldest first
    pub fn show_episodes(&self, show_id: &str) -> Result<Vec<ShowEpisodeEntry>, FetchError> {
        let url = format!(
            "{}/customers/{}/episodes/shows/{}?source=recording&language={}&sort=time&sortOrder=asc",
            self.endpoints.recording,
            self.household_id(),
            show_id,
            self.language
        );
        let list: DataList<Value> = self.fetch_as(&url)?;
        list.data
            .into_iter()
            .map(|item| {
                if item.get("source").and_then(Value::as_str) == Some("show") {
                    decode::<RecordingGroup>(&url, item).map(ShowEpisodeEntry::Show)
                } else {
                    decode::<RecordingDetail>(&url, item).map(ShowEpisodeEntry::Episode)
                }
            })
            .collect()
    }

    fn profile_query(&self) -> String {
        self.profile_id
            .as_deref()
            .map(|id| format!("&profileId={id}"))
            .unwrap_or_default()
    }

    fn fetch_as<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let value = self.fetcher.fetch(url)?;
        decode(url, value)
    }
}

impl MetadataSource for HorizonClient {
    fn replay_event(&self, event_id: &str) -> Result<ReplayEvent, FetchError> {
        debug!(%event_id, "Retrieving replay event");
        let url = format!(
            "{}/v2/replayEvent/{}?returnLinearContent=true&language={}",
            self.endpoints.linear, event_id, self.language
        );
        self.fetch_as(&url)
    }

    fn recording(&self, recording_id: &str) -> Result<RecordingDetail, FetchError> {
        debug!(%recording_id, "Retrieving recording");
        let url = format!(
            "{}/customers/{}/details/single/{}?language={}{}",
            self.endpoints.recording,
            self.household_id(),
            recording_id,
            self.language,
            self.profile_query()
        );
        self.fetch_as(&url)
    }

    fn vod(&self, title_id: &str) -> Result<VodDetail, FetchError> {
        debug!(%title_id, "Retrieving VOD title");
        let mut url = format!(
            "{}/v2/detailscreen/{}?language={}{}",
            self.endpoints.vod,
            title_id,
            self.language,
            self.profile_query()
        );
        if let Some(city_id) = self.city_id.read().as_deref() {
            url.push_str(&format!("&cityId={city_id}"));
        }
        self.fetch_as(&url)
    }
}

fn decode<T: DeserializeOwned>(url: &str, value: Value) -> Result<T, FetchError> {
    serde_json::from_value(value)
        .map_err(|e| FetchError::Protocol(format!("{url}: unexpected response shape: {e}")))
}
