//! HorizonSystem - Main entry point for the SDK
//!
//! Signs in, loads the household and keeps a live view of its boxes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use horizon_api::{
    is_supported_platform, AuthFlow, Authenticator, Customer, HorizonClient, MetadataFetcher,
    MetadataSource, PasswordAuthenticator, RecordingEntry, RefreshTokenAuthenticator,
    RegionSettings, ServiceEndpoints, SessionStore, ShowEpisodeEntry,
};
use horizon_state::{
    CatalogHandle, ChangeIterator, ChannelCatalog, Device, DeviceId, Registry, SettopBox,
};
use horizon_stream::{CommandSink, LinkStatus, PushChannel, PushCredentials};
use rest_client::RestClient;
use tracing::{error, info, warn};

use crate::config::{Credentials, SdkConfig};
use crate::SdkError;

/// Connected household - provides the boxes and the recording services
///
/// HorizonSystem is fully synchronous - no async/await required.
///
/// # Example
///
/// ```rust,ignore
/// use horizon_sdk::{HorizonSystem, SdkConfig};
///
/// fn main() -> Result<(), horizon_sdk::SdkError> {
///     let config = SdkConfig::new("nl")?.with_password("user@example.com", "secret");
///     let system = HorizonSystem::connect(config)?;
///
///     for settop_box in system.settop_boxes() {
///         println!("{}: {:?}", settop_box.device().friendly_name, settop_box.snapshot().title);
///     }
///
///     // Iterate over changes
///     for change in system.changes() {
///         println!("{} now shows {:?}", change.device_id, change.snapshot.title);
///     }
///
///     Ok(())
/// }
/// ```
pub struct HorizonSystem {
    region: RegionSettings,
    customer: Customer,
    client: Arc<HorizonClient>,
    catalog: CatalogHandle,
    channel: Arc<PushChannel>,
    registry: Registry,
    connected: AtomicBool,
}

impl HorizonSystem {
    /// Connect with the sign-in flow named by the config's credentials
    ///
    /// This will:
    /// 1. Discover the region's service endpoints
    /// 2. Authenticate and obtain the push token
    /// 3. Load the customer, entitlements and channel catalog
    /// 4. Open the push channel and start tracking every supported box
    ///
    /// The whole sequence is retried with backoff on transient failures.
    pub fn connect(config: SdkConfig) -> Result<Self, SdkError> {
        Self::builder(config).connect()
    }

    pub fn builder(config: SdkConfig) -> HorizonSystemBuilder {
        HorizonSystemBuilder::new(config)
    }

    /// All tracked boxes, ordered by id
    pub fn settop_boxes(&self) -> Vec<Arc<SettopBox>> {
        self.registry.settop_boxes()
    }

    pub fn settop_box(&self, id: &DeviceId) -> Result<Arc<SettopBox>, SdkError> {
        Ok(self.registry.settop_box(id)?)
    }

    /// Box by its friendly name as shown in the operator's apps
    pub fn settop_box_by_name(&self, name: &str) -> Option<Arc<SettopBox>> {
        self.settop_boxes()
            .into_iter()
            .find(|settop_box| settop_box.device().friendly_name == name)
    }

    /// Blocking iterator over the playback changes of all boxes
    ///
    /// Changes are only queued once this has been called.
    pub fn changes(&self) -> ChangeIterator {
        self.registry.changes()
    }

    /// The channel catalog built at connect time
    pub fn channels(&self) -> Arc<ChannelCatalog> {
        self.catalog.current()
    }

    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn region(&self) -> &RegionSettings {
        &self.region
    }

    pub fn household_id(&self) -> String {
        self.client.household_id()
    }

    pub fn push_status(&self) -> LinkStatus {
        self.channel.status()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Occupied share of the network recording quota in whole percent
    pub fn recording_capacity(&self) -> Result<Option<u8>, SdkError> {
        self.ensure_connected()?;
        Ok(self.client.recording_quota()?.percent_used())
    }

    /// Recordings of the household, newest first
    pub fn recordings(&self) -> Result<Vec<RecordingEntry>, SdkError> {
        self.ensure_connected()?;
        Ok(self.client.recordings()?)
    }

    /// Recorded episodes of a show, oldest first
    pub fn show_episodes(&self, show_id: &str) -> Result<Vec<ShowEpisodeEntry>, SdkError> {
        self.ensure_connected()?;
        Ok(self.client.show_episodes(show_id)?)
    }

    /// Stop tracking and close the push channel
    ///
    /// Frames already queued for a box are still applied. Safe to call more
    /// than once and while the broker handshake is still pending.
    pub fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.registry.stop_accepting();
        self.channel.shutdown();
        self.registry.shutdown();
        info!(household = %self.household_id(), "Disconnected");
    }

    fn ensure_connected(&self) -> Result<(), SdkError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SdkError::Disconnected)
        }
    }
}

impl Drop for HorizonSystem {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Builder for a [`HorizonSystem`] with collaborators replaced
///
/// ```rust,ignore
/// let system = HorizonSystem::builder(SdkConfig::new("be-nl")?)
///     .with_authenticator(Arc::new(MySsoAuthenticator::new()))
///     .connect()?;
/// ```
pub struct HorizonSystemBuilder {
    config: SdkConfig,
    authenticator: Option<Arc<dyn Authenticator>>,
    rest: Option<RestClient>,
}

impl HorizonSystemBuilder {
    pub fn new(config: SdkConfig) -> Self {
        Self {
            config,
            authenticator: None,
            rest: None,
        }
    }

    /// Issue sessions with `authenticator` instead of the configured credentials
    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    /// HTTP client for the REST services, e.g. with custom timeouts
    pub fn with_rest_client(mut self, rest: RestClient) -> Self {
        self.rest = Some(rest);
        self
    }

    /// Run the connect sequence with the configured retry budget
    pub fn connect(self) -> Result<HorizonSystem, SdkError> {
        self.config.validate(self.authenticator.is_some())?;

        let rest = self.rest.unwrap_or_default();
        let mut authenticator = self.authenticator;
        let attempts = self.config.connect_attempts;

        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(region = self.config.region.code, attempt, "Connecting");

            let error = match attempt_connect(&self.config, &rest, &mut authenticator) {
                Ok(system) => return Ok(system),
                Err(e) => e,
            };

            if !error.is_retryable() {
                error!("Connect failed: {}", error);
                return Err(error);
            }
            if attempt >= attempts {
                error!(attempts, "Connect failed, giving up: {}", error);
                return Err(SdkError::ConnectFailed {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = self.config.connect_delay_after(attempt);
            warn!(attempt, ?delay, "Connect failed, retrying: {}", error);
            thread::sleep(delay);
        }
    }
}

/// One pass of the connect sequence
///
/// The authenticator is created on the first pass and kept, so a refresh
/// token rotated by a failed pass is used by the next one.
fn attempt_connect(
    config: &SdkConfig,
    rest: &RestClient,
    authenticator: &mut Option<Arc<dyn Authenticator>>,
) -> Result<HorizonSystem, SdkError> {
    let region = config.region;
    let endpoints = ServiceEndpoints::discover(rest, &region)?;

    let auth = match authenticator {
        Some(auth) => Arc::clone(auth),
        None => {
            let auth = default_authenticator(config, rest, &endpoints)?;
            *authenticator = Some(Arc::clone(&auth));
            auth
        }
    };
    let sessions = Arc::new(SessionStore::establish(auth)?);

    let fetcher = MetadataFetcher::new(rest.clone(), Arc::clone(&sessions), config.retry);
    let mut client = HorizonClient::new(fetcher, endpoints.clone(), &region);
    if let Some(profile_id) = &config.profile_id {
        client = client.with_profile_id(profile_id.clone());
    }
    let client = Arc::new(client);

    let customer = client.customer()?;
    let entitlements = client.entitlements()?;
    let records = client.channels()?;
    let catalog = CatalogHandle::new(ChannelCatalog::build(&records, &entitlements));
    info!(channels = catalog.current().len(), "Channel catalog loaded");

    let devices = supported_devices(&customer, &region);

    let session = sessions.current();
    let credentials = PushCredentials {
        broker: endpoints.push_broker.clone(),
        household_id: session.household_id.clone(),
        token: session.push_channel_token.clone(),
    };
    let (channel, events) = PushChannel::open(&config.push, &credentials)?;
    let channel = Arc::new(channel);

    let sink: Arc<dyn CommandSink> = channel.clone();
    let metadata: Arc<dyn MetadataSource> = client.clone();
    let registry = match Registry::new(devices, sink, metadata, catalog.clone()) {
        Ok(registry) => registry,
        Err(e) => {
            channel.shutdown();
            return Err(e.into());
        }
    };

    let system = HorizonSystem {
        region,
        customer,
        client,
        catalog,
        channel,
        registry,
        connected: AtomicBool::new(true),
    };

    // Dropping `system` on the error paths below disconnects it
    system.registry.start(events)?;
    system.channel.wait_connected(config.push.connect_timeout)?;

    info!(
        household = %system.household_id(),
        boxes = system.settop_boxes().len(),
        "Connected"
    );
    Ok(system)
}

fn default_authenticator(
    config: &SdkConfig,
    rest: &RestClient,
    endpoints: &ServiceEndpoints,
) -> Result<Arc<dyn Authenticator>, SdkError> {
    let region = &config.region;
    if region.auth_flow == AuthFlow::ExternalSso {
        return Err(SdkError::UnsupportedAuthFlow(region.code.to_string()));
    }

    match &config.credentials {
        Some(Credentials::Password { username, password }) => Ok(Arc::new(
            PasswordAuthenticator::new(rest.clone(), region, endpoints, username, password),
        )),
        Some(Credentials::RefreshToken(token)) => Ok(Arc::new(RefreshTokenAuthenticator::new(
            rest.clone(),
            region,
            endpoints,
            token,
        ))),
        None => Err(SdkError::Configuration(
            "Credentials are required without a custom authenticator".to_string(),
        )),
    }
}

/// Boxes of the household the state engine can drive
fn supported_devices(customer: &Customer, region: &RegionSettings) -> Vec<Device> {
    customer
        .assigned_devices
        .iter()
        .filter(|assigned| {
            let supported = is_supported_platform(&assigned.platform_type);
            if !supported {
                warn!(
                    device = %assigned.device_id,
                    platform = %assigned.platform_type,
                    "Unsupported box platform, skipping"
                );
            }
            supported
        })
        .map(|assigned| Device::from_assigned(assigned, Some(region)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_api::{AssignedDevice, RetryPolicy};

    fn customer(platforms: &[(&str, &str)]) -> Customer {
        Customer {
            customer_id: "c-1".to_string(),
            hashed_customer_id: None,
            country_id: Some("nl".to_string()),
            city_id: Some("42".to_string()),
            assigned_devices: platforms
                .iter()
                .map(|(id, platform)| AssignedDevice {
                    device_id: id.to_string(),
                    hashed_cpe_id: None,
                    platform_type: platform.to_string(),
                    settings: Default::default(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_unsupported_platforms_are_skipped() {
        let region = RegionSettings::lookup("nl").unwrap();
        let customer = customer(&[("box-1", "EOS"), ("box-2", "DCX960-OLD"), ("box-3", "APOLLO")]);

        let devices = supported_devices(&customer, region);
        let ids: Vec<_> = devices.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["box-1", "box-3"]);
    }

    #[test]
    fn test_default_authenticator_follows_credentials() {
        let region = *RegionSettings::lookup("gb").unwrap();
        let endpoints = ServiceEndpoints {
            authorization: "https://auth".to_string(),
            push_broker: String::new(),
            personalization: String::new(),
            linear: String::new(),
            recording: String::new(),
            vod: String::new(),
            purchase: String::new(),
        };
        let rest = RestClient::new();

        let config = SdkConfig::for_region(region)
            .with_refresh_token("rt")
            .with_retry_policy(RetryPolicy::immediate(1));
        assert!(default_authenticator(&config, &rest, &endpoints).is_ok());

        let config = SdkConfig::for_region(region);
        assert!(matches!(
            default_authenticator(&config, &rest, &endpoints),
            Err(SdkError::Configuration(_))
        ));

        let sso = *RegionSettings::lookup("be-nl").unwrap();
        let config = SdkConfig::for_region(sso).with_password("user", "secret");
        assert!(matches!(
            default_authenticator(&config, &rest, &endpoints),
            Err(SdkError::UnsupportedAuthFlow(_))
        ));
    }
}
