//! Service discovery from the region's backoffice document

use crate::error::{ApiError, Result};
use crate::region::RegionSettings;
use rest_client::RestClient;
use serde_json::Value;
use tracing::debug;

/// Base URLs of the cloud services a session talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    pub authorization: String,
    pub push_broker: String,
    pub personalization: String,
    pub linear: String,
    pub recording: String,
    pub vod: String,
    pub purchase: String,
}

impl ServiceEndpoints {
    /// Download and decode the backoffice document for a region
    pub fn discover(rest: &RestClient, region: &RegionSettings) -> Result<Self> {
        let url = region.backoffice_url();
        debug!(%url, "Fetching service configuration");
        let document = rest.get_json(&url, &[])?;
        Self::from_backoffice(&document)
    }

    /// Decode the `{ "<service>": { "URL": ... } }` entries
    pub fn from_backoffice(document: &Value) -> Result<Self> {
        Ok(Self {
            authorization: service_url(document, "authorizationService")?,
            push_broker: service_url(document, "mqttBroker")?,
            personalization: service_url(document, "personalizationService")?,
            linear: service_url(document, "linearService")?,
            recording: service_url(document, "recordingService")?,
            vod: service_url(document, "vodService")?,
            purchase: service_url(document, "purchaseService")?,
        })
    }
}

fn service_url(document: &Value, service: &'static str) -> Result<String> {
    document
        .get(service)
        .and_then(|entry| entry.get("URL"))
        .and_then(Value::as_str)
        .map(|url| url.trim_end_matches('/').to_string())
        .ok_or(ApiError::MissingEndpoint(service))
}
